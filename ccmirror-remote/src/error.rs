use ccmirror_core::RowId;
use thiserror::Error;

/// Faults reported by the remote table API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("no active remote session")]
    NotConnected,

    #[error("table already locked by {}", .holder.as_deref().unwrap_or("another user"))]
    Locked { holder: Option<String> },

    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid remote response: {0}")]
    InvalidResponse(String),

    #[error("unknown row {0}")]
    UnknownRow(RowId),
}

impl RemoteError {
    pub(crate) fn rejected(status: u16, message: impl Into<String>) -> Self {
        RemoteError::Rejected {
            status,
            message: message.into(),
        }
    }
}
