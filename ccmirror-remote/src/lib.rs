//! # ccmirror-remote
//!
//! Access to the remote mirror table: the [`RemoteApi`] transport trait, an
//! HTTP implementation, an in-memory implementation, and the session and
//! lock guards the orchestrator drives.

mod api;
mod error;
pub mod http;
pub mod lock;
pub mod memory;
pub mod session;

pub use api::RemoteApi;
pub use error::RemoteError;
pub use http::HttpRemote;
pub use lock::TableLock;
pub use memory::MemoryRemote;
pub use session::Gateway;
