//! Remote session lifecycle.

use ccmirror_core::Credentials;

use crate::lock::TableLock;
use crate::{RemoteApi, RemoteError};

/// Owns the remote session for one batch run.
///
/// The session is closed on [`Gateway::disconnect`] or, failing that, when
/// the gateway is dropped.
pub struct Gateway<'r> {
    remote: &'r mut dyn RemoteApi,
}

impl<'r> Gateway<'r> {
    pub fn new(remote: &'r mut dyn RemoteApi) -> Self {
        Self { remote }
    }

    /// Open a session. Remote faults are logged and reported as `false`.
    pub fn connect(&mut self, endpoint: &str, credentials: &Credentials) -> bool {
        tracing::info!(endpoint, username = %credentials.username, "connecting to remote");
        match self.remote.login(endpoint, credentials) {
            Ok(()) => {
                tracing::info!("connection successful");
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to connect to remote");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.remote.is_logged_in()
    }

    /// Log out if a session is active. Never fails; safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if !self.remote.is_logged_in() {
            return;
        }
        match self.remote.logout() {
            Ok(()) => tracing::info!("logout successful"),
            Err(err) => tracing::error!(error = %err, "failed to logout"),
        }
    }

    /// Take the table lock for the rest of the batch.
    pub fn lock(&mut self) -> Result<TableLock<'_, 'r>, RemoteError> {
        TableLock::acquire(self)
    }

    pub(crate) fn remote(&mut self) -> &mut dyn RemoteApi {
        &mut *self.remote
    }
}

impl Drop for Gateway<'_> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
