//! Global table lock.
//!
//! The lock covers the whole batch. [`TableLock`] is a guard: the only way to
//! read or write the table is through it, and dropping it without calling
//! [`TableLock::release`] still saves and unlocks.

use ccmirror_core::{FieldSet, RemoteRow, RowId};

use crate::session::Gateway;
use crate::{RemoteApi, RemoteError};

pub struct TableLock<'g, 'r> {
    gateway: &'g mut Gateway<'r>,
    released: bool,
}

impl<'g, 'r> TableLock<'g, 'r> {
    /// Take the exclusive lock. The holder, when the remote reports one, is
    /// logged and carried in [`RemoteError::Locked`].
    pub fn acquire(gateway: &'g mut Gateway<'r>) -> Result<Self, RemoteError> {
        match gateway.remote().lock_table() {
            Ok(()) => {
                tracing::info!("table locked");
                Ok(Self {
                    gateway,
                    released: false,
                })
            }
            Err(err) => {
                match &err {
                    RemoteError::Locked {
                        holder: Some(holder),
                    } => tracing::error!(holder = %holder, "table already locked"),
                    other => tracing::error!(error = %other, "failed to lock table"),
                }
                Err(err)
            }
        }
    }

    pub fn read_rows(&mut self) -> Result<Vec<RemoteRow>, RemoteError> {
        self.remote().read_rows()
    }

    pub fn create_row(&mut self, fields: &FieldSet) -> Result<RowId, RemoteError> {
        self.remote().create_row(fields)
    }

    pub fn update_row(&mut self, id: &RowId, fields: &FieldSet) -> Result<(), RemoteError> {
        self.remote().update_row(id, fields)
    }

    /// Save pending writes, then unlock. Unlock is attempted even when the
    /// save fails; returns `true` only if both succeed.
    pub fn release(mut self) -> bool {
        self.release_once()
    }

    fn remote(&mut self) -> &mut dyn RemoteApi {
        self.gateway.remote()
    }

    fn release_once(&mut self) -> bool {
        if self.released {
            return true;
        }
        self.released = true;

        let saved = match self.remote().save_table() {
            Ok(()) => {
                tracing::info!("table saved");
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to save table");
                false
            }
        };
        let unlocked = match self.remote().unlock_table() {
            Ok(()) => {
                tracing::info!("table unlocked");
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to unlock table");
                false
            }
        };
        saved && unlocked
    }
}

impl Drop for TableLock<'_, '_> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("table lock dropped without release; releasing now");
            self.release_once();
        }
    }
}
