//! Low-level operations on the remote mirror table.

use ccmirror_core::{Credentials, FieldSet, RemoteRow, RowId};

use crate::RemoteError;

/// Transport to the remote system hosting the mirror table.
///
/// Callers go through [`crate::Gateway`] and [`crate::TableLock`], which own
/// the session and lock lifecycle; the methods here are single remote calls
/// with no retry.
pub trait RemoteApi {
    /// Open a session against `endpoint`.
    fn login(&mut self, endpoint: &str, credentials: &Credentials) -> Result<(), RemoteError>;

    fn is_logged_in(&self) -> bool;

    fn logout(&mut self) -> Result<(), RemoteError>;

    /// Take the exclusive lock on the table.
    ///
    /// Fails with [`RemoteError::Locked`] when another actor holds it.
    fn lock_table(&mut self) -> Result<(), RemoteError>;

    /// Persist pending writes made under the lock.
    fn save_table(&mut self) -> Result<(), RemoteError>;

    fn unlock_table(&mut self) -> Result<(), RemoteError>;

    /// Every row of the table, in remote order.
    fn read_rows(&mut self) -> Result<Vec<RemoteRow>, RemoteError>;

    /// Allocate a new row and write `fields` to it.
    fn create_row(&mut self, fields: &FieldSet) -> Result<RowId, RemoteError>;

    /// Overwrite `fields` on an existing row; other fields are left as is.
    fn update_row(&mut self, id: &RowId, fields: &FieldSet) -> Result<(), RemoteError>;
}
