//! One-shot read of the mirror table.

use ccmirror_core::RemoteRow;
use ccmirror_remote::TableLock;

/// Fetch every row of the table. Requires the held lock.
///
/// A remote fault is logged and yields an empty snapshot; callers treat an
/// empty snapshot as unusable.
pub fn read(lock: &mut TableLock<'_, '_>) -> Vec<RemoteRow> {
    match lock.read_rows() {
        Ok(rows) => {
            tracing::info!("retrieved {} row(s) from mirror table", rows.len());
            rows
        }
        Err(err) => {
            tracing::error!("failed to retrieve mirror table: {err}");
            Vec::new()
        }
    }
}
