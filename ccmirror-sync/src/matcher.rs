//! Composite-key lookup over the batch snapshot.
//!
//! The snapshot is indexed once. When the remote holds duplicate keys the
//! first row in snapshot order wins and later duplicates are never matched.
//! Rows created during the batch go into an overlay that is consulted before
//! the snapshot, so a key created by one line is visible to the lines after it.

use std::collections::HashMap;

use ccmirror_core::{CompositeKey, RemoteRow};

#[derive(Debug, Default)]
pub struct RowMatcher {
    rows: Vec<RemoteRow>,
    index: HashMap<CompositeKey, usize>,
    created: HashMap<CompositeKey, RemoteRow>,
}

impl RowMatcher {
    pub fn new(rows: Vec<RemoteRow>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            match row.key() {
                Some(key) => {
                    if index.contains_key(&key) {
                        tracing::warn!("duplicate mirror key {key}; keeping first row");
                    } else {
                        index.insert(key, position);
                    }
                }
                None => tracing::warn!("mirror row {} has no complete key; skipped", row.id),
            }
        }
        Self {
            rows,
            index,
            created: HashMap::new(),
        }
    }

    /// Row matching `key`, if any.
    pub fn find(&self, key: &CompositeKey) -> Option<&RemoteRow> {
        self.created
            .get(key)
            .or_else(|| self.index.get(key).map(|&i| &self.rows[i]))
    }

    /// Make a row created during the batch visible to later lookups.
    pub fn record_created(&mut self, key: CompositeKey, row: RemoteRow) {
        self.created.insert(key, row);
    }

    /// Rows in the original snapshot.
    pub fn snapshot_len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
