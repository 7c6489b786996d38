//! In-process remote table.
//!
//! Behaves like the real remote for the operations the orchestrator uses:
//! writes require a session and the lock, reads require a session. Faults can
//! be injected per operation and every call is counted, which is what the
//! orchestrator tests assert against.

use std::collections::HashSet;

use ccmirror_core::{types::fields, Credentials, FieldSet, FieldValue, RemoteRow, RowId};

use crate::{RemoteApi, RemoteError};

/// Faults to inject into a [`MemoryRemote`].
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_login: bool,
    pub fail_logout: bool,
    /// Lock fails as if held by this user.
    pub lock_held_by: Option<String>,
    /// Lock fails with a generic remote fault.
    pub fail_lock: bool,
    pub fail_read: bool,
    pub fail_save: bool,
    pub fail_unlock: bool,
    /// Creates and updates touching these internal cost center ids are rejected.
    pub reject_writes_for: HashSet<String>,
}

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallLog {
    pub logins: usize,
    pub logouts: usize,
    pub locks: usize,
    pub saves: usize,
    pub unlocks: usize,
    pub reads: usize,
    pub creates: usize,
    pub updates: usize,
}

impl CallLog {
    /// Creates and updates that reached the remote, successful or not.
    pub fn writes(&self) -> usize {
        self.creates + self.updates
    }
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    rows: Vec<RemoteRow>,
    next_id: u64,
    logged_in: bool,
    locked: bool,
    pub faults: Faults,
    pub calls: CallLog,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table with rows built from `(internal id, mirror id, region)`.
    pub fn with_keys<'a>(keys: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let mut remote = Self::new();
        for (internal, mirror, region) in keys {
            let mut set = FieldSet::new();
            set.insert(
                fields::INTERNAL_COST_CENTER_ID.to_string(),
                FieldValue::Text(internal.to_string()),
            );
            set.insert(
                fields::SECONDARY_MIRROR_ID.to_string(),
                FieldValue::Text(mirror.to_string()),
            );
            set.insert(
                fields::SECONDARY_MIRROR_REGION.to_string(),
                FieldValue::Text(region.to_string()),
            );
            remote.insert_row(set);
        }
        remote
    }

    /// Append a row directly, bypassing session and lock checks.
    pub fn insert_row(&mut self, fields: FieldSet) -> RowId {
        self.next_id += 1;
        let id = RowId(self.next_id.to_string());
        self.rows.push(RemoteRow {
            id: id.clone(),
            fields,
        });
        id
    }

    pub fn rows(&self) -> &[RemoteRow] {
        &self.rows
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn require_session(&self) -> Result<(), RemoteError> {
        if self.logged_in {
            Ok(())
        } else {
            Err(RemoteError::NotConnected)
        }
    }

    fn require_lock(&self) -> Result<(), RemoteError> {
        self.require_session()?;
        if self.locked {
            Ok(())
        } else {
            Err(RemoteError::rejected(423, "table is not locked"))
        }
    }

    fn check_write(&self, fields: &FieldSet, id: Option<&RowId>) -> Result<(), RemoteError> {
        let internal = match id {
            Some(id) => self
                .rows
                .iter()
                .find(|r| &r.id == id)
                .and_then(|r| r.text(fields::INTERNAL_COST_CENTER_ID)),
            None => fields
                .get(fields::INTERNAL_COST_CENTER_ID)
                .and_then(FieldValue::as_text),
        };
        match internal {
            Some(internal) if self.faults.reject_writes_for.contains(internal) => Err(
                RemoteError::rejected(422, format!("field rejected for {internal}")),
            ),
            _ => Ok(()),
        }
    }
}

impl RemoteApi for MemoryRemote {
    fn login(&mut self, _endpoint: &str, _credentials: &Credentials) -> Result<(), RemoteError> {
        self.calls.logins += 1;
        if self.faults.fail_login {
            return Err(RemoteError::rejected(401, "invalid credentials"));
        }
        self.logged_in = true;
        Ok(())
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    fn logout(&mut self) -> Result<(), RemoteError> {
        self.calls.logouts += 1;
        self.require_session()?;
        if self.faults.fail_logout {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        self.logged_in = false;
        Ok(())
    }

    fn lock_table(&mut self) -> Result<(), RemoteError> {
        self.calls.locks += 1;
        self.require_session()?;
        if let Some(holder) = &self.faults.lock_held_by {
            return Err(RemoteError::Locked {
                holder: Some(holder.clone()),
            });
        }
        if self.faults.fail_lock {
            return Err(RemoteError::rejected(500, "lock service unavailable"));
        }
        self.locked = true;
        Ok(())
    }

    fn save_table(&mut self) -> Result<(), RemoteError> {
        self.calls.saves += 1;
        self.require_lock()?;
        if self.faults.fail_save {
            return Err(RemoteError::rejected(500, "save failed"));
        }
        Ok(())
    }

    fn unlock_table(&mut self) -> Result<(), RemoteError> {
        self.calls.unlocks += 1;
        self.require_lock()?;
        if self.faults.fail_unlock {
            return Err(RemoteError::rejected(500, "unlock failed"));
        }
        self.locked = false;
        Ok(())
    }

    fn read_rows(&mut self) -> Result<Vec<RemoteRow>, RemoteError> {
        self.calls.reads += 1;
        self.require_session()?;
        if self.faults.fail_read {
            return Err(RemoteError::rejected(404, "table not found"));
        }
        Ok(self.rows.clone())
    }

    fn create_row(&mut self, fields: &FieldSet) -> Result<RowId, RemoteError> {
        self.calls.creates += 1;
        self.require_lock()?;
        self.check_write(fields, None)?;
        Ok(self.insert_row(fields.clone()))
    }

    fn update_row(&mut self, id: &RowId, fields: &FieldSet) -> Result<(), RemoteError> {
        self.calls.updates += 1;
        self.require_lock()?;
        self.check_write(fields, Some(id))?;
        let row = self
            .rows
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| RemoteError::UnknownRow(id.clone()))?;
        for (name, value) in fields {
            row.fields.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}
