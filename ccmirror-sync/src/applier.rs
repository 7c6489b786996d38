//! Per-line create/update policy.
//!
//! | action | match | result                        |
//! |--------|-------|-------------------------------|
//! | Create | none  | create all fields             |
//! | Create | found | rejected, no write            |
//! | Update | found | update mutable fields only    |
//! | Update | none  | rejected, no write            |

use std::fmt;

use ccmirror_core::{Action, ChangeRequest, RejectionCode, RemoteRow, RowId};
use ccmirror_remote::TableLock;
use serde::Serialize;

use crate::audit::AuditLog;
use crate::matcher::RowMatcher;

/// Result of applying one change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum LineOutcome {
    Created,
    Updated,
    AlreadyExists,
    DoesNotExist,
    WriteFailed(String),
}

impl LineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LineOutcome::Created | LineOutcome::Updated)
    }
}

impl fmt::Display for LineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineOutcome::Created => write!(f, "created"),
            LineOutcome::Updated => write!(f, "updated"),
            LineOutcome::AlreadyExists => write!(f, "rejected: already exists"),
            LineOutcome::DoesNotExist => write!(f, "rejected: does not exist"),
            LineOutcome::WriteFailed(reason) => write!(f, "write failed: {reason}"),
        }
    }
}

/// Match `request` against the batch view and apply it.
pub fn apply(
    lock: &mut TableLock<'_, '_>,
    matcher: &mut RowMatcher,
    request: &ChangeRequest,
    audit: &mut AuditLog,
) -> LineOutcome {
    audit.info(format!("Action : {}", request.action));
    let key = request.key();
    audit.info(format!("Looking for data row with key {key}"));
    let existing = matcher.find(&key).map(|row| row.id.clone());

    match (request.action, existing) {
        (Action::Create, Some(_)) => {
            audit.error("Line rejected : cost center already exists");
            audit.error_code(RejectionCode::LineRejected.code());
            LineOutcome::AlreadyExists
        }
        (Action::Create, None) => create(lock, matcher, request, audit),
        (Action::Update, Some(id)) => update(lock, &id, request, audit),
        (Action::Update, None) => {
            audit.error("Line rejected : cost center doesn't exist");
            audit.error_code(RejectionCode::LineRejected.code());
            LineOutcome::DoesNotExist
        }
    }
}

/// Write every field to a new row. Only valid when no row matches.
pub fn create(
    lock: &mut TableLock<'_, '_>,
    matcher: &mut RowMatcher,
    request: &ChangeRequest,
    audit: &mut AuditLog,
) -> LineOutcome {
    audit.info("Inserting row");
    let fields = request.create_fields();
    match lock.create_row(&fields) {
        Ok(id) => {
            audit.info("Row inserted");
            matcher.record_created(request.key(), RemoteRow { id, fields });
            LineOutcome::Created
        }
        Err(err) => {
            tracing::error!("failed to create cost center {}: {err}", request.key());
            audit.error(format!("Failed to create cost center : {err}"));
            LineOutcome::WriteFailed(err.to_string())
        }
    }
}

/// Write the mutable fields of an existing row. Key fields are untouched.
pub fn update(
    lock: &mut TableLock<'_, '_>,
    id: &RowId,
    request: &ChangeRequest,
    audit: &mut AuditLog,
) -> LineOutcome {
    audit.info("Updating row");
    match lock.update_row(id, &request.update_fields()) {
        Ok(()) => {
            audit.info("Row updated");
            LineOutcome::Updated
        }
        Err(err) => {
            tracing::error!("failed to update cost center {}: {err}", request.key());
            audit.error(format!("Failed to update cost center : {err}"));
            LineOutcome::WriteFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmirror_core::{types::fields, Credentials, FieldValue};
    use ccmirror_remote::{Gateway, MemoryRemote};
    use chrono::{TimeZone, Utc};

    fn request(action: Action, key: (&str, &str, &str)) -> ChangeRequest {
        ChangeRequest {
            action,
            internal_cost_center_id: key.0.into(),
            secondary_mirror_id: key.1.into(),
            secondary_mirror_region: key.2.into(),
            last_update_by: "jdoe".into(),
            last_update_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
            status: "Closed".into(),
        }
    }

    /// Apply `requests` in order against `remote` and return their outcomes.
    fn run(remote: &mut MemoryRemote, requests: &[ChangeRequest]) -> Vec<LineOutcome> {
        let rows = remote.rows().to_vec();
        let mut matcher = RowMatcher::new(rows);
        let mut audit = AuditLog::new(std::env::temp_dir(), "applier-test");
        let mut gateway = Gateway::new(remote);
        let creds = Credentials {
            username: "svc".into(),
            password: "pw".into(),
        };
        assert!(gateway.connect("mem://", &creds));
        let mut lock = gateway.lock().expect("lock");
        let outcomes = requests
            .iter()
            .map(|r| apply(&mut lock, &mut matcher, r, &mut audit))
            .collect();
        lock.release();
        outcomes
    }

    #[test]
    fn create_on_existing_key_is_rejected_without_write() {
        let mut remote = MemoryRemote::with_keys([("A1", "G1", "R1")]);
        let outcomes = run(&mut remote, &[request(Action::Create, ("A1", "G1", "R1"))]);
        assert_eq!(outcomes, vec![LineOutcome::AlreadyExists]);
        assert_eq!(remote.calls.writes(), 0);
    }

    #[test]
    fn create_on_new_key_writes_all_fields() {
        let mut remote = MemoryRemote::with_keys([("A1", "G1", "R1")]);
        let outcomes = run(&mut remote, &[request(Action::Create, ("A2", "G2", "R2"))]);
        assert_eq!(outcomes, vec![LineOutcome::Created]);

        let created = &remote.rows()[1];
        assert_eq!(created.fields.len(), 6);
        assert_eq!(created.text(fields::STATUS), Some("closed"));
    }

    #[test]
    fn update_touches_only_mutable_fields() {
        let mut remote = MemoryRemote::with_keys([("A1", "G1", "R1")]);
        let outcomes = run(&mut remote, &[request(Action::Update, ("A1", "G1", "R1"))]);
        assert_eq!(outcomes, vec![LineOutcome::Updated]);

        let row = &remote.rows()[0];
        assert_eq!(row.text(fields::INTERNAL_COST_CENTER_ID), Some("A1"));
        assert_eq!(row.text(fields::LAST_UPDATE_BY), Some("jdoe"));
        assert!(matches!(
            row.fields.get(fields::LAST_UPDATE_DATE),
            Some(FieldValue::Date(_))
        ));
    }

    #[test]
    fn rejection_writes_error_code_to_audit() {
        let mut remote = MemoryRemote::with_keys([("A1", "G1", "R1")]);
        let mut matcher = RowMatcher::new(remote.rows().to_vec());
        let mut audit = AuditLog::new(std::env::temp_dir(), "applier-codes");
        let mut gateway = Gateway::new(&mut remote);
        let creds = Credentials {
            username: "svc".into(),
            password: "pw".into(),
        };
        assert!(gateway.connect("mem://", &creds));
        let mut lock = gateway.lock().expect("lock");

        let missing = request(Action::Update, ("A9", "G9", "R9"));
        apply(&mut lock, &mut matcher, &missing, &mut audit);
        lock.release();

        let messages: Vec<&str> = audit.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            &messages[messages.len() - 2..],
            &["Line rejected : cost center doesn't exist", "Error code : 7"]
        );
    }

    #[test]
    fn update_on_missing_key_is_rejected() {
        let mut remote = MemoryRemote::with_keys([("A1", "G1", "R1")]);
        let outcomes = run(&mut remote, &[request(Action::Update, ("A9", "G9", "R9"))]);
        assert_eq!(outcomes, vec![LineOutcome::DoesNotExist]);
        assert_eq!(remote.calls.writes(), 0);
    }

    #[test]
    fn remote_rejection_is_a_line_failure() {
        let mut remote = MemoryRemote::with_keys([("A1", "G1", "R1")]);
        remote.faults.reject_writes_for.insert("A5".into());
        let outcomes = run(&mut remote, &[request(Action::Create, ("A5", "G5", "R5"))]);
        assert!(matches!(outcomes[0], LineOutcome::WriteFailed(_)));
        assert!(!outcomes[0].is_success());
    }

    #[test]
    fn key_created_earlier_in_batch_is_visible() {
        let mut remote = MemoryRemote::with_keys([("A1", "G1", "R1")]);
        let outcomes = run(
            &mut remote,
            &[
                request(Action::Create, ("A3", "G3", "R3")),
                request(Action::Create, ("A3", "G3", "R3")),
                request(Action::Update, ("A3", "G3", "R3")),
            ],
        );
        assert_eq!(
            outcomes,
            vec![
                LineOutcome::Created,
                LineOutcome::AlreadyExists,
                LineOutcome::Updated
            ]
        );
        assert_eq!(remote.rows().len(), 2);
    }
}
