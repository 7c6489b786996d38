//! Domain types for the cost-center mirror table.
//!
//! Remote rows are field-keyed records; change requests are the parsed
//! mutation intents read from request files. Both share the same six fields
//! named in [`fields`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field names of the mirror table, as exposed by the remote.
pub mod fields {
    pub const INTERNAL_COST_CENTER_ID: &str = "Internal cost center ID";
    pub const SECONDARY_MIRROR_ID: &str = "Secondary mirror global cost center ID";
    pub const SECONDARY_MIRROR_REGION: &str = "Secondary mirror global cost center RE";
    pub const LAST_UPDATE_BY: &str = "Last update by";
    pub const LAST_UPDATE_DATE: &str = "Last update date";
    pub const STATUS: &str = "Status";
}

/// Default name of the remote table holding the mirror rows.
pub const DEFAULT_TABLE_NAME: &str = "Cost center mirror";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identity of a row inside the remote table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(pub String);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The triple identifying one logical mirror row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeKey {
    pub internal_cost_center_id: String,
    pub secondary_mirror_id: String,
    pub secondary_mirror_region: String,
}

impl CompositeKey {
    pub fn new(
        internal_cost_center_id: impl Into<String>,
        secondary_mirror_id: impl Into<String>,
        secondary_mirror_region: impl Into<String>,
    ) -> Self {
        Self {
            internal_cost_center_id: internal_cost_center_id.into(),
            secondary_mirror_id: secondary_mirror_id.into(),
            secondary_mirror_region: secondary_mirror_region.into(),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {}",
            self.internal_cost_center_id, self.secondary_mirror_region, self.secondary_mirror_id
        )
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Operation requested by a change-request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "Create"),
            Action::Update => write!(f, "Update"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" | "CREATE" | "CREATION" => Ok(Action::Create),
            "U" | "UPDATE" => Ok(Action::Update),
            other => Err(format!(
                "unknown action '{other}'; expected: CREATION, UPDATE"
            )),
        }
    }
}

/// A single typed value stored in a remote field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Date(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Date(_) => None,
        }
    }
}

/// Field name → value, ordered for stable serialization.
pub type FieldSet = BTreeMap<String, FieldValue>;

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One parsed mutation intent. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub action: Action,
    pub internal_cost_center_id: String,
    pub secondary_mirror_id: String,
    pub secondary_mirror_region: String,
    pub last_update_by: String,
    pub last_update_at: DateTime<Utc>,
    pub status: String,
}

impl ChangeRequest {
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(
            self.internal_cost_center_id.clone(),
            self.secondary_mirror_id.clone(),
            self.secondary_mirror_region.clone(),
        )
    }

    /// Every field of the row: key fields plus the mutable ones.
    pub fn create_fields(&self) -> FieldSet {
        let mut set = self.update_fields();
        set.insert(
            fields::INTERNAL_COST_CENTER_ID.to_string(),
            FieldValue::Text(self.internal_cost_center_id.clone()),
        );
        set.insert(
            fields::SECONDARY_MIRROR_ID.to_string(),
            FieldValue::Text(self.secondary_mirror_id.clone()),
        );
        set.insert(
            fields::SECONDARY_MIRROR_REGION.to_string(),
            FieldValue::Text(self.secondary_mirror_region.clone()),
        );
        set
    }

    /// Only the mutable fields. Key fields are never part of an update.
    pub fn update_fields(&self) -> FieldSet {
        let mut set = FieldSet::new();
        set.insert(
            fields::LAST_UPDATE_BY.to_string(),
            FieldValue::Text(self.last_update_by.clone()),
        );
        set.insert(
            fields::LAST_UPDATE_DATE.to_string(),
            FieldValue::Date(self.last_update_at),
        );
        set.insert(
            fields::STATUS.to_string(),
            FieldValue::Text(self.status.to_lowercase()),
        );
        set
    }
}

/// A record of the remote mirror table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub id: RowId,
    #[serde(default)]
    pub fields: FieldSet,
}

impl RemoteRow {
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::as_text)
    }

    /// Composite key of the row, or `None` when a key field is missing or
    /// not a text field.
    pub fn key(&self) -> Option<CompositeKey> {
        Some(CompositeKey::new(
            self.text(fields::INTERNAL_COST_CENTER_ID)?,
            self.text(fields::SECONDARY_MIRROR_ID)?,
            self.text(fields::SECONDARY_MIRROR_REGION)?,
        ))
    }
}

// ---------------------------------------------------------------------------
// Batch outcome
// ---------------------------------------------------------------------------

/// Batch-level result of one orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Success,
    MissingConfiguration,
    MissingRequestDirectory,
    RemoteConnectFailed,
    GlobalLockFailed,
    SnapshotEmptyOrUnavailable,
    FilesystemDiscoveryFailed,
}

impl BatchOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            BatchOutcome::Success => 0,
            BatchOutcome::MissingConfiguration => 1,
            BatchOutcome::MissingRequestDirectory => 2,
            BatchOutcome::RemoteConnectFailed => 3,
            BatchOutcome::GlobalLockFailed => 4,
            BatchOutcome::SnapshotEmptyOrUnavailable => 5,
            BatchOutcome::FilesystemDiscoveryFailed => 6,
        }
    }

    pub fn is_success(self) -> bool {
        self == BatchOutcome::Success
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchOutcome::Success => "success",
            BatchOutcome::MissingConfiguration => "missing configuration",
            BatchOutcome::MissingRequestDirectory => "missing request directory",
            BatchOutcome::RemoteConnectFailed => "remote connection failed",
            BatchOutcome::GlobalLockFailed => "failed to lock table",
            BatchOutcome::SnapshotEmptyOrUnavailable => "table snapshot empty or unavailable",
            BatchOutcome::FilesystemDiscoveryFailed => "request discovery failed",
        };
        f.write_str(s)
    }
}

/// Codes written to a file's audit log when a line or the whole file is
/// rejected. They continue the [`BatchOutcome`] numbering and never become a
/// process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    LineRejected,
    FileError,
}

impl RejectionCode {
    pub fn code(self) -> u8 {
        match self {
            RejectionCode::LineRejected => 7,
            RejectionCode::FileError => 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(action: Action) -> ChangeRequest {
        ChangeRequest {
            action,
            internal_cost_center_id: "A1".into(),
            secondary_mirror_id: "G1".into(),
            secondary_mirror_region: "R1".into(),
            last_update_by: "jdoe".into(),
            last_update_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
            status: "ACTIVE".into(),
        }
    }

    #[test]
    fn action_parses_legacy_and_short_forms() {
        assert_eq!("CREATION".parse::<Action>().unwrap(), Action::Create);
        assert_eq!("create".parse::<Action>().unwrap(), Action::Create);
        assert_eq!(" u ".parse::<Action>().unwrap(), Action::Update);
        assert!("delete".parse::<Action>().is_err());
    }

    #[test]
    fn update_fields_exclude_key_fields() {
        let set = request(Action::Update).update_fields();
        assert_eq!(set.len(), 3);
        assert!(!set.contains_key(fields::INTERNAL_COST_CENTER_ID));
        assert_eq!(
            set.get(fields::STATUS),
            Some(&FieldValue::Text("active".into()))
        );
    }

    #[test]
    fn create_fields_cover_every_column() {
        let set = request(Action::Create).create_fields();
        assert_eq!(set.len(), 6);
        assert_eq!(
            set.get(fields::SECONDARY_MIRROR_REGION),
            Some(&FieldValue::Text("R1".into()))
        );
    }

    #[test]
    fn row_key_requires_all_text_fields() {
        let req = request(Action::Create);
        let row = RemoteRow {
            id: RowId::from("1"),
            fields: req.create_fields(),
        };
        assert_eq!(row.key(), Some(req.key()));

        let mut partial = row.clone();
        partial.fields.remove(fields::SECONDARY_MIRROR_ID);
        assert_eq!(partial.key(), None);
    }

    #[test]
    fn key_display_matches_audit_format() {
        assert_eq!(request(Action::Create).key().to_string(), "A1 - R1 - G1");
    }

    #[test]
    fn exit_codes_are_distinct() {
        let all = [
            BatchOutcome::Success,
            BatchOutcome::MissingConfiguration,
            BatchOutcome::MissingRequestDirectory,
            BatchOutcome::RemoteConnectFailed,
            BatchOutcome::GlobalLockFailed,
            BatchOutcome::SnapshotEmptyOrUnavailable,
            BatchOutcome::FilesystemDiscoveryFailed,
        ];
        for (i, outcome) in all.iter().enumerate() {
            assert_eq!(outcome.exit_code() as usize, i);
        }
    }

    #[test]
    fn rejection_codes_follow_exit_codes() {
        let highest = BatchOutcome::FilesystemDiscoveryFailed.exit_code();
        assert_eq!(RejectionCode::LineRejected.code(), highest + 1);
        assert_eq!(RejectionCode::FileError.code(), highest + 2);
    }

    #[test]
    fn field_value_serializes_tagged() {
        let json = serde_yaml::to_string(&FieldValue::Text("x".into())).expect("serialize");
        assert!(json.contains("type: text"));
    }
}
