//! ccmirror core library: domain types, configuration, errors.
//!
//! - [`types`]: change requests, remote rows, composite keys, batch outcomes
//! - [`config`]: YAML configuration load / validate
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, CsvConfig, Credentials, RemoteConfig, ValidatedPaths};
pub use error::ConfigError;
pub use types::{
    Action, BatchOutcome, ChangeRequest, CompositeKey, FieldSet, FieldValue, RejectionCode,
    RemoteRow, RowId,
};
