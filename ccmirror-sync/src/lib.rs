//! # ccmirror-sync
//!
//! Batch synchronization of staged change-request files into the remote
//! mirror table.
//!
//! Build an [`Orchestrator`] from a [`ccmirror_core::Config`] and call
//! [`Orchestrator::run`] with a remote and a decoder. The returned
//! [`BatchReport`] carries the batch outcome and the terminal state of every
//! processed file.

pub mod applier;
pub mod audit;
pub mod decoder;
pub mod discovery;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod snapshot;
pub mod transition;

pub use applier::LineOutcome;
pub use decoder::{CsvDecoder, RequestDecoder};
pub use error::{DecodeError, SyncError};
pub use orchestrator::{BatchReport, FileReport, LineReport, Orchestrator};
