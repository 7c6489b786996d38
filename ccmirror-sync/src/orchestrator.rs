//! Batch orchestration.
//!
//! ## `Orchestrator::run` state machine
//!
//! 1. Validate the three configured directories.
//! 2. Require the request directory; create results/logs if missing.
//! 3. Discover pending request files (none → success, no remote calls).
//! 4. Connect.
//! 5. Lock the table (failure → every file KO, nothing written).
//! 6. Read the snapshot once (empty → abort, files left in place).
//! 7. Process files in discovery order, lines in file order; every processed
//!    file is moved and its audit log persisted.
//! 8. Release the lock if held, then disconnect.
//!
//! Steps 4–8 run inside [`Gateway`] / [`TableLock`] guards, so release and
//! logout also happen if processing unwinds.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ccmirror_core::{
    Action, BatchOutcome, CompositeKey, Config, Credentials, RejectionCode, ValidatedPaths,
};
use ccmirror_remote::{Gateway, RemoteApi, TableLock};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::applier::{self, LineOutcome};
use crate::audit::AuditLog;
use crate::decoder::RequestDecoder;
use crate::discovery;
use crate::matcher::RowMatcher;
use crate::snapshot;
use crate::transition;

/// Reason recorded in the audit log of every file when the lock is refused.
pub const LOCK_FAILED_REASON: &str = "Failed to lock table";

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// One applied change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineReport {
    pub action: Action,
    pub key: CompositeKey,
    pub outcome: LineOutcome,
}

/// Terminal state of one request file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    /// Where the file was moved; `None` if the move itself failed.
    pub destination: Option<PathBuf>,
    /// Persisted audit log; `None` if persisting failed.
    pub log: Option<PathBuf>,
    pub succeeded: bool,
    pub lines: Vec<LineReport>,
    /// File-level failure (decode error or lock refusal).
    pub error: Option<String>,
}

/// Result of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    /// Files found in the request directory, in processing order.
    pub discovered: Vec<PathBuf>,
    /// Files that reached a terminal state.
    pub files: Vec<FileReport>,
    pub duration_ms: u128,
}

impl BatchReport {
    pub fn succeeded_files(&self) -> usize {
        self.files.iter().filter(|f| f.succeeded).count()
    }

    pub fn failed_files(&self) -> usize {
        self.files.len() - self.succeeded_files()
    }
}

// ---------------------------------------------------------------------------
// Stopwatch
// ---------------------------------------------------------------------------

/// Named phase timings, logged once at the end of the batch.
#[derive(Debug, Default)]
struct Stopwatch {
    phases: Vec<(&'static str, Duration)>,
}

impl Stopwatch {
    fn time<T>(&mut self, phase: &'static str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record(phase, started);
        out
    }

    fn record(&mut self, phase: &'static str, started: Instant) {
        self.phases.push((phase, started.elapsed()));
    }

    fn log(&self) {
        for (phase, elapsed) in &self.phases {
            tracing::info!("{phase}: {} ms", elapsed.as_millis());
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    config: &'a Config,
    endpoint: &'a str,
    credentials: &'a Credentials,
    clock: fn() -> DateTime<Local>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, endpoint: &'a str, credentials: &'a Credentials) -> Self {
        Self {
            config,
            endpoint,
            credentials,
            clock: Local::now,
        }
    }

    /// Replace the clock used for outcome stamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one batch against `remote`.
    pub fn run(&self, remote: &mut dyn RemoteApi, decoder: &dyn RequestDecoder) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport {
            outcome: BatchOutcome::Success,
            discovered: Vec::new(),
            files: Vec::new(),
            duration_ms: 0,
        };
        report.outcome = self.run_inner(remote, decoder, &mut report);
        report.duration_ms = started.elapsed().as_millis();
        tracing::info!(
            "batch finished: {} ({} OK, {} KO) in {} ms",
            report.outcome,
            report.succeeded_files(),
            report.failed_files(),
            report.duration_ms
        );
        report
    }

    fn run_inner(
        &self,
        remote: &mut dyn RemoteApi,
        decoder: &dyn RequestDecoder,
        report: &mut BatchReport,
    ) -> BatchOutcome {
        tracing::info!("validating configuration");
        let paths = match self.config.validate_paths() {
            Ok(paths) => paths,
            Err(err) => {
                tracing::error!("configuration is not valid: {err}");
                return BatchOutcome::MissingConfiguration;
            }
        };

        if !paths.requests_dir.is_dir() {
            tracing::error!("missing request folder {}", paths.requests_dir.display());
            return BatchOutcome::MissingRequestDirectory;
        }
        for dir in [&paths.results_dir, &paths.logs_dir] {
            if let Err(err) = std::fs::create_dir_all(dir) {
                tracing::warn!("could not create {}: {err}", dir.display());
            }
        }

        report.discovered =
            match discovery::discover(&paths.requests_dir, &self.config.request_extension) {
                Ok(files) => files,
                Err(err) => {
                    tracing::error!("failed to list request files: {err}");
                    return BatchOutcome::FilesystemDiscoveryFailed;
                }
            };
        if report.discovered.is_empty() {
            tracing::info!("no request file to be processed");
            return BatchOutcome::Success;
        }
        tracing::info!("found {} file(s) to process", report.discovered.len());

        let mut stopwatch = Stopwatch::default();
        let outcome = {
            let mut gateway = Gateway::new(remote);
            let outcome =
                self.run_connected(&mut gateway, decoder, &paths, report, &mut stopwatch);
            stopwatch.time("logout", || gateway.disconnect());
            outcome
        };
        stopwatch.log();
        outcome
    }

    fn run_connected(
        &self,
        gateway: &mut Gateway<'_>,
        decoder: &dyn RequestDecoder,
        paths: &ValidatedPaths,
        report: &mut BatchReport,
        stopwatch: &mut Stopwatch,
    ) -> BatchOutcome {
        if !stopwatch.time("connect", || gateway.connect(self.endpoint, self.credentials)) {
            return BatchOutcome::RemoteConnectFailed;
        }

        let started = Instant::now();
        let locked = gateway.lock();
        stopwatch.record("lock", started);
        let mut lock = match locked {
            Ok(lock) => lock,
            Err(err) => {
                tracing::error!("{LOCK_FAILED_REASON}: {err}");
                for path in &report.discovered {
                    let file = self.reject_locked(path, paths);
                    report.files.push(file);
                }
                return BatchOutcome::GlobalLockFailed;
            }
        };

        let outcome = self.run_locked(&mut lock, decoder, paths, report, stopwatch);
        if !stopwatch.time("save and unlock", || lock.release()) {
            tracing::warn!("table release did not complete cleanly");
        }
        outcome
    }

    fn run_locked(
        &self,
        lock: &mut TableLock<'_, '_>,
        decoder: &dyn RequestDecoder,
        paths: &ValidatedPaths,
        report: &mut BatchReport,
        stopwatch: &mut Stopwatch,
    ) -> BatchOutcome {
        let rows = stopwatch.time("snapshot", || snapshot::read(lock));
        if rows.is_empty() {
            tracing::error!("mirror table snapshot is empty or unavailable; no file processed");
            return BatchOutcome::SnapshotEmptyOrUnavailable;
        }
        let mut matcher = RowMatcher::new(rows);

        stopwatch.time("process files", || {
            for path in &report.discovered {
                let file = self.process_file(lock, &mut matcher, decoder, path, paths);
                report.files.push(file);
            }
        });
        BatchOutcome::Success
    }

    fn process_file(
        &self,
        lock: &mut TableLock<'_, '_>,
        matcher: &mut RowMatcher,
        decoder: &dyn RequestDecoder,
        path: &Path,
        paths: &ValidatedPaths,
    ) -> FileReport {
        tracing::info!("processing file {}", path.display());
        let mut audit = AuditLog::new(&paths.logs_dir, transition::basename(path));
        let mut lines = Vec::new();
        let mut error = None;

        match decoder.decode(path) {
            Ok(requests) => {
                tracing::info!("found {} line(s)", requests.len());
                for request in &requests {
                    let outcome = applier::apply(lock, matcher, request, &mut audit);
                    lines.push(LineReport {
                        action: request.action,
                        key: request.key(),
                        outcome,
                    });
                }
            }
            Err(err) => {
                tracing::error!("failed to decode {}: {err}", path.display());
                audit.error(format!("Failed to process file : {err}"));
                audit.error_code(RejectionCode::FileError.code());
                error = Some(err.to_string());
            }
        }

        let succeeded = lines.iter().any(|l| l.outcome.is_success());
        self.finish_file(path, paths, audit, succeeded, lines, error)
    }

    fn reject_locked(&self, path: &Path, paths: &ValidatedPaths) -> FileReport {
        let mut audit = AuditLog::new(&paths.logs_dir, transition::basename(path));
        audit.error(LOCK_FAILED_REASON);
        audit.error_code(BatchOutcome::GlobalLockFailed.exit_code());
        self.finish_file(
            path,
            paths,
            audit,
            false,
            Vec::new(),
            Some(LOCK_FAILED_REASON.to_string()),
        )
    }

    /// Move the file and persist its log. Faults are logged, never
    /// propagated, and do not change `succeeded`.
    fn finish_file(
        &self,
        path: &Path,
        paths: &ValidatedPaths,
        audit: AuditLog,
        succeeded: bool,
        lines: Vec<LineReport>,
        error: Option<String>,
    ) -> FileReport {
        let stamp = transition::stamp((self.clock)());

        let destination = match transition::move_to_results(
            path,
            &paths.results_dir,
            &stamp,
            succeeded,
            &self.config.request_extension,
        ) {
            Ok(dest) => Some(dest),
            Err(err) => {
                tracing::error!("failed to move {}: {err}", path.display());
                None
            }
        };
        let log = match audit.persist(&stamp, succeeded) {
            Ok(log) => Some(log),
            Err(err) => {
                tracing::error!("failed to save log for {}: {err}", path.display());
                None
            }
        };

        tracing::info!(
            "file processed: {} ({})",
            path.display(),
            transition::outcome_label(succeeded)
        );
        FileReport {
            source: path.to_path_buf(),
            destination,
            log,
            succeeded,
            lines,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
