//! Per-file audit trail.
//!
//! Messages are buffered in memory while the file is processed and written
//! once, next to the other logs, when the file reaches its terminal state.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::error::{io_err, SyncError};
use crate::transition::outcome_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Level::Info => "INFO",
            Level::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub at: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

#[derive(Debug)]
pub struct AuditLog {
    dir: PathBuf,
    basename: String,
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            basename: basename.into(),
            entries: Vec::new(),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message.into());
    }

    /// `Error code : <code>` at error level.
    pub fn error_code(&mut self, code: u8) {
        self.error(format!("Error code : {code}"));
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// `<dir>/<basename>_<stamp>_<OK|KO>.log`. Pure, no I/O.
    pub fn path_for(&self, stamp: &str, succeeded: bool) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.log",
            self.basename,
            stamp,
            outcome_label(succeeded)
        ))
    }

    /// Write every buffered entry. Consumes the log so it is persisted once.
    ///
    /// Writes to `<path>.tmp` then renames to `<path>`.
    pub fn persist(self, stamp: &str, succeeded: bool) -> Result<PathBuf, SyncError> {
        let path = self.path_for(stamp, succeeded);
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;

        let body: String = self
            .entries
            .iter()
            .map(|e| {
                format!(
                    "{} {:<5} {}\n",
                    e.at.format("%Y-%m-%d %H:%M:%S"),
                    e.level,
                    e.message
                )
            })
            .collect();

        let tmp = path.with_extension("log.tmp");
        std::fs::write(&tmp, body).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&path, e));
        }
        Ok(path)
    }

    fn push(&mut self, level: Level, message: String) {
        self.entries.push(AuditEntry {
            at: Local::now(),
            level,
            message,
        });
    }
}
