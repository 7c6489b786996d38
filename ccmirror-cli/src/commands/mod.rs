pub mod discover;
pub mod run;

use std::fmt::Display;
use std::path::Path;
use std::process::ExitCode;

use ccmirror_core::{BatchOutcome, Config, ConfigError};
use colored::Colorize;

/// Load `path`, or `~/.ccmirror/config.yaml` when none is given.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_at(path),
        None => Config::load(),
    }
}

/// Report a configuration problem and map it to its exit status.
pub fn config_failure(err: impl Display) -> ExitCode {
    eprintln!("{} {err}", "error:".red().bold());
    outcome_exit(BatchOutcome::MissingConfiguration)
}

pub fn outcome_exit(outcome: BatchOutcome) -> ExitCode {
    ExitCode::from(outcome.exit_code())
}
