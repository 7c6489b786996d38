//! `ccmirror discover`: list pending request files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use ccmirror_core::BatchOutcome;
use ccmirror_sync::discovery;

use super::{config_failure, load_config, outcome_exit};

/// Arguments for `ccmirror discover`.
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Config file; defaults to `~/.ccmirror/config.yaml`.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl DiscoverArgs {
    pub fn run(self) -> Result<ExitCode> {
        let config = match load_config(self.config.as_deref()) {
            Ok(config) => config,
            Err(err) => return Ok(config_failure(err)),
        };
        let paths = match config.validate_paths() {
            Ok(paths) => paths,
            Err(err) => return Ok(config_failure(err)),
        };
        if !paths.requests_dir.is_dir() {
            eprintln!(
                "{} missing request folder {}",
                "error:".red().bold(),
                paths.requests_dir.display()
            );
            return Ok(outcome_exit(BatchOutcome::MissingRequestDirectory));
        }

        let files = match discovery::discover(&paths.requests_dir, &config.request_extension) {
            Ok(files) => files,
            Err(err) => {
                eprintln!("{} {err}", "error:".red().bold());
                return Ok(outcome_exit(BatchOutcome::FilesystemDiscoveryFailed));
            }
        };

        if files.is_empty() {
            println!("No request file to process.");
        }
        for file in &files {
            println!("{}", file.display());
        }
        Ok(ExitCode::SUCCESS)
    }
}
