//! `ccmirror run`: one synchronization batch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use ccmirror_remote::HttpRemote;
use ccmirror_sync::{BatchReport, CsvDecoder, FileReport, Orchestrator};

use super::{config_failure, load_config, outcome_exit};

/// Arguments for `ccmirror run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file; defaults to `~/.ccmirror/config.yaml`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit the batch report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<ExitCode> {
        let config = match load_config(self.config.as_deref()) {
            Ok(config) => config,
            Err(err) => return Ok(config_failure(err)),
        };
        let remote_config = match config.remote() {
            Ok(remote) => remote,
            Err(err) => return Ok(config_failure(err)),
        };
        let credentials = match remote_config.credentials() {
            Ok(credentials) => credentials,
            Err(err) => return Ok(config_failure(err)),
        };
        let decoder = match CsvDecoder::from_config(&config.csv) {
            Ok(decoder) => decoder,
            Err(err) => return Ok(config_failure(err)),
        };

        let mut remote = HttpRemote::from_config(remote_config);
        let report = Orchestrator::new(&config, &remote_config.url, &credentials)
            .run(&mut remote, &decoder);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize batch report")?
            );
        } else {
            print_table(&report);
        }
        Ok(outcome_exit(report.outcome))
    }
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "lines")]
    lines: String,
    #[tabled(rename = "moved to")]
    destination: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl From<&FileReport> for FileRow {
    fn from(file: &FileReport) -> Self {
        let applied = file.lines.iter().filter(|l| l.outcome.is_success()).count();
        Self {
            file: file_name(&file.source),
            result: if file.succeeded { "OK" } else { "KO" }.to_string(),
            lines: format!("{applied}/{}", file.lines.len()),
            destination: file
                .destination
                .as_deref()
                .map(file_name)
                .unwrap_or_else(|| "-".to_string()),
            detail: file.error.clone().unwrap_or_default(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_table(report: &BatchReport) {
    let status = if report.outcome.is_success() {
        report.outcome.to_string().green().bold()
    } else {
        report.outcome.to_string().red().bold()
    };
    println!(
        "ccmirror v{} | {} | {} file(s) | {} OK | {} KO | {} ms",
        env!("CARGO_PKG_VERSION"),
        status,
        report.discovered.len(),
        report.succeeded_files(),
        report.failed_files(),
        report.duration_ms,
    );

    if report.files.is_empty() {
        if report.discovered.is_empty() {
            println!("No request file to process.");
        } else {
            println!("No file was processed; request files left in place.");
        }
        return;
    }

    let rows: Vec<FileRow> = report.files.iter().map(FileRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
