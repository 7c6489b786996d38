//! ccmirror: cost center mirror batch synchronizer.
//!
//! # Usage
//!
//! ```text
//! ccmirror run [--config PATH] [--json]
//! ccmirror discover [--config PATH]
//! ```
//!
//! `run` exits with the batch outcome code (0 on success).

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{discover::DiscoverArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "ccmirror",
    version,
    about = "Apply cost center change requests to the remote mirror table",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process every pending request file in one locked batch.
    Run(RunArgs),

    /// List pending request files without contacting the remote.
    Discover(DiscoverArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Discover(args) => args.run(),
    }
}
