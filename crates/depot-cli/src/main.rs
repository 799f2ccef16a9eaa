//! # depot CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use depot_cli::build::{run_build, BuildCommand};

/// Depot operator CLI.
///
/// Inspects and replaces the current game build in an uploads directory.
#[derive(Parser, Debug)]
#[command(name = "depot", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Uploads directory holding the builds and `metadata.json`.
    #[arg(long, env = "UPLOADS_DIR", global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: BuildCommand,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let uploads_dir = depot_cli::uploads_dir(cli.dir);
    tracing::debug!(uploads_dir = %uploads_dir.display(), "resolved uploads directory");

    let mut stdout = std::io::stdout().lock();
    match run_build(&cli.command, &uploads_dir, &mut stdout) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
