//! diop: scaffold and sync Python operators of a data pipeline platform.
//!
//! # Usage
//!
//! ```text
//! diop init [--root <dir>]
//! diop profile set [--url <url>] [--tenant <t>] [--user <u>] [--operators-root <path>] [--client <prog>]
//! diop profile show
//! diop download <package.operator> [--overwrite] [--dry-run]
//! diop diff <package.operator> [--overwrite]
//! diop upload <package.operator> [--dry-run]
//! ```
//!
//! The password is never stored: pass `--password` or set `DIOP_PASSWORD`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, download::DownloadArgs, init::InitArgs, profile::ProfileCommand,
    upload::UploadArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "diop",
    version,
    about = "Download, scaffold and upload Python operators",
    long_about = None,
)]
struct Cli {
    /// Log every repository call (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the local project layout and write the support modules.
    Init(InitArgs),

    /// Manage the stored connection profile.
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Download an operator and scaffold its script and test script.
    Download(DownloadArgs),

    /// Show unified diffs of what download would write.
    Diff(DiffArgs),

    /// Upload the local copy of an operator.
    Upload(UploadArgs),
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Profile { command } => commands::profile::run(command),
        Commands::Download(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Upload(args) => args.run(),
    }
}
