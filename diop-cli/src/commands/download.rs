//! `diop download <package.operator>`: fetch an operator and scaffold it.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use diop_core::OperatorId;
use diop_renderer::{ArtifactAction, Generator};
use diop_sync::{pipeline, DownloadOptions, WriteResult};

use super::ConnectionArgs;

/// Arguments for `diop download`.
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Operator to download, e.g. `demo.passthrough`.
    pub operator: OperatorId,

    /// Regenerate the script and test script even if they exist.
    #[arg(long)]
    pub overwrite: bool,

    /// Show what would be written without writing any files.
    #[arg(long)]
    pub dry_run: bool,

    /// Directory of `.tera` files overriding the built-in templates.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<std::path::PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl DownloadArgs {
    pub fn run(self) -> Result<()> {
        let generator = Generator::with_templates(self.templates.as_deref())
            .context("failed to load templates")?;
        let mut conn = self.connection.connect()?;

        let report = pipeline::download(
            &mut conn.client,
            &conn.layout,
            &conn.workspace,
            &generator,
            &self.operator,
            DownloadOptions {
                overwrite: self.overwrite,
                dry_run: self.dry_run,
            },
        )
        .with_context(|| format!("download failed for '{}'", self.operator))?;

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        println!("{prefix}✓ '{}' downloaded", report.operator);
        for (name, action) in &report.actions {
            println!("  {:<11} {name}", action_label(*action));
        }
        print_writes(&report.writes);
        Ok(())
    }
}

fn action_label(action: ArtifactAction) -> colored::ColoredString {
    match action {
        ArtifactAction::Created => "created".green(),
        ArtifactAction::Regenerated => "regenerated".yellow(),
        ArtifactAction::Adjusted => "adjusted".cyan(),
        ArtifactAction::Unchanged => "kept".normal(),
    }
}

pub(crate) fn print_writes(writes: &[WriteResult]) {
    let written = writes
        .iter()
        .filter(|r| !matches!(r, WriteResult::Unchanged { .. }))
        .count();
    println!("  {} written, {} unchanged", written, writes.len() - written);

    for r in writes {
        match r {
            WriteResult::Written { path } => println!("  ✎  {}", path.display()),
            WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
            WriteResult::Unchanged { path } => {
                println!("  {}", format!("·  {}", path.display()).bright_black())
            }
        }
    }
}
