//! `diop init [--root <dir>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use diop_sync::Workspace;

use super::download::print_writes;

/// Create `operators/`, `testdata/`, `utils/` and the support modules.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project root; created when missing.
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// Show what would be written without writing.
    #[arg(long)]
    pub dry_run: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let workspace = Workspace::new(&self.root);
        let writes = workspace
            .init(self.dry_run)
            .with_context(|| format!("failed to initialize '{}'", self.root.display()))?;

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        println!("{prefix}✓ Project layout ready in '{}'", self.root.display());
        print_writes(&writes);
        Ok(())
    }
}
