//! `diop diff <package.operator>`: show unified diffs for what download would write.

use anyhow::{Context, Result};
use clap::Args;

use diop_core::OperatorId;
use diop_renderer::Generator;
use diop_sync::pipeline;

use super::ConnectionArgs;

/// Arguments for `diop diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Operator to compare.
    pub operator: OperatorId,

    /// Compare against freshly generated scripts instead of the kept ones.
    #[arg(long)]
    pub overwrite: bool,

    /// Directory of `.tera` files overriding the built-in templates.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<std::path::PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let generator = Generator::with_templates(self.templates.as_deref())
            .context("failed to load templates")?;
        let mut conn = self.connection.connect()?;

        let diffs = pipeline::preview(
            &mut conn.client,
            &conn.layout,
            &conn.workspace,
            &generator,
            &self.operator,
            self.overwrite,
        )
        .with_context(|| format!("diff failed for '{}'", self.operator))?;

        if diffs.is_empty() {
            println!("No differences for '{}'.", self.operator);
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        Ok(())
    }
}
