//! `diop upload <package.operator>`: reconcile and upload the local copy.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use diop_core::OperatorId;
use diop_sync::{pipeline, reconcile, UploadPlan};

use super::ConnectionArgs;

/// Arguments for `diop upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Operator to upload; read from `operators/<package>/<operator>/`.
    pub operator: OperatorId,

    /// Print the plan without creating or writing anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Tabled)]
struct UploadRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "remote path")]
    remote: String,
}

impl UploadArgs {
    pub fn run(self) -> Result<()> {
        let mut conn = self.connection.connect()?;
        let plan = pipeline::plan_upload(&mut conn.client, &conn.layout, &conn.workspace, &self.operator)
            .with_context(|| format!("cannot plan upload of '{}'", self.operator))?;

        if self.dry_run {
            print_plan(&plan);
            return Ok(());
        }

        let report = reconcile::execute_upload(&mut conn.client, &conn.workspace, &plan)
            .with_context(|| format!("upload failed for '{}'", self.operator))?;

        for folder in &report.created_folders {
            println!("  +  {folder}");
        }
        for path in &report.rewritten_locally {
            println!("  ✎  {}", path.display());
        }
        let rows: Vec<UploadRow> = plan
            .files_to_write
            .iter()
            .map(|f| UploadRow {
                file: f.name.clone(),
                remote: f.remote_path.clone(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("✓ '{}' uploaded ({} files)", self.operator, report.written.len());
        Ok(())
    }
}

fn print_plan(plan: &UploadPlan) {
    println!("[dry-run] upload plan for '{}'", plan.operator);
    for folder in &plan.folders_to_create {
        println!("  mkdir   {folder}");
    }
    for name in &plan.renamed_files {
        println!("  rename  {name}");
    }
    for file in &plan.files_to_write {
        let note = if file.staged { " (header stripped)" } else { "" };
        println!("  put     {}{note}", file.remote_path);
    }
}
