//! `diop profile set` and `diop profile show`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use diop_core::{profile as stored, ConnectionProfile};

/// Manage the stored connection profile (`~/.diop/profile.yaml`).
#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Create or update the profile. Unset flags keep their stored value.
    Set(SetArgs),

    /// Print the stored profile.
    Show,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Base URL of the remote system. Required for a new profile.
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub tenant: Option<String>,

    /// Required for a new profile.
    #[arg(long)]
    pub user: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub operators_root: Option<String>,

    #[arg(long, value_name = "PROGRAM")]
    pub client: Option<String>,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "setting")]
    key: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

pub fn run(cmd: ProfileCommand) -> Result<()> {
    match cmd {
        ProfileCommand::Set(args) => set(args),
        ProfileCommand::Show => show(),
    }
}

fn set(args: SetArgs) -> Result<()> {
    let existing = stored::load_optional().context("failed to load profile")?;
    let mut profile = match (existing, &args.url, &args.user) {
        (Some(p), _, _) => p,
        (None, Some(url), Some(user)) => ConnectionProfile::new(url.clone(), user.clone()),
        (None, _, _) => anyhow::bail!("a new profile needs both --url and --user"),
    };

    let updates = [
        (&mut profile.url, args.url),
        (&mut profile.tenant, args.tenant),
        (&mut profile.user, args.user),
        (&mut profile.operators_root, args.operators_root),
        (&mut profile.client, args.client),
    ];
    for (field, value) in updates {
        if let Some(value) = value {
            *field = value;
        }
    }
    profile.touch();

    stored::save(&profile).context("failed to save profile")?;
    println!("✓ Saved profile for {}@{}", profile.user, profile.url);
    Ok(())
}

fn show() -> Result<()> {
    let Some(profile) = stored::load_optional().context("failed to load profile")? else {
        println!("No profile stored.");
        println!("Run: diop profile set --url <url> --user <user>");
        return Ok(());
    };

    let rows = vec![
        ProfileRow { key: "url", value: profile.url },
        ProfileRow { key: "tenant", value: profile.tenant },
        ProfileRow { key: "user", value: profile.user },
        ProfileRow { key: "operators root", value: profile.operators_root },
        ProfileRow { key: "client", value: profile.client },
        ProfileRow { key: "updated", value: profile.updated_at.to_rfc3339() },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
