//! Subcommands, one module each.

pub mod diff;
pub mod download;
pub mod init;
pub mod profile;
pub mod upload;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use diop_core::{profile as stored, ConnectionProfile};
use diop_sync::{Credentials, RemoteLayout, RemoteRepository, VctlClient, Workspace};

/// Connection flags shared by every command that talks to the repository.
///
/// Unset flags fall back to the stored profile.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Base URL of the remote system.
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub tenant: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    /// Never stored.
    #[arg(long, env = "DIOP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Remote folder holding the operator packages.
    #[arg(long, value_name = "PATH")]
    pub operators_root: Option<String>,

    /// Repository client program.
    #[arg(long, value_name = "PROGRAM")]
    pub client: Option<String>,

    /// Local project root (contains `operators/`).
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,
}

/// A logged-in client plus where things live.
pub struct Connection {
    pub client: VctlClient,
    pub layout: RemoteLayout,
    pub workspace: Workspace,
}

impl ConnectionArgs {
    /// Merge flags over the stored profile and log in.
    pub fn connect(self) -> Result<Connection> {
        let profile = stored::load_optional().context("failed to load profile")?;
        let profile = self.merge(profile)?;

        let password = self
            .password
            .context("no password given; pass --password or set DIOP_PASSWORD")?;
        tracing::debug!(
            url = %profile.url,
            root = %profile.operators_root,
            client = %profile.client,
            "connecting"
        );
        let mut client = VctlClient::new(profile.client.clone());
        client
            .login(&Credentials {
                url: profile.url.clone(),
                tenant: profile.tenant.clone(),
                user: profile.user.clone(),
                password,
            })
            .with_context(|| format!("login to {} failed", profile.url))?;

        Ok(Connection {
            client,
            layout: RemoteLayout::new(profile.operators_root),
            workspace: Workspace::new(self.root),
        })
    }

    fn merge(&self, profile: Option<ConnectionProfile>) -> Result<ConnectionProfile> {
        let mut profile = match (profile, &self.url, &self.user) {
            (Some(p), _, _) => p,
            (None, Some(url), Some(user)) => ConnectionProfile::new(url.clone(), user.clone()),
            (None, _, _) => anyhow::bail!(
                "no connection profile; run `diop profile set` or pass --url and --user"
            ),
        };
        let overrides = [
            (&mut profile.url, &self.url),
            (&mut profile.tenant, &self.tenant),
            (&mut profile.user, &self.user),
            (&mut profile.operators_root, &self.operators_root),
            (&mut profile.client, &self.client),
        ];
        for (field, flag) in overrides {
            if let Some(value) = flag {
                *field = value.clone();
            }
        }
        Ok(profile)
    }
}
