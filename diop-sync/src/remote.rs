//! Remote operator repository access.
//!
//! [`RemoteRepository`] is the seam between the sync pipelines and the
//! platform. [`VctlClient`] drives the `vctl` command line client; tests
//! substitute an in-memory implementation.

use std::path::Path;
use std::process::Command;

use diop_core::profile::DEFAULT_OPERATORS_ROOT;
use diop_core::OperatorId;

use crate::SyncError;

/// Directory entries that belong to version control or documentation, never
/// to the operator itself.
pub const HOUSEKEEPING: [&str; 4] = [".git", ".gitignore", "LICENSE", "README.md"];

/// Login parameters for one session. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub url: String,
    pub tenant: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("tenant", &self.tenant)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Blocking access to the user workspace of the remote repository.
pub trait RemoteRepository {
    fn login(&mut self, credentials: &Credentials) -> Result<(), SyncError>;

    /// Entry names of a remote directory, trimmed, without empty lines.
    fn list(&mut self, remote_path: &str) -> Result<Vec<String>, SyncError>;

    fn read(&mut self, remote_file: &str) -> Result<String, SyncError>;

    /// Upload the local file at `local_file` to `remote_file`.
    fn write(&mut self, local_file: &Path, remote_file: &str) -> Result<(), SyncError>;

    fn make_directory(&mut self, remote_path: &str) -> Result<(), SyncError>;
}

/// Drop housekeeping entries from a directory listing.
pub fn filter_housekeeping(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|e| !HOUSEKEEPING.contains(&e.as_str()))
        .collect()
}

// ---------------------------------------------------------------------------
// Remote layout
// ---------------------------------------------------------------------------

/// `<root>/<package>/<operator>/<file>` path arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    root: String,
}

impl RemoteLayout {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let trimmed = root.trim_end_matches('/');
        Self {
            root: if trimmed.is_empty() {
                "/".to_owned()
            } else {
                trimmed.to_owned()
            },
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn package_dir(&self, id: &OperatorId) -> String {
        self.join(id.package())
    }

    pub fn operator_dir(&self, id: &OperatorId) -> String {
        self.join(&id.dir())
    }

    pub fn file(&self, id: &OperatorId, name: &str) -> String {
        format!("{}/{name}", self.operator_dir(id))
    }

    fn join(&self, rest: &str) -> String {
        if self.root == "/" {
            format!("/{rest}")
        } else {
            format!("{}/{rest}", self.root)
        }
    }
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self::new(DEFAULT_OPERATORS_ROOT)
    }
}

// ---------------------------------------------------------------------------
// vctl
// ---------------------------------------------------------------------------

/// [`RemoteRepository`] backed by the `vctl` executable.
#[derive(Debug, Clone)]
pub struct VctlClient {
    program: String,
}

impl VctlClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the client and return its stdout. `shown` replaces `args` in
    /// logs and error messages.
    fn run(&self, args: &[&str], shown: Option<&[&str]>) -> Result<String, SyncError> {
        let command = format!("{} {}", self.program, shown.unwrap_or(args).join(" "));
        tracing::debug!("$ {command}");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| SyncError::Transport {
                command: command.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() {
                stdout
            } else {
                stderr
            };
            return Err(SyncError::Transport {
                command,
                detail: format!("{} ({})", message.trim(), output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl RemoteRepository for VctlClient {
    fn login(&mut self, credentials: &Credentials) -> Result<(), SyncError> {
        let c = credentials;
        let (url, tenant, user) = (c.url.as_str(), c.tenant.as_str(), c.user.as_str());
        let shown = ["login", url, tenant, user, "-p", "***"];
        self.run(
            &["login", url, tenant, user, "-p", c.password.as_str()],
            Some(shown.as_slice()),
        )?;
        tracing::info!("logged in to {url} as {tenant}/{user}");
        Ok(())
    }

    fn list(&mut self, remote_path: &str) -> Result<Vec<String>, SyncError> {
        let out = self.run(&["vrep", "user", "ls", remote_path], None)?;
        Ok(parse_listing(&out))
    }

    fn read(&mut self, remote_file: &str) -> Result<String, SyncError> {
        self.run(&["vrep", "user", "cat", remote_file], None)
    }

    fn write(&mut self, local_file: &Path, remote_file: &str) -> Result<(), SyncError> {
        let local = local_file.to_string_lossy();
        self.run(&["vrep", "user", "put", local.as_ref(), remote_file], None)?;
        Ok(())
    }

    fn make_directory(&mut self, remote_path: &str) -> Result<(), SyncError> {
        self.run(&["vrep", "user", "mkdir", remote_path], None)?;
        Ok(())
    }
}

/// One entry per non-empty line; a trailing `/` marking directories is
/// dropped so entries compare equal to bare names.
fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|l| l.trim().trim_end_matches('/'))
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}
