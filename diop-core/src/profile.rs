//! Connection profile: the stored answers for reaching the remote repository.
//!
//! # Storage layout
//!
//! ```text
//! ~/.diop/
//!   profile.yaml   (mode 0600, written atomically)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! The password is never part of the profile.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Default root of the operator tree inside the remote repository.
pub const DEFAULT_OPERATORS_ROOT: &str = "/files/vflow/subengines/com/sap/python36/operators";

/// Default external repository client.
pub const DEFAULT_CLIENT: &str = "vctl";

/// Stored connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Base URL of the remote system.
    pub url: String,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    pub user: String,
    #[serde(default = "default_operators_root")]
    pub operators_root: String,
    /// Client program invoked for every repository call.
    #[serde(default = "default_client")]
    pub client: String,
    pub updated_at: DateTime<Utc>,
}

fn default_tenant() -> String {
    "default".to_owned()
}

fn default_operators_root() -> String {
    DEFAULT_OPERATORS_ROOT.to_owned()
}

fn default_client() -> String {
    DEFAULT_CLIENT.to_owned()
}

impl ConnectionProfile {
    /// A profile with default tenant, operators root and client.
    pub fn new(url: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tenant: default_tenant(),
            user: user.into(),
            operators_root: default_operators_root(),
            client: default_client(),
            updated_at: Utc::now(),
        }
    }

    /// Stamp `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.diop/profile.yaml`: pure, no I/O.
pub fn profile_path_at(home: &Path) -> PathBuf {
    home.join(".diop").join("profile.yaml")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load the profile. `ProfileNotFound` if it was never saved.
pub fn load_at(home: &Path) -> Result<ConnectionProfile, ProfileError> {
    let path = profile_path_at(home);
    if !path.exists() {
        return Err(ProfileError::ProfileNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ProfileError::Parse { path, source: e })
}

/// Load the profile if one exists.
pub fn load_optional_at(home: &Path) -> Result<Option<ConnectionProfile>, ProfileError> {
    match load_at(home) {
        Ok(profile) => Ok(Some(profile)),
        Err(ProfileError::ProfileNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// `load_optional_at` convenience wrapper.
pub fn load_optional() -> Result<Option<ConnectionProfile>, ProfileError> {
    load_optional_at(&home()?)
}

/// Atomically save the profile: `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, profile: &ConnectionProfile) -> Result<(), ProfileError> {
    let path = profile_path_at(home);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_file_name("profile.yaml.tmp");

    let yaml = serde_yaml::to_string(profile)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    tracing::debug!("saved profile to {}", path.display());
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(profile: &ConnectionProfile) -> Result<(), ProfileError> {
    save_at(&home()?, profile)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ProfileError> {
    dirs::home_dir().ok_or(ProfileError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ProfileError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ProfileError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ProfileError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ProfileError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
