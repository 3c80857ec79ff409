//! In-memory remote repository shared by the sync integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use diop_sync::{Credentials, RemoteRepository, SyncError};

pub const ROOT: &str = "/ops";

/// One recorded repository call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login(String),
    List(String),
    Read(String),
    Write(String),
    MakeDirectory(String),
}

#[derive(Debug, Default)]
pub struct FakeRepository {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, String>,
    pub calls: Vec<Call>,
    /// Remote path whose write fails.
    pub fail_write: Option<String>,
    /// Raw entries appended to every listing.
    pub extra_entries: Vec<String>,
}

impl FakeRepository {
    pub fn new() -> Self {
        let mut repo = Self::default();
        repo.dirs.insert(ROOT.to_owned());
        repo
    }

    /// Add a file, creating its parent folders.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        let mut parent = Path::new(path).parent();
        while let Some(dir) = parent {
            let dir_str = dir.to_string_lossy();
            if dir_str == "/" || dir_str.is_empty() {
                break;
            }
            self.dirs.insert(dir_str.into_owned());
            parent = dir.parent();
        }
        self.files.insert(path.to_owned(), content.to_owned());
        self
    }

    pub fn writes(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Write(p) => Some(p.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn mkdirs(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::MakeDirectory(p) => Some(p.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn children<'a>(
    path: &'a str,
    names: impl Iterator<Item = &'a String> + 'a,
) -> impl Iterator<Item = String> + 'a {
    let prefix = format!("{}/", path.trim_end_matches('/'));
    names.filter_map(move |p| {
        let rest = p.strip_prefix(&prefix)?;
        (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_owned())
    })
}

impl RemoteRepository for FakeRepository {
    fn login(&mut self, credentials: &Credentials) -> Result<(), SyncError> {
        self.calls.push(Call::Login(credentials.user.clone()));
        Ok(())
    }

    fn list(&mut self, remote_path: &str) -> Result<Vec<String>, SyncError> {
        self.calls.push(Call::List(remote_path.to_owned()));
        let mut entries: BTreeSet<String> = children(remote_path, self.dirs.iter()).collect();
        entries.extend(children(remote_path, self.files.keys()));
        entries.extend(self.extra_entries.iter().cloned());
        Ok(entries.into_iter().collect())
    }

    fn read(&mut self, remote_file: &str) -> Result<String, SyncError> {
        self.calls.push(Call::Read(remote_file.to_owned()));
        self.files
            .get(remote_file)
            .cloned()
            .ok_or_else(|| SyncError::Transport {
                command: format!("vctl vrep user cat {remote_file}"),
                detail: "no such file".to_owned(),
            })
    }

    fn write(&mut self, local_file: &Path, remote_file: &str) -> Result<(), SyncError> {
        self.calls.push(Call::Write(remote_file.to_owned()));
        if self.fail_write.as_deref() == Some(remote_file) {
            return Err(SyncError::Transport {
                command: format!("vctl vrep user put {} {remote_file}", local_file.display()),
                detail: "connection reset".to_owned(),
            });
        }
        let content = std::fs::read_to_string(local_file).map_err(|e| SyncError::Transport {
            command: format!("vctl vrep user put {} {remote_file}", local_file.display()),
            detail: e.to_string(),
        })?;
        self.files.insert(remote_file.to_owned(), content);
        Ok(())
    }

    fn make_directory(&mut self, remote_path: &str) -> Result<(), SyncError> {
        self.calls.push(Call::MakeDirectory(remote_path.to_owned()));
        self.dirs.insert(remote_path.to_owned());
        Ok(())
    }
}
