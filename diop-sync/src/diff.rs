//! Unified diffs of generated artifacts against the local operator folder,
//! for `diop diff`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use diop_core::ArtifactSet;

use crate::error::{io_err, SyncError};

/// A single artifact diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Compare every artifact with the file of the same name in `dir`.
///
/// Missing local files diff against empty content; identical files are
/// omitted. No files are written.
pub fn diff_artifacts(dir: &Path, artifacts: &ArtifactSet) -> Result<Vec<FileDiff>, SyncError> {
    let mut diffs = Vec::new();
    for (name, rendered) in artifacts.iter() {
        let path = dir.join(name);
        let existing = read_existing_or_empty(&path)?;
        if existing == rendered {
            continue;
        }

        let old_header = format!("a/{name}");
        let new_header = format!("b/{name}");
        let unified = TextDiff::from_lines(existing.as_str(), rendered)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(FileDiff {
            path,
            unified_diff: unified,
        });
    }
    Ok(diffs)
}

fn read_existing_or_empty(path: &Path) -> Result<String, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}
