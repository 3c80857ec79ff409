//! Atomic local writes.
//!
//! ## `atomic_write` protocol
//!
//! 1. Compare the content with what is on disk → skip if identical.
//! 2. Write to `<path>.diop.tmp`.
//! 3. Rename to the final path (atomic on POSIX).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use diop_core::ArtifactSet;

use crate::error::{io_err, SyncError};

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped: content matches what is on disk.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

/// Atomically write `content` to `path` unless it is already there.
pub(crate) fn atomic_write(
    path: &Path,
    content: &str,
    dry_run: bool,
) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.diop.tmp", path.display()));
    atomic_write_with_tmp(path, content, dry_run, &tmp)
}

fn atomic_write_with_tmp(
    path: &Path,
    content: &str,
    dry_run: bool,
    tmp: &Path,
) -> Result<WriteResult, SyncError> {
    match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Write every artifact into `dir`, in name order.
///
/// Not transactional: a failure leaves earlier files written.
pub fn persist_artifacts(
    dir: &Path,
    artifacts: &ArtifactSet,
    dry_run: bool,
) -> Result<Vec<WriteResult>, SyncError> {
    artifacts
        .iter()
        .map(|(name, content)| atomic_write(&dir.join(name), content, dry_run))
        .collect()
}
