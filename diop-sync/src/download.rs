//! Fetch an operator's files from the remote repository.

use diop_core::{ArtifactSet, OperatorId};

use crate::remote::{filter_housekeeping, RemoteLayout, RemoteRepository};
use crate::SyncError;

/// List the operator folder and read every file in it.
///
/// Housekeeping entries (`.git`, `LICENSE`, ...) are skipped. An empty or
/// missing folder yields an empty set; parsing reports the missing metadata.
/// Any entry that could escape the operator folder once written locally
/// aborts the download before the first read.
pub fn prepare_download<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    layout: &RemoteLayout,
    id: &OperatorId,
) -> Result<ArtifactSet, SyncError> {
    let dir = layout.operator_dir(id);
    let entries = filter_housekeeping(remote.list(&dir)?);
    tracing::info!("{id}: {} file(s) in {dir}", entries.len());
    if let Some(name) = entries.iter().find(|e| !is_plain_file_name(e)) {
        return Err(SyncError::UnsafeFileName { name: name.clone() });
    }

    let mut artifacts = ArtifactSet::new();
    for name in entries {
        let path = layout.file(id, &name);
        tracing::info!("download {path}");
        let content = remote.read(&path)?;
        artifacts.insert(name, content);
    }
    Ok(artifacts)
}

/// A single path component: no separators, not `.` or `..`.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
