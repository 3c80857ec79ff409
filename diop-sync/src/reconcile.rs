//! Upload reconciliation.
//!
//! [`prepare_upload`] decides, from the local files and the remote
//! listings, which folders to create, whether the metadata documents need a
//! rename, and what to write where. [`execute_upload`] carries the plan out.

use std::path::{Path, PathBuf};

use diop_core::bootstrap::strip_header;
use diop_core::descriptor::{CONFIG_SCHEMA_JSON, OPERATOR_JSON};
use diop_core::{rename_for_target, ArtifactSet, JsonIndent, OperatorDescriptor, OperatorId};

use crate::error::SyncError;
use crate::remote::{RemoteLayout, RemoteRepository};
use crate::workspace::{is_cache_artifact, Workspace};
use crate::writer::atomic_write;

/// Prefix of the local file holding the header-free script during upload.
pub const STAGED_PREFIX: &str = "tmp_";

/// Local name of the staged copy of `script`.
pub fn staged_name(script: &str) -> String {
    format!("{STAGED_PREFIX}{script}")
}

/// One file to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub remote_path: String,
    pub content: String,
    /// Sent from a staged copy instead of the local file itself.
    pub staged: bool,
}

/// Everything an upload will do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub operator: OperatorId,
    pub folders_to_create: Vec<String>,
    /// Metadata documents rewritten for the target; written back locally
    /// before upload.
    pub renamed_files: Vec<String>,
    pub files_to_write: Vec<UploadFile>,
}

impl UploadPlan {
    pub fn file(&self, name: &str) -> Option<&UploadFile> {
        self.files_to_write.iter().find(|f| f.name == name)
    }
}

/// Build the upload plan for the operator described by `descriptor`.
///
/// `operator_listing` is the listing of the package folder; pass `None` when
/// the package is missing from `package_listing`, in which case it is never
/// consulted.
pub fn prepare_upload(
    local: &ArtifactSet,
    descriptor: OperatorDescriptor,
    package_listing: &[String],
    operator_listing: Option<&[String]>,
    layout: &RemoteLayout,
) -> Result<UploadPlan, SyncError> {
    let id = descriptor.id().clone();

    let script = match descriptor.script_file() {
        Some(name) => {
            let content = local.get(name).ok_or_else(|| SyncError::MissingArtifact {
                name: name.to_owned(),
            })?;
            Some((name.to_owned(), strip_header(content)))
        }
        None => None,
    };

    let mut folders_to_create = Vec::new();
    let package_exists = package_listing.iter().any(|e| e == id.package());
    let operator_exists = package_exists
        && operator_listing
            .unwrap_or_default()
            .iter()
            .any(|e| e == id.operator());
    if !package_exists {
        tracing::info!("package {} not found remotely", id.package());
        folders_to_create.push(layout.package_dir(&id));
    }
    if !operator_exists {
        tracing::info!("operator {id} not found remotely");
        folders_to_create.push(layout.operator_dir(&id));
    }

    let renamed = if operator_exists {
        Vec::new()
    } else {
        let d = rename_for_target(descriptor, &id);
        vec![
            (OPERATOR_JSON.to_owned(), d.operator_json(JsonIndent::Four)?),
            (CONFIG_SCHEMA_JSON.to_owned(), d.config_schema_json(JsonIndent::Four)?),
        ]
    };

    let staged = script.as_ref().map(|(name, _)| staged_name(name));
    let mut files_to_write = Vec::new();
    for (name, content) in local.iter() {
        if is_cache_artifact(name) || staged.as_deref() == Some(name) {
            continue;
        }
        let (content, is_staged) = match (&script, renamed.iter().find(|(n, _)| n == name)) {
            (Some((script_name, stripped)), _) if script_name == name => (stripped.clone(), true),
            (_, Some((_, rewritten))) => (rewritten.clone(), false),
            _ => (content.to_owned(), false),
        };
        files_to_write.push(UploadFile {
            name: name.to_owned(),
            remote_path: layout.file(&id, name),
            content,
            staged: is_staged,
        });
    }

    Ok(UploadPlan {
        operator: id,
        folders_to_create,
        renamed_files: renamed.into_iter().map(|(name, _)| name).collect(),
        files_to_write,
    })
}

/// What [`execute_upload`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub created_folders: Vec<String>,
    pub rewritten_locally: Vec<PathBuf>,
    /// `(local source, remote path)` per written file.
    pub written: Vec<(PathBuf, String)>,
}

/// Carry out `plan`: create folders, write the renamed documents back to the
/// local operator folder, stage the script, then write every file.
///
/// The first failure aborts the remaining steps. The staged script is
/// removed whether or not the writes succeeded.
pub fn execute_upload<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    workspace: &Workspace,
    plan: &UploadPlan,
) -> Result<UploadReport, SyncError> {
    let dir = workspace.operator_dir(&plan.operator);
    let mut report = UploadReport::default();

    for folder in &plan.folders_to_create {
        tracing::info!("create {folder}");
        remote.make_directory(folder)?;
        report.created_folders.push(folder.clone());
    }

    for name in &plan.renamed_files {
        let file = plan.file(name).ok_or_else(|| SyncError::MissingArtifact {
            name: name.clone(),
        })?;
        let path = dir.join(name);
        atomic_write(&path, &file.content, false)?;
        report.rewritten_locally.push(path);
    }

    let mut staged = Vec::new();
    let result = stage_and_write(remote, &dir, plan, &mut staged, &mut report);
    for path in staged {
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("could not remove {}: {e}", path.display());
        }
    }
    result.map(|()| report)
}

fn stage_and_write<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    dir: &Path,
    plan: &UploadPlan,
    staged: &mut Vec<PathBuf>,
    report: &mut UploadReport,
) -> Result<(), SyncError> {
    for file in plan.files_to_write.iter().filter(|f| f.staged) {
        let path = dir.join(staged_name(&file.name));
        staged.push(path.clone());
        atomic_write(&path, &file.content, false)?;
    }

    for file in &plan.files_to_write {
        let source = if file.staged {
            dir.join(staged_name(&file.name))
        } else {
            dir.join(&file.name)
        };
        tracing::info!("upload {} -> {}", source.display(), file.remote_path);
        remote.write(&source, &file.remote_path)?;
        report.written.push((source, file.remote_path.clone()));
    }
    Ok(())
}
