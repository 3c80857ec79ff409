//! Download, preview and upload entrypoints used by the CLI.
//!
//! Callers log in on the [`RemoteRepository`] first; nothing here
//! authenticates.

use diop_core::{OperatorDescriptor, OperatorId};
use diop_renderer::{ArtifactAction, Generator};

use crate::diff::{diff_artifacts, FileDiff};
use crate::download::prepare_download;
use crate::reconcile::{execute_upload, prepare_upload, UploadPlan, UploadReport};
use crate::remote::{filter_housekeeping, RemoteLayout, RemoteRepository};
use crate::session::SyncSession;
use crate::workspace::Workspace;
use crate::writer::{persist_artifacts, WriteResult};
use crate::SyncError;

/// Flags for [`download`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Regenerate script and test even when they exist.
    pub overwrite: bool,
    /// Report what would be written without touching the disk.
    pub dry_run: bool,
}

/// Outcome of downloading one operator.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadReport {
    pub operator: OperatorId,
    pub actions: Vec<(String, ArtifactAction)>,
    pub writes: Vec<WriteResult>,
}

/// Fetch, parse, normalize and generate, leaving the result in memory.
fn fetch_and_generate<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    layout: &RemoteLayout,
    workspace: &Workspace,
    generator: &Generator,
    id: &OperatorId,
    overwrite: bool,
) -> Result<SyncSession, SyncError> {
    let artifacts = prepare_download(remote, layout, id)?;
    let session = SyncSession::new(id.clone())
        .with_artifacts(artifacts)
        .parsed()?
        .normalized()?
        .generated(generator, overwrite)?;
    Ok(keep_local_scaffolds(session, workspace, overwrite))
}

/// Without `overwrite`, a script or test the remote lacks is only created
/// when there is no local file of that name either.
fn keep_local_scaffolds(session: SyncSession, workspace: &Workspace, overwrite: bool) -> SyncSession {
    if overwrite {
        return session;
    }
    let dir = workspace.operator_dir(session.operator());
    let local: Vec<String> = session
        .actions()
        .iter()
        .filter(|(name, action)| *action == ArtifactAction::Created && dir.join(name).is_file())
        .map(|(name, _)| name.clone())
        .collect();
    local.into_iter().fold(session, |session, name| {
        tracing::info!("{name}: not on the remote, keeping the local copy");
        session.keeping_local(&name)
    })
}

/// Download an operator into `workspace` and scaffold its scripts.
pub fn download<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    layout: &RemoteLayout,
    workspace: &Workspace,
    generator: &Generator,
    id: &OperatorId,
    options: DownloadOptions,
) -> Result<DownloadReport, SyncError> {
    let session = fetch_and_generate(remote, layout, workspace, generator, id, options.overwrite)?;

    if !options.dry_run {
        workspace.ensure_operator_dirs(id)?;
    }
    let writes = persist_artifacts(
        &workspace.operator_dir(id),
        session.artifacts(),
        options.dry_run,
    )?;

    Ok(DownloadReport {
        operator: session.operator().clone(),
        actions: session.actions().to_vec(),
        writes,
    })
}

/// What [`download`] would change locally, as unified diffs.
pub fn preview<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    layout: &RemoteLayout,
    workspace: &Workspace,
    generator: &Generator,
    id: &OperatorId,
    overwrite: bool,
) -> Result<Vec<FileDiff>, SyncError> {
    let session = fetch_and_generate(remote, layout, workspace, generator, id, overwrite)?;
    diff_artifacts(&workspace.operator_dir(id), session.artifacts())
}

/// Build the upload plan for the local copy of `id`.
///
/// Lists the operators root and, only when the package exists there, the
/// package folder.
pub fn plan_upload<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    layout: &RemoteLayout,
    workspace: &Workspace,
    id: &OperatorId,
) -> Result<UploadPlan, SyncError> {
    let local = workspace.read_operator(id)?;
    let descriptor = OperatorDescriptor::from_artifacts(id.clone(), &local)?;

    let packages = filter_housekeeping(remote.list(layout.root())?);
    let operators = if packages.iter().any(|p| p == id.package()) {
        Some(filter_housekeeping(remote.list(&layout.package_dir(id))?))
    } else {
        None
    };

    prepare_upload(&local, descriptor, &packages, operators.as_deref(), layout)
}

/// Reconcile and upload the local copy of `id`.
pub fn upload<R: RemoteRepository + ?Sized>(
    remote: &mut R,
    layout: &RemoteLayout,
    workspace: &Workspace,
    id: &OperatorId,
) -> Result<UploadReport, SyncError> {
    let plan = plan_upload(remote, layout, workspace, id)?;
    execute_upload(remote, workspace, &plan)
}
