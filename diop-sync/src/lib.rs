//! # diop-sync
//!
//! Moves operators between the remote repository and the local workspace.
//!
//! [`download`] fetches an operator, externalizes its script and scaffolds
//! the script and test files; [`upload`] reconciles the local copy with the
//! remote tree and writes it back. Remote access goes through
//! [`RemoteRepository`].

pub mod diff;
pub mod download;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod workspace;
pub mod writer;

pub use diff::FileDiff;
pub use error::SyncError;
pub use pipeline::{download, plan_upload, preview, upload, DownloadOptions, DownloadReport};
pub use reconcile::{UploadFile, UploadPlan, UploadReport};
pub use remote::{Credentials, RemoteLayout, RemoteRepository, VctlClient};
pub use session::SyncSession;
pub use workspace::Workspace;
pub use writer::WriteResult;
