//! Error types for diop-sync.

use std::path::PathBuf;

use thiserror::Error;

use diop_core::DescriptorError;
use diop_renderer::RenderError;

/// All errors that can arise from download and upload operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The operator metadata could not be interpreted.
    #[error("malformed descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    /// An error from the generator engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The repository client failed or exited non-zero.
    #[error("`{command}` failed: {detail}")]
    Transport { command: String, detail: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file named by the descriptor is not among the operator's files.
    #[error("artifact '{name}' referenced by operator.json is missing")]
    MissingArtifact { name: String },

    /// A remote listing entry that is not a plain file name.
    #[error("refusing to download '{name}': not a plain file name")]
    UnsafeFileName { name: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
