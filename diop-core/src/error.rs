//! Error types for diop-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing or rewriting an operator descriptor.
///
/// Every variant is a malformed-descriptor failure: the session must abort
/// before anything is written locally or remotely.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Operator identifiers are `package.operator` with exactly one dot.
    #[error("invalid operator identifier '{0}': expected <package>.<operator>")]
    InvalidOperatorId(String),

    /// One of the two descriptor documents is not valid JSON.
    #[error("{document} is not valid JSON: {source}")]
    Json {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// `operator.json` or `configSchema.json` is not in the artifact set.
    #[error("operator artifacts lack {name}")]
    MissingDocument { name: &'static str },

    /// A required field is absent.
    #[error("{document}: missing required field '{field}'")]
    MissingField {
        document: &'static str,
        field: String,
    },

    /// A field is present but has the wrong shape.
    #[error("{document}: field '{field}' {expected}")]
    InvalidField {
        document: &'static str,
        field: String,
        expected: &'static str,
    },

    /// Serializing a rewritten document failed.
    #[error("failed to serialize {document}: {source}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from loading or saving the connection profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending path.
    #[error("failed to parse profile at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No profile has been saved yet.
    #[error("no connection profile at {path}; run `diop profile set` first")]
    ProfileNotFound { path: PathBuf },
}
