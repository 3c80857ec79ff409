//! diop core library: operator descriptors, artifact sets, connection profile.
//!
//! - [`types`]: operator identifiers, ports, config parameters
//! - [`descriptor`]: parse / normalize / rename of operator metadata
//! - [`artifact`]: [`ArtifactSet`]
//! - [`bootstrap`]: the mock-API header shared by download and upload
//! - [`profile`]: stored connection parameters
//! - [`error`]: [`DescriptorError`], [`ProfileError`]

pub mod artifact;
pub mod bootstrap;
pub mod descriptor;
pub mod error;
pub mod profile;
pub mod types;

pub use artifact::ArtifactSet;
pub use descriptor::{normalize_script_ref, rename_for_target, JsonIndent, OperatorDescriptor};
pub use error::{DescriptorError, ProfileError};
pub use profile::ConnectionProfile;
pub use types::{
    ConfigParam, OperatorId, ParamType, Port, PortDirection, PortKind, ScriptRef,
};
