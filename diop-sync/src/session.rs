//! The state carried through one download.
//!
//! Each stage consumes the session and returns the next one:
//! fetch ([`SyncSession::with_artifacts`]) → [`parsed`](SyncSession::parsed)
//! → [`normalized`](SyncSession::normalized) →
//! [`generated`](SyncSession::generated). Persisting is left to the caller.

use diop_core::{normalize_script_ref, ArtifactSet, OperatorDescriptor, OperatorId};
use diop_renderer::{ArtifactAction, Generator};

use crate::SyncError;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncSession {
    operator: OperatorId,
    artifacts: ArtifactSet,
    descriptor: Option<OperatorDescriptor>,
    actions: Vec<(String, ArtifactAction)>,
}

impl SyncSession {
    pub fn new(operator: OperatorId) -> Self {
        Self {
            operator,
            artifacts: ArtifactSet::new(),
            descriptor: None,
            actions: Vec::new(),
        }
    }

    pub fn operator(&self) -> &OperatorId {
        &self.operator
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// `None` until [`parsed`](Self::parsed) ran.
    pub fn descriptor(&self) -> Option<&OperatorDescriptor> {
        self.descriptor.as_ref()
    }

    /// What [`generated`](Self::generated) did to the script and test files.
    pub fn actions(&self) -> &[(String, ArtifactAction)] {
        &self.actions
    }

    /// Replace the artifacts with freshly fetched ones; any previous
    /// descriptor is discarded.
    pub fn with_artifacts(self, artifacts: ArtifactSet) -> Self {
        Self {
            artifacts,
            descriptor: None,
            actions: Vec::new(),
            ..self
        }
    }

    pub fn parsed(self) -> Result<Self, SyncError> {
        let descriptor = OperatorDescriptor::from_artifacts(self.operator.clone(), &self.artifacts)?;
        Ok(Self {
            descriptor: Some(descriptor),
            ..self
        })
    }

    /// Externalize an inline script. Parses first when needed.
    pub fn normalized(self) -> Result<Self, SyncError> {
        let (descriptor, session) = self.take_descriptor()?;
        let (descriptor, artifacts) = normalize_script_ref(descriptor, session.artifacts)?;
        Ok(Self {
            artifacts,
            descriptor: Some(descriptor),
            ..session
        })
    }

    /// Render the script and test scaffolds. Runs the earlier stages first
    /// when they were skipped.
    pub fn generated(self, generator: &Generator, overwrite: bool) -> Result<Self, SyncError> {
        let (descriptor, session) = self.take_descriptor()?;
        let (descriptor, artifacts) = normalize_script_ref(descriptor, session.artifacts)?;
        let generation = generator.generate(&descriptor, &artifacts, overwrite)?;
        Ok(Self {
            artifacts: generation.artifacts,
            descriptor: Some(descriptor),
            actions: vec![generation.script, generation.test],
            ..session
        })
    }

    /// Drop the generated `name` so the local copy stays as it is; its
    /// action becomes [`ArtifactAction::Unchanged`].
    pub fn keeping_local(mut self, name: &str) -> Self {
        self.artifacts.remove(name);
        for (artifact, action) in &mut self.actions {
            if artifact == name {
                *action = ArtifactAction::Unchanged;
            }
        }
        self
    }

    fn take_descriptor(mut self) -> Result<(OperatorDescriptor, Self), SyncError> {
        let descriptor = match self.descriptor.take() {
            Some(d) => d,
            None => OperatorDescriptor::from_artifacts(self.operator.clone(), &self.artifacts)?,
        };
        Ok((descriptor, self))
    }
}
