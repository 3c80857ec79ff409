//! Local project layout.
//!
//! ```text
//! <root>/
//!   operators/<package>/<operator>/   operator files
//!   testdata/<package>/<operator>/    fixtures read by operator_test.py
//!   utils/                            mock_di_api.py, operator_test.py
//! ```

use std::path::{Path, PathBuf};

use diop_core::{ArtifactSet, OperatorId};

use crate::error::{io_err, SyncError};
use crate::writer::{atomic_write, WriteResult};

pub const OPERATORS_DIR: &str = "operators";
pub const TESTDATA_DIR: &str = "testdata";
pub const UTILS_DIR: &str = "utils";

/// Support modules imported by downloaded and generated scripts.
pub const SUPPORT_MODULES: &[(&str, &str)] = &[
    ("mock_di_api.py", include_str!("assets/mock_di_api.py")),
    ("operator_test.py", include_str!("assets/operator_test.py")),
    ("__init__.py", ""),
];

/// Local files that never belong to an operator.
const CACHE_DIRS: [&str; 2] = ["__pycache__", ".ipynb_checkpoints"];
const CACHE_FILES: [&str; 1] = [".DS_Store"];

/// Interpreter caches and editor droppings.
pub fn is_cache_artifact(name: &str) -> bool {
    CACHE_DIRS.contains(&name) || CACHE_FILES.contains(&name) || name.ends_with(".pyc")
}

/// A project root on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn operator_dir(&self, id: &OperatorId) -> PathBuf {
        self.root
            .join(OPERATORS_DIR)
            .join(id.package())
            .join(id.operator())
    }

    pub fn testdata_dir(&self, id: &OperatorId) -> PathBuf {
        self.root
            .join(TESTDATA_DIR)
            .join(id.package())
            .join(id.operator())
    }

    pub fn utils_dir(&self) -> PathBuf {
        self.root.join(UTILS_DIR)
    }

    /// Create the three top-level folders and (re)write the support modules.
    pub fn init(&self, dry_run: bool) -> Result<Vec<WriteResult>, SyncError> {
        if !dry_run {
            for dir in [OPERATORS_DIR, TESTDATA_DIR, UTILS_DIR] {
                let path = self.root.join(dir);
                std::fs::create_dir_all(&path).map_err(|e| io_err(&path, e))?;
            }
        }
        let utils = self.utils_dir();
        SUPPORT_MODULES
            .iter()
            .map(|(name, content)| atomic_write(&utils.join(name), content, dry_run))
            .collect()
    }

    /// Create the operator and fixture folders of `id`.
    pub fn ensure_operator_dirs(&self, id: &OperatorId) -> Result<(), SyncError> {
        for dir in [self.operator_dir(id), self.testdata_dir(id)] {
            std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        Ok(())
    }

    /// Read the regular files of the operator folder of `id`.
    ///
    /// Subdirectories and cache artifacts are skipped. Content that is not
    /// UTF-8 is decoded lossily; uploads send such files from disk unchanged.
    pub fn read_operator(&self, id: &OperatorId) -> Result<ArtifactSet, SyncError> {
        let dir = self.operator_dir(id);
        let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;

        let mut artifacts = ArtifactSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_cache_artifact(&name) {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
            if !file_type.is_file() {
                tracing::debug!("skipping non-file entry {}", path.display());
                continue;
            }
            let bytes = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
            artifacts.insert(name, String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(artifacts)
    }
}
