use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::strategy::SnapshotStrategy;

/// File name of the manifest inside an archive directory.
pub const MANIFEST_FILE: &str = "archive.toml";

/// Current archive directory layout version.
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

/// Options for opening an archive engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveOptions {
    /// Reject appends and never create anything on disk.
    #[serde(default)]
    pub read_only: bool,
    /// Snapshot strategy for a newly created archive.
    #[serde(default)]
    pub strategy: SnapshotStrategy,
}

/// Contents of `archive.toml`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub format_version: u32,
    pub strategy: SnapshotStrategy,
}

impl ArchiveManifest {
    pub fn new(strategy: SnapshotStrategy) -> Self {
        Self {
            format_version: ARCHIVE_FORMAT_VERSION,
            strategy,
        }
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path)?;
        let manifest: Self = toml::from_str(&text).map_err(|e| EngineError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if manifest.format_version != ARCHIVE_FORMAT_VERSION {
            return Err(EngineError::Manifest {
                path: path.to_path_buf(),
                reason: format!("unsupported format version {}", manifest.format_version),
            });
        }
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> EngineResult<()> {
        let text =
            toml::to_string(self).map_err(|e| EngineError::Serialization(e.to_string()))?;
        fs::write(path, text)?;
        Ok(())
    }
}
