use std::path::Path;

use serde::{Deserialize, Serialize};

use ostrich_engine::{ArchiveOptions, EngineError, SnapshotStrategy};
use ostrich_types::Window;

use crate::error::StoreResult;

/// Options for opening a store.
///
/// ```toml
/// read_only = false
///
/// [strategy]
/// name = "interval"
/// parameter = 4
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    #[serde(default)]
    pub read_only: bool,
    /// Snapshot strategy used when a new archive is created.
    #[serde(default)]
    pub strategy: SnapshotStrategy,
}

impl OpenOptions {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: SnapshotStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        toml::from_str(text).map_err(|e| EngineError::Options(e.to_string()).into())
    }

    /// Load options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Options(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

impl From<OpenOptions> for ArchiveOptions {
    fn from(options: OpenOptions) -> Self {
        ArchiveOptions {
            read_only: options.read_only,
            strategy: options.strategy,
        }
    }
}

/// Options for a version-materialized query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMaterializedQuery {
    #[serde(default)]
    pub offset: usize,
    /// `0` means no limit.
    #[serde(default)]
    pub limit: usize,
    /// `None` selects the latest version.
    #[serde(default)]
    pub version: Option<u32>,
}

impl VersionMaterializedQuery {
    pub fn at(version: u32) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }

    pub fn window(&self) -> Window {
        Window::new(self.offset, self.limit)
    }
}

/// Options for a delta-materialized query between two versions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaMaterializedQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
    pub version_start: u32,
    pub version_end: u32,
}

impl DeltaMaterializedQuery {
    pub fn between(version_start: u32, version_end: u32) -> Self {
        Self {
            offset: 0,
            limit: 0,
            version_start,
            version_end,
        }
    }

    pub fn window(&self) -> Window {
        Window::new(self.offset, self.limit)
    }
}

/// Options for a version query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
}

impl VersionQuery {
    pub fn window(&self) -> Window {
        Window::new(self.offset, self.limit)
    }
}
