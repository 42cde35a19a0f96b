use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use ostrich_types::{
    EncodedDelta, EncodedTriple, EncodedVersions, SearchPage, TriplePattern, Window,
};

use crate::error::{EngineError, EngineResult};
use crate::index::VersionedIndex;
use crate::strategy::SnapshotStrategy;
use crate::traits::ArchiveEngine;

/// In-memory archive engine.
///
/// Intended for tests and embedding. The whole index lives behind a
/// `RwLock`; queries share the read side and appends take the write side.
pub struct MemoryArchive {
    index: RwLock<VersionedIndex>,
    closed: AtomicBool,
}

impl MemoryArchive {
    /// Create a new empty archive.
    pub fn new(strategy: SnapshotStrategy) -> Self {
        Self {
            index: RwLock::new(VersionedIndex::new(strategy)),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns `true` once `close` has completed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Versions holding a full snapshot.
    pub fn snapshot_versions(&self) -> Vec<u32> {
        self.read().snapshot_versions()
    }

    fn read(&self) -> RwLockReadGuard<'_, VersionedIndex> {
        self.index.read().expect("archive index lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, VersionedIndex> {
        self.index.write().expect("archive index lock poisoned")
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryArchive {
    fn default() -> Self {
        Self::new(SnapshotStrategy::default())
    }
}

#[async_trait]
impl ArchiveEngine for MemoryArchive {
    fn max_version(&self) -> Option<u32> {
        self.read().max_version()
    }

    async fn search_version_materialized(
        &self,
        pattern: &TriplePattern,
        window: Window,
        version: Option<u32>,
    ) -> EngineResult<SearchPage<EncodedTriple>> {
        self.ensure_open()?;
        self.read().search_version_materialized(pattern, window, version)
    }

    async fn search_delta_materialized(
        &self,
        pattern: &TriplePattern,
        window: Window,
        version_start: u32,
        version_end: u32,
    ) -> EngineResult<SearchPage<EncodedDelta>> {
        self.ensure_open()?;
        self.read()
            .search_delta_materialized(pattern, window, version_start, version_end)
    }

    async fn search_version(
        &self,
        pattern: &TriplePattern,
        window: Window,
    ) -> EngineResult<SearchPage<EncodedVersions>> {
        self.ensure_open()?;
        self.read().search_version(pattern, window)
    }

    async fn append_version(&self, version: u32, triples: &[EncodedDelta]) -> EngineResult<usize> {
        self.ensure_open()?;
        let inserted = self.write().append(version, triples)?;
        debug!(version, submitted = triples.len(), inserted, "memory archive append");
        Ok(inserted)
    }

    async fn close(&self, remove: bool) -> EngineResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if remove {
            self.write().clear();
        }
        debug!(remove, "memory archive closed");
        Ok(())
    }
}
