use async_trait::async_trait;

use ostrich_types::{
    EncodedDelta, EncodedTriple, EncodedVersions, SearchPage, TriplePattern, Window,
};

use crate::error::EngineResult;

/// Boundary between the store handle and the storage engine that resolves
/// triple patterns against a versioned archive.
///
/// All implementations must satisfy these invariants:
/// - Result pages are in canonical SPO order.
/// - `total_count` never depends on the window.
/// - Version 0 accepts additions only.
/// - Append batches arrive in SPO order.
/// - After `close` resolves, every call fails with [`EngineError::Closed`].
///
/// [`EngineError::Closed`]: crate::EngineError::Closed
#[async_trait]
pub trait ArchiveEngine: Send + Sync {
    /// Highest stored version, `None` for an empty archive.
    fn max_version(&self) -> Option<u32>;

    /// Matches at one materialized version; `None` selects the latest.
    async fn search_version_materialized(
        &self,
        pattern: &TriplePattern,
        window: Window,
        version: Option<u32>,
    ) -> EngineResult<SearchPage<EncodedTriple>>;

    /// Net changes between two materialized versions.
    async fn search_delta_materialized(
        &self,
        pattern: &TriplePattern,
        window: Window,
        version_start: u32,
        version_end: u32,
    ) -> EngineResult<SearchPage<EncodedDelta>>;

    /// Matches across all versions, each with its version list.
    async fn search_version(
        &self,
        pattern: &TriplePattern,
        window: Window,
    ) -> EngineResult<SearchPage<EncodedVersions>>;

    /// Store `triples` as `version`. Returns the number of triples inserted.
    async fn append_version(&self, version: u32, triples: &[EncodedDelta]) -> EngineResult<usize>;

    /// Shut the engine down, deleting its data when `remove` is set.
    async fn close(&self, remove: bool) -> EngineResult<()>;
}
