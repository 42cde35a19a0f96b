use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use ostrich_engine::{ArchiveEngine, ArchiveOptions, DiskArchive, MemoryArchive};

use crate::error::{StoreError, StoreResult};
use crate::features::Features;
use crate::lifecycle::Lifecycle;
use crate::options::{OpenOptions, VersionMaterializedQuery, VersionQuery};

/// Handle to one open OSTRICH archive.
///
/// Queries live in [`crate::query`], appends in [`crate::append`]. The
/// engine is owned by exactly one handle and is shut down through
/// [`OstrichStore::close`] once every admitted operation has finished.
pub struct OstrichStore {
    pub(crate) engine: Arc<dyn ArchiveEngine>,
    read_only: bool,
    features: Features,
    /// Highest appended version, `-1` when empty.
    max_version: AtomicI64,
    pub(crate) lifecycle: Lifecycle,
}

/// Summary of a store's contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub max_version: Option<u32>,
    /// Triples present in at least one version.
    pub unique_triples: usize,
    /// Triples present in the latest version.
    pub latest_triples: usize,
}

impl OstrichStore {
    /// Open (or create, when writable) the archive directory at `path`.
    pub async fn open(path: impl AsRef<Path>, options: OpenOptions) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let archive_options = ArchiveOptions::from(options);
        let archive = tokio::task::spawn_blocking(move || DiskArchive::open(path, &archive_options))
            .await
            .map_err(|e| StoreError::Engine(e.to_string()))??;
        info!(
            path = %archive.path().display(),
            read_only = options.read_only,
            "store opened"
        );
        Ok(Self::from_engine(Arc::new(archive), options.read_only))
    }

    /// A store backed by a fresh in-memory archive.
    pub fn in_memory(options: OpenOptions) -> Self {
        let engine = Arc::new(MemoryArchive::new(options.strategy));
        Self::from_engine(engine, options.read_only)
    }

    /// Wrap an engine. The store takes over the engine's lifetime.
    pub fn from_engine(engine: Arc<dyn ArchiveEngine>, read_only: bool) -> Self {
        let max_version = engine.max_version().map_or(-1, i64::from);
        Self {
            engine,
            read_only,
            features: Features::for_mode(read_only),
            max_version: AtomicI64::new(max_version),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Highest appended version, `None` before the first append.
    pub fn max_version(&self) -> Option<u32> {
        u32::try_from(self.max_version.load(Ordering::Acquire)).ok()
    }

    pub(crate) fn record_version(&self, version: u32) {
        self.max_version.fetch_max(i64::from(version), Ordering::AcqRel);
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Number of admitted operations that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.lifecycle.in_flight()
    }

    /// Close the store once all admitted operations have finished.
    ///
    /// Concurrent calls share one engine shutdown. With `remove` set the
    /// engine deletes the archive's data.
    pub async fn close(&self, remove: bool) -> StoreResult<()> {
        self.lifecycle
            .close(|| async {
                self.engine.close(remove).await?;
                info!(remove, max_version = ?self.max_version(), "store closed");
                Ok::<_, StoreError>(())
            })
            .await
    }

    /// Version and triple counts of the store. An empty store reports zeros.
    pub async fn metadata(&self) -> StoreResult<StoreMetadata> {
        let unique = match self
            .count_version(None, None, None, VersionQuery::default())
            .await
        {
            Ok(count) => count.total_count,
            Err(StoreError::Empty) => {
                return Ok(StoreMetadata {
                    max_version: None,
                    unique_triples: 0,
                    latest_triples: 0,
                })
            }
            Err(error) => return Err(error),
        };
        let latest = self
            .count_version_materialized(None, None, None, VersionMaterializedQuery::default())
            .await?;
        Ok(StoreMetadata {
            max_version: self.max_version(),
            unique_triples: unique,
            latest_triples: latest.total_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Access, ErrorKind};
    use crate::testing::{append_fixture, fixture_store, fixture_three_versions, GatedEngine};

    #[tokio::test]
    async fn new_store_is_empty_and_open() {
        let store = OstrichStore::in_memory(OpenOptions::default());
        assert_eq!(store.max_version(), None);
        assert!(!store.is_closed());
        assert!(!store.is_read_only());
        assert_eq!(store.in_flight(), 0);
        assert!(store.features().append);
    }

    #[tokio::test]
    async fn read_only_store_has_no_append_feature() {
        let store = OstrichStore::in_memory(OpenOptions::read_only());
        assert!(store.is_read_only());
        assert!(!store.features().append);
        assert!(store.features().count_version);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let store = fixture_store().await;
        store.close(false).await.unwrap();
        assert!(store.is_closed());
        store.close(false).await.unwrap();

        let error = store
            .search_version(None, None, None, VersionQuery::default())
            .await
            .unwrap_err();
        assert_eq!(error, StoreError::Closed(Access::Query));
        assert_eq!(error.kind(), ErrorKind::ClosedStore);
    }

    #[tokio::test]
    async fn metadata_summarizes_fixture() {
        let store = fixture_three_versions().await;
        let metadata = store.metadata().await.unwrap();
        assert_eq!(metadata.max_version, Some(2));
        assert_eq!(metadata.unique_triples, 15);
        assert_eq!(metadata.latest_triples, 10);
    }

    #[tokio::test]
    async fn metadata_of_empty_store() {
        let store = OstrichStore::in_memory(OpenOptions::default());
        let metadata = store.metadata().await.unwrap();
        assert_eq!(metadata.max_version, None);
        assert_eq!(metadata.unique_triples, 0);
    }

    #[tokio::test]
    async fn disk_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive");
        {
            let store = OstrichStore::open(&path, OpenOptions::default()).await.unwrap();
            append_fixture(&store).await;
            store.close(false).await.unwrap();
        }

        let store = OstrichStore::open(&path, OpenOptions::read_only()).await.unwrap();
        assert_eq!(store.max_version(), Some(2));
        let count = store
            .count_version_materialized(None, None, None, VersionMaterializedQuery::at(1))
            .await
            .unwrap();
        assert_eq!(count.total_count, 9);

        store.close(false).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn close_with_remove_deletes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive");
        let store = OstrichStore::open(&path, OpenOptions::default()).await.unwrap();
        append_fixture(&store).await;
        store.close(true).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_remove_leaves_store_usable_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive");
        let store = OstrichStore::open(&path, OpenOptions::default()).await.unwrap();
        append_fixture(&store).await;

        std::fs::remove_dir_all(&path).unwrap();
        let error = store.close(true).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Engine);
        assert!(!store.is_closed());
        let count = store
            .count_version(None, None, None, VersionQuery::default())
            .await
            .unwrap();
        assert_eq!(count.total_count, 15);

        std::fs::create_dir_all(&path).unwrap();
        store.close(true).await.unwrap();
        assert!(store.is_closed());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn open_rejects_non_archive_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        let error = OstrichStore::open(dir.path(), OpenOptions::default())
            .await
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::Engine);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn close_drains_in_flight_queries() {
        let engine = Arc::new(GatedEngine::new(false));
        let store = Arc::new(OstrichStore::from_engine(engine.clone(), false));
        append_fixture(&store).await;

        let queries: Vec<_> = (0..3)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .search_version(None, None, None, VersionQuery::default())
                        .await
                })
            })
            .collect();
        while engine.entered() < 3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.in_flight(), 3);

        let closer = {
            let store = store.clone();
            tokio::spawn(async move { store.close(false).await })
        };
        while !store.lifecycle.is_closing() {
            tokio::task::yield_now().await;
        }
        let late = store
            .search_version_materialized(None, None, None, VersionMaterializedQuery::default())
            .await
            .unwrap_err();
        assert_eq!(late, StoreError::Closed(Access::Query));
        assert_eq!(engine.closes(), 0);
        assert!(!store.is_closed());

        engine.release(3);
        for query in queries {
            assert_eq!(query.await.unwrap().unwrap().total_count, 15);
        }
        closer.await.unwrap().unwrap();
        assert_eq!(engine.closes(), 1);
        assert!(store.is_closed());
        assert_eq!(store.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_shutdown_is_shared_and_retried() {
        let engine = Arc::new(GatedEngine::new(true));
        let store = Arc::new(OstrichStore::from_engine(engine.clone(), false));
        append_fixture(&store).await;

        let query = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .count_version(None, None, None, VersionQuery::default())
                    .await
            })
        };
        while engine.entered() < 1 {
            tokio::task::yield_now().await;
        }

        let (first, second, ()) = tokio::join!(store.close(false), store.close(false), async {
            engine.release(1);
        });
        assert_eq!(query.await.unwrap().unwrap().total_count, 15);
        let expected = StoreError::Engine("I/O error: device busy".into());
        assert_eq!(first, Err(expected.clone()));
        assert_eq!(second, Err(expected.clone()));
        assert_eq!(engine.closes(), 1);

        // The store stays usable and a later close tries again.
        assert!(!store.is_closed());
        let count = store
            .count_version_materialized(None, None, None, VersionMaterializedQuery::default())
            .await
            .unwrap();
        assert_eq!(count.total_count, 10);
        assert_eq!(store.close(false).await, Err(expected));
        assert_eq!(engine.closes(), 2);
    }
}
