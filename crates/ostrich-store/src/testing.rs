//! Shared fixtures for the store tests.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use ostrich_engine::{ArchiveEngine, EngineError, EngineResult, MemoryArchive, SnapshotStrategy};
use ostrich_types::{
    EncodedDelta, EncodedTriple, EncodedVersions, SearchPage, Term, Triple, TripleDelta,
    TriplePattern, Window,
};

use crate::options::OpenOptions;
use crate::store::OstrichStore;

/// Route store logs to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn lit(value: &str) -> Term {
    Term::typed_literal(value, "http://example.org/literal")
}

/// A triple of named nodes.
pub fn triple(s: &str, p: &str, o: &str) -> Triple {
    Triple::new(Term::named_node(s), Term::named_node(p), Term::named_node(o))
}

fn literal_triple(value: &str) -> Triple {
    Triple::new(Term::named_node("a"), Term::named_node("a"), lit(value))
}

/// Three versions with 8, 9 and 10 triples, 15 distinct overall.
pub fn fixture_versions() -> [Vec<TripleDelta>; 3] {
    use TripleDelta as D;
    [
        vec![
            D::addition(triple("a", "b", "z")),
            D::addition(literal_triple("a")),
            D::addition(triple("c", "c", "c")),
            D::addition(literal_triple("b")),
            D::addition(triple("a", "b", "a")),
            D::addition(triple("a", "b", "f")),
            D::addition(triple("a", "b", "c")),
            D::addition(triple("a", "b", "d")),
        ],
        vec![
            D::addition(triple("z", "z", "z")),
            D::deletion(literal_triple("b")),
            D::addition(literal_triple("z")),
            D::deletion(triple("a", "b", "a")),
            D::addition(triple("f", "f", "f")),
            D::addition(triple("a", "b", "g")),
            D::deletion(triple("a", "b", "z")),
        ],
        vec![
            D::deletion(literal_triple("z")),
            D::addition(triple("r", "r", "r")),
            D::deletion(triple("f", "f", "f")),
            D::addition(triple("q", "q", "q")),
            D::addition(triple("f", "r", "s")),
        ],
    ]
}

/// Append [`fixture_versions`] to `store` through the unsorted path.
pub async fn append_fixture(store: &OstrichStore) {
    init_tracing();
    let mut inserted = Vec::new();
    for batch in fixture_versions() {
        inserted.push(store.append(batch, None).await.unwrap());
    }
    assert_eq!(inserted, vec![8, 7, 5]);
}

pub async fn fixture_three_versions() -> OstrichStore {
    let store = OstrichStore::in_memory(OpenOptions::default());
    append_fixture(&store).await;
    store
}

/// Version 0 holds `a a a`, `a a b` and `a a c`.
pub async fn fixture_store() -> OstrichStore {
    init_tracing();
    let store = OstrichStore::in_memory(OpenOptions::default());
    let inserted = store
        .append(
            vec![
                TripleDelta::addition(triple("a", "a", "a")),
                TripleDelta::addition(triple("a", "a", "b")),
                TripleDelta::addition(triple("a", "a", "c")),
            ],
            None,
        )
        .await
        .unwrap();
    assert_eq!(inserted, 3);
    store
}

/// [`fixture_store`] plus a version 1 deleting two triples and adding two.
pub async fn fixture_two_versions() -> OstrichStore {
    let store = fixture_store().await;
    let inserted = store
        .append(
            vec![
                TripleDelta::deletion(triple("a", "a", "a")),
                TripleDelta::deletion(triple("a", "a", "b")),
                TripleDelta::addition(triple("a", "a", "d")),
                TripleDelta::addition(triple("a", "a", "e")),
            ],
            None,
        )
        .await
        .unwrap();
    assert_eq!(inserted, 4);
    store
}

/// Memory engine whose version queries block until released, and whose
/// shutdown can be made to fail.
pub struct GatedEngine {
    inner: MemoryArchive,
    gate: Semaphore,
    entered: AtomicUsize,
    closes: AtomicUsize,
    fail_close: bool,
}

impl GatedEngine {
    pub fn new(fail_close: bool) -> Self {
        Self {
            inner: MemoryArchive::new(SnapshotStrategy::Never),
            gate: Semaphore::new(0),
            entered: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            fail_close,
        }
    }

    /// Let `n` blocked version queries proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Version queries that reached the engine.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveEngine for GatedEngine {
    fn max_version(&self) -> Option<u32> {
        self.inner.max_version()
    }

    async fn search_version_materialized(
        &self,
        pattern: &TriplePattern,
        window: Window,
        version: Option<u32>,
    ) -> EngineResult<SearchPage<EncodedTriple>> {
        self.inner
            .search_version_materialized(pattern, window, version)
            .await
    }

    async fn search_delta_materialized(
        &self,
        pattern: &TriplePattern,
        window: Window,
        version_start: u32,
        version_end: u32,
    ) -> EngineResult<SearchPage<EncodedDelta>> {
        self.inner
            .search_delta_materialized(pattern, window, version_start, version_end)
            .await
    }

    async fn search_version(
        &self,
        pattern: &TriplePattern,
        window: Window,
    ) -> EngineResult<SearchPage<EncodedVersions>> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await.unwrap().forget();
        self.inner.search_version(pattern, window).await
    }

    async fn append_version(&self, version: u32, triples: &[EncodedDelta]) -> EngineResult<usize> {
        self.inner.append_version(version, triples).await
    }

    async fn close(&self, remove: bool) -> EngineResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(EngineError::Io(io::Error::other("device busy")));
        }
        self.inner.close(remove).await
    }
}
