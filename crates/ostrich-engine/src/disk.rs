use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ostrich_types::{
    EncodedDelta, EncodedTriple, EncodedVersions, SearchPage, TriplePattern, Window,
};

use crate::config::{ArchiveManifest, ArchiveOptions, MANIFEST_FILE};
use crate::error::{EngineError, EngineResult};
use crate::index::VersionedIndex;
use crate::patch_file;
use crate::traits::ArchiveEngine;

const PATCH_PREFIX: &str = "patch-";
const PATCH_SUFFIX: &str = ".osp";

/// Archive engine persisted to a directory.
///
/// The directory holds an `archive.toml` manifest and one patch file per
/// version. Every patch is loaded into a [`VersionedIndex`] at open time;
/// appends write the new patch file before the in-memory index is updated,
/// so a failed write leaves the archive unchanged.
pub struct DiskArchive {
    root: PathBuf,
    read_only: bool,
    index: RwLock<VersionedIndex>,
    /// Serializes appends and close.
    writer: Mutex<()>,
    closed: AtomicBool,
}

impl DiskArchive {
    /// Open the archive at `path`.
    ///
    /// A missing path is created when writable. An existing path must be an
    /// archive directory or an empty directory.
    pub fn open(path: impl AsRef<Path>, options: &ArchiveOptions) -> EngineResult<Self> {
        let root = path.as_ref().to_path_buf();
        let manifest = Self::bootstrap(&root, options)?;
        if manifest.strategy != options.strategy {
            warn!(
                path = %root.display(),
                stored = %manifest.strategy,
                requested = %options.strategy,
                "archive keeps its stored snapshot strategy"
            );
        }

        let mut index = VersionedIndex::new(manifest.strategy);
        for (version, path) in list_patches(&root)?.into_iter().enumerate() {
            let bytes = fs::read(&path)?;
            let patch = patch_file::decode(&path, &bytes)?;
            if patch.version != version as u32 {
                return Err(EngineError::CorruptPatch {
                    path,
                    reason: format!("holds version {}, expected {version}", patch.version),
                });
            }
            index.append(patch.version, &patch.deltas)?;
        }

        info!(
            path = %root.display(),
            read_only = options.read_only,
            strategy = %manifest.strategy,
            max_version = ?index.max_version(),
            "archive opened"
        );
        Ok(Self {
            root,
            read_only: options.read_only,
            index: RwLock::new(index),
            writer: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    fn bootstrap(root: &Path, options: &ArchiveOptions) -> EngineResult<ArchiveManifest> {
        let manifest_path = root.join(MANIFEST_FILE);
        if !root.exists() {
            if options.read_only {
                return Err(EngineError::NotFound(root.to_path_buf()));
            }
            fs::create_dir_all(root).map_err(|source| EngineError::Create {
                path: root.to_path_buf(),
                source,
            })?;
            return Self::initialize(root, options);
        }
        if !root.is_dir() {
            return Err(EngineError::NotAnArchive(root.to_path_buf()));
        }
        if manifest_path.is_file() {
            return ArchiveManifest::load(&manifest_path);
        }
        if fs::read_dir(root)?.next().is_none() && !options.read_only {
            return Self::initialize(root, options);
        }
        Err(EngineError::NotAnArchive(root.to_path_buf()))
    }

    fn initialize(root: &Path, options: &ArchiveOptions) -> EngineResult<ArchiveManifest> {
        let manifest = ArchiveManifest::new(options.strategy);
        manifest.save(&root.join(MANIFEST_FILE))?;
        debug!(path = %root.display(), "initialized new archive directory");
        Ok(manifest)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn patch_path(&self, version: u32) -> PathBuf {
        self.root.join(format!("{PATCH_PREFIX}{version:010}{PATCH_SUFFIX}"))
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

/// Patch files under `root`, ordered by version. Gaps are an error.
fn list_patches(root: &Path) -> EngineResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(number) = name
            .strip_prefix(PATCH_PREFIX)
            .and_then(|rest| rest.strip_suffix(PATCH_SUFFIX))
        else {
            continue;
        };
        match number.parse::<u32>() {
            Ok(version) => found.push((version, entry.path())),
            Err(_) => warn!(file = %entry.path().display(), "ignoring file with patch-like name"),
        }
    }
    found.sort_by_key(|(version, _)| *version);

    for (expected, (version, _)) in found.iter().enumerate() {
        if *version != expected as u32 {
            return Err(EngineError::MissingPatch(expected as u32));
        }
    }
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// Write through a temporary file and rename, so a crash never leaves a
/// half-written patch under its final name.
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temporary = path.with_extension("tmp");
    fs::write(&temporary, bytes)?;
    fs::File::open(&temporary)?.sync_all()?;
    fs::rename(&temporary, path)
}

async fn blocking<T, F>(task: F) -> EngineResult<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(io::Error::other)?
        .map_err(EngineError::from)
}

#[async_trait]
impl ArchiveEngine for DiskArchive {
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
        if self.read_only {
            return Err(EngineError::ReadOnly);
        }

        let _writer = self.writer.lock().await;
        self.ensure_open()?;
        let patch = self.read().prepare(version, triples)?;
        let bytes = patch_file::encode(&patch)?;
        let path = self.patch_path(version);
        blocking(move || write_atomically(&path, &bytes)).await?;

        let inserted = patch.len();
        self.write().commit(patch);
        debug!(version, submitted = triples.len(), inserted, "patch written");
        Ok(inserted)
    }

    async fn close(&self, remove: bool) -> EngineResult<()> {
        let _writer = self.writer.lock().await;
        if self.is_closed() {
            return Ok(());
        }
        // A failed removal leaves the archive open so the close can be retried.
        if remove {
            let root = self.root.clone();
            blocking(move || fs::remove_dir_all(root)).await?;
        }
        self.closed.store(true, Ordering::Release);
        if remove {
            self.write().clear();
        }
        info!(path = %self.root.display(), remove, "archive closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SnapshotStrategy;

    fn addition(o: &str) -> EncodedDelta {
        EncodedDelta {
            triple: EncodedTriple::new("a", "a", o),
            addition: true,
        }
    }

    fn deletion(o: &str) -> EncodedDelta {
        EncodedDelta {
            triple: EncodedTriple::new("a", "a", o),
            addition: false,
        }
    }

    #[tokio::test]
    async fn missing_path_is_created_when_writable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("store.ostrich");
        let archive = DiskArchive::open(&root, &ArchiveOptions::default()).unwrap();
        assert!(root.join(MANIFEST_FILE).is_file());
        assert_eq!(archive.max_version(), None);
    }

    #[test]
    fn missing_path_is_an_error_when_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let options = ArchiveOptions {
            read_only: true,
            ..ArchiveOptions::default()
        };
        assert!(matches!(
            DiskArchive::open(dir.path().join("absent"), &options),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn foreign_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "hello").unwrap();
        assert!(matches!(
            DiskArchive::open(&file, &ArchiveOptions::default()),
            Err(EngineError::NotAnArchive(_))
        ));
        assert!(matches!(
            DiskArchive::open(dir.path(), &ArchiveOptions::default()),
            Err(EngineError::NotAnArchive(_))
        ));
    }

    #[tokio::test]
    async fn reopen_restores_versions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        {
            let archive = DiskArchive::open(&root, &ArchiveOptions::default()).unwrap();
            archive
                .append_version(0, &[addition("a"), addition("b"), addition("c")])
                .await
                .unwrap();
            archive
                .append_version(1, &[deletion("a"), deletion("b"), addition("d"), addition("e")])
                .await
                .unwrap();
            archive.close(false).await.unwrap();
        }

        let options = ArchiveOptions {
            read_only: true,
            ..ArchiveOptions::default()
        };
        let archive = DiskArchive::open(&root, &options).unwrap();
        assert_eq!(archive.max_version(), Some(1));
        let page = archive
            .search_version_materialized(&TriplePattern::any(), Window::default(), Some(1))
            .await
            .unwrap();
        let objects: Vec<&str> = page.triples.iter().map(|t| t.object.as_str()).collect();
        assert_eq!(objects, vec!["c", "d", "e"]);

        assert!(matches!(
            archive.append_version(2, &[addition("f")]).await,
            Err(EngineError::ReadOnly)
        ));
    }

    #[tokio::test]
    async fn stored_strategy_wins_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let interval = ArchiveOptions {
            read_only: false,
            strategy: SnapshotStrategy::from_name("interval", "2").unwrap(),
        };
        DiskArchive::open(&root, &interval).unwrap();
        let reopened = DiskArchive::open(&root, &ArchiveOptions::default()).unwrap();
        assert_eq!(reopened.read().strategy(), interval.strategy);
    }

    #[tokio::test]
    async fn failed_append_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let archive = DiskArchive::open(&root, &ArchiveOptions::default()).unwrap();
        let error = archive
            .append_version(0, &[deletion("a")])
            .await
            .unwrap_err();
        assert!(matches!(error, EngineError::SnapshotInvariant));
        assert!(list_patches(&root).unwrap().is_empty());
    }

    #[tokio::test]
    async fn gap_in_patches_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let archive = DiskArchive::open(&root, &ArchiveOptions::default()).unwrap();
        archive.append_version(0, &[addition("a")]).await.unwrap();
        archive.append_version(1, &[addition("b")]).await.unwrap();
        archive.close(false).await.unwrap();

        fs::remove_file(root.join(format!("{PATCH_PREFIX}{:010}{PATCH_SUFFIX}", 0))).unwrap();
        assert!(matches!(
            DiskArchive::open(&root, &ArchiveOptions::default()),
            Err(EngineError::MissingPatch(0))
        ));
    }

    #[tokio::test]
    async fn close_with_remove_deletes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let archive = DiskArchive::open(&root, &ArchiveOptions::default()).unwrap();
        archive.append_version(0, &[addition("a")]).await.unwrap();
        archive.close(true).await.unwrap();
        assert!(!root.exists());
        assert!(matches!(
            archive.search_version(&TriplePattern::any(), Window::default()).await,
            Err(EngineError::Closed)
        ));
    }

    #[tokio::test]
    async fn failed_remove_keeps_archive_open_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let archive = DiskArchive::open(&root, &ArchiveOptions::default()).unwrap();
        archive.append_version(0, &[addition("a")]).await.unwrap();

        fs::remove_dir_all(&root).unwrap();
        assert!(matches!(archive.close(true).await, Err(EngineError::Io(_))));
        assert!(!archive.is_closed());
        let page = archive
            .search_version(&TriplePattern::any(), Window::default())
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);

        fs::create_dir_all(&root).unwrap();
        archive.close(true).await.unwrap();
        assert!(archive.is_closed());
        assert!(!root.exists());
    }
}
