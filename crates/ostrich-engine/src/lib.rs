//! Archive engines for OSTRICH.
//!
//! An archive stores the initial snapshot of a triple set as version 0 and
//! every later version as the effective changes against its predecessor.
//! [`VersionedIndex`] answers the three query modes over that history;
//! [`ArchiveEngine`] is the async boundary the store handle talks to.
//!
//! # Implementations
//!
//! - [`MemoryArchive`] keeps everything in memory.
//! - [`DiskArchive`] persists each version as a checksummed patch file
//!   inside an archive directory.

pub mod config;
pub mod disk;
pub mod error;
pub mod index;
pub mod memory;
pub mod patch_file;
pub mod strategy;
pub mod traits;

pub use config::{ArchiveManifest, ArchiveOptions, ARCHIVE_FORMAT_VERSION, MANIFEST_FILE};
pub use disk::DiskArchive;
pub use error::{EngineError, EngineResult};
pub use index::{Patch, VersionedIndex};
pub use memory::MemoryArchive;
pub use strategy::SnapshotStrategy;
pub use traits::ArchiveEngine;
