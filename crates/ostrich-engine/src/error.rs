use std::io;
use std::path::PathBuf;

/// Errors produced by archive engines.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A deletion was submitted as part of version 0.
    #[error("All triples of the initial snapshot MUST be additions, but a deletion was found.")]
    SnapshotInvariant,

    /// An append batch is not in canonical SPO order.
    #[error("triples must be appended in SPO order, entry {index} is out of order")]
    UnsortedBatch { index: usize },

    /// Versions are appended contiguously.
    #[error("version {requested} can not be appended, the next version is {expected}")]
    NonContiguousVersion { requested: u32, expected: u32 },

    /// The archive has no versions yet.
    #[error("the archive has no versions")]
    EmptyArchive,

    /// A query referenced a version beyond the latest one.
    #[error("version {requested} does not exist, the maximum version is {max}")]
    UnknownVersion { requested: u32, max: u32 },

    #[error("invalid version range: start={start}, end={end}")]
    InvalidRange { start: u32, end: u32 },

    /// The engine has been shut down.
    #[error("archive is closed")]
    Closed,

    #[error("archive is read-only")]
    ReadOnly,

    #[error("unknown snapshot strategy {0:?}")]
    UnknownStrategy(String),

    #[error("invalid parameter {parameter:?} for snapshot strategy {name}")]
    InvalidStrategyParameter { name: String, parameter: String },

    #[error("no archive found at {0}")]
    NotFound(PathBuf),

    /// The path exists but does not hold an archive.
    #[error("{0} is not an archive directory")]
    NotAnArchive(PathBuf),

    #[error("unable to create new archive at {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid archive manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("corrupt patch file {path}: {reason}")]
    CorruptPatch { path: PathBuf, reason: String },

    /// Patch files on disk do not form a contiguous version sequence.
    #[error("missing patch file for version {0}")]
    MissingPatch(u32),

    #[error("invalid options: {0}")]
    Options(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the engine crate.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
