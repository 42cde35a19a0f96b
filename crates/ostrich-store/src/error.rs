use std::fmt;

use ostrich_engine::EngineError;
use ostrich_types::TypeError;
use thiserror::Error;

/// The kind of operation rejected because the store was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Query,
    Append,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Append => f.write_str("append to"),
        }
    }
}

/// Classification of a [`StoreError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ClosedStore,
    EmptyStore,
    InvalidRange,
    ReadOnlyViolation,
    SnapshotInvariant,
    Engine,
}

/// Errors surfaced by an [`OstrichStore`](crate::OstrichStore).
///
/// Cloneable so a single shutdown outcome can be handed to every caller
/// waiting on the same close.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Attempted to {0} a closed OSTRICH store")]
    Closed(Access),

    #[error("Attempted to query an OSTRICH store without versions")]
    Empty,

    #[error("'versionStart' must be strictly smaller than 'versionEnd'")]
    StartNotBeforeEnd { start: u32, end: u32 },

    #[error("'versionEnd' can not be larger than the maximum version ({max})")]
    EndExceedsMax { end: u32, max: u32 },

    #[error("Attempted to append to an OSTRICH store in read-only mode")]
    ReadOnly,

    /// A deletion was submitted for version 0. Carries the engine's message.
    #[error("{0}")]
    SnapshotInvariant(String),

    /// Any other engine failure, message passed through.
    #[error("{0}")]
    Engine(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Closed(_) => ErrorKind::ClosedStore,
            Self::Empty => ErrorKind::EmptyStore,
            Self::StartNotBeforeEnd { .. } | Self::EndExceedsMax { .. } => ErrorKind::InvalidRange,
            Self::ReadOnly => ErrorKind::ReadOnlyViolation,
            Self::SnapshotInvariant(_) => ErrorKind::SnapshotInvariant,
            Self::Engine(_) => ErrorKind::Engine,
        }
    }
}

impl From<EngineError> for StoreError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::SnapshotInvariant => Self::SnapshotInvariant(error.to_string()),
            other => Self::Engine(other.to_string()),
        }
    }
}

/// An engine response that does not decode into terms.
impl From<TypeError> for StoreError {
    fn from(error: TypeError) -> Self {
        Self::Engine(format!("malformed engine response: {error}"))
    }
}

/// Convenience alias used throughout the store crate.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
