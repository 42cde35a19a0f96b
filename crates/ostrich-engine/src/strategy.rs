use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Decides which versions keep a fully materialized snapshot.
///
/// Version 0 is always a snapshot. Every other version is stored as a patch
/// against its predecessor, and materialization starts from the nearest
/// snapshot at or below the requested version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum SnapshotStrategy {
    /// Only the initial snapshot.
    #[default]
    Never,
    /// A snapshot at every multiple of `parameter`.
    Interval { parameter: NonZeroU32 },
}

impl SnapshotStrategy {
    /// Build a strategy from its `(name, parameter)` string pair, e.g.
    /// `("never", "0")` or `("interval", "2")`.
    pub fn from_name(name: &str, parameter: &str) -> EngineResult<Self> {
        match name {
            "never" => Ok(Self::Never),
            "interval" => parameter
                .trim()
                .parse::<NonZeroU32>()
                .map(|parameter| Self::Interval { parameter })
                .map_err(|_| EngineError::InvalidStrategyParameter {
                    name: name.to_string(),
                    parameter: parameter.to_string(),
                }),
            other => Err(EngineError::UnknownStrategy(other.to_string())),
        }
    }

    pub fn is_snapshot(&self, version: u32) -> bool {
        match self {
            Self::Never => version == 0,
            Self::Interval { parameter } => version % parameter.get() == 0,
        }
    }
}

impl fmt::Display for SnapshotStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("never"),
            Self::Interval { parameter } => write!(f, "interval({parameter})"),
        }
    }
}
