use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use ostrich_types::{
    first_unsorted, EncodedDelta, EncodedTriple, EncodedVersions, SearchPage, TriplePattern,
    Window,
};

use crate::error::{EngineError, EngineResult};
use crate::strategy::SnapshotStrategy;

/// The normalized change set of one version.
///
/// For version 0 this is the initial snapshot (additions only). For any later
/// version it holds exactly the effective changes against the previous
/// version, unique per triple and in SPO order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub version: u32,
    pub deltas: Vec<EncodedDelta>,
}

impl Patch {
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    fn matching(&self, pattern: &TriplePattern) -> usize {
        self.deltas
            .iter()
            .filter(|delta| pattern.matches(&delta.triple))
            .count()
    }
}

type State = BTreeSet<EncodedTriple>;

/// Snapshot-plus-delta index over every version of an archive.
pub struct VersionedIndex {
    strategy: SnapshotStrategy,
    patches: Vec<Patch>,
    snapshots: BTreeMap<u32, State>,
}

impl VersionedIndex {
    pub fn new(strategy: SnapshotStrategy) -> Self {
        Self {
            strategy,
            patches: Vec::new(),
            snapshots: BTreeMap::new(),
        }
    }

    pub fn strategy(&self) -> SnapshotStrategy {
        self.strategy
    }

    /// Highest version, `None` while empty.
    pub fn max_version(&self) -> Option<u32> {
        self.patches.last().map(|patch| patch.version)
    }

    pub fn next_version(&self) -> u32 {
        self.patches.len() as u32
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Versions holding a fully materialized snapshot.
    pub fn snapshot_versions(&self) -> Vec<u32> {
        self.snapshots.keys().copied().collect()
    }

    /// Validate a batch for `version` and reduce it to its effective changes
    /// without modifying the index.
    pub fn prepare(&self, version: u32, batch: &[EncodedDelta]) -> EngineResult<Patch> {
        let expected = self.next_version();
        if version != expected {
            return Err(EngineError::NonContiguousVersion {
                requested: version,
                expected,
            });
        }
        if version == 0 && batch.iter().any(|delta| !delta.addition) {
            return Err(EngineError::SnapshotInvariant);
        }
        if let Some(index) = first_unsorted(batch) {
            return Err(EngineError::UnsortedBatch { index });
        }

        // Repeated entries for a triple collapse; the last one wins.
        let mut requested: BTreeMap<&EncodedTriple, bool> = BTreeMap::new();
        for delta in batch {
            requested.insert(&delta.triple, delta.addition);
        }

        let deltas = if version == 0 {
            requested
                .into_keys()
                .map(|triple| EncodedDelta {
                    triple: triple.clone(),
                    addition: true,
                })
                .collect()
        } else {
            let current = self.materialize(version - 1);
            requested
                .into_iter()
                .filter(|(triple, addition)| *addition != current.contains(*triple))
                .map(|(triple, addition)| EncodedDelta {
                    triple: triple.clone(),
                    addition,
                })
                .collect()
        };

        Ok(Patch { version, deltas })
    }

    /// Append a patch produced by [`VersionedIndex::prepare`].
    pub fn commit(&mut self, patch: Patch) {
        debug_assert_eq!(patch.version, self.next_version());
        let version = patch.version;
        self.patches.push(patch);
        if self.strategy.is_snapshot(version) {
            let state = self.materialize(version);
            self.snapshots.insert(version, state);
        }
    }

    /// Prepare and commit in one step, returning the number of effective changes.
    pub fn append(&mut self, version: u32, batch: &[EncodedDelta]) -> EngineResult<usize> {
        let patch = self.prepare(version, batch)?;
        let inserted = patch.len();
        self.commit(patch);
        Ok(inserted)
    }

    /// Drop every version.
    pub fn clear(&mut self) {
        self.patches.clear();
        self.snapshots.clear();
    }

    /// The full triple set at `version`. The version must exist.
    fn materialize(&self, version: u32) -> State {
        let (base, mut state) = self
            .snapshots
            .range(..=version)
            .next_back()
            .map(|(base, state)| (Some(*base), state.clone()))
            .unwrap_or_default();
        let first = base.map_or(0, |base| base + 1);
        for patch in &self.patches[first as usize..=version as usize] {
            apply(&mut state, patch);
        }
        state
    }

    fn require_max(&self) -> EngineResult<u32> {
        self.max_version().ok_or(EngineError::EmptyArchive)
    }

    /// Match `pattern` against the materialized state at `version`
    /// (`None` means the latest version).
    pub fn search_version_materialized(
        &self,
        pattern: &TriplePattern,
        window: Window,
        version: Option<u32>,
    ) -> EngineResult<SearchPage<EncodedTriple>> {
        let max = self.require_max()?;
        let version = version.unwrap_or(max);
        if version > max {
            return Err(EngineError::UnknownVersion {
                requested: version,
                max,
            });
        }

        let matches: Vec<EncodedTriple> = self
            .materialize(version)
            .into_iter()
            .filter(|triple| pattern.matches(triple))
            .collect();
        let total_count = matches.len();
        Ok(SearchPage::exact(window.apply(matches), total_count))
    }

    /// Match `pattern` against the net change between two materialized states.
    ///
    /// The count is exact for a single version step. For wider ranges it is
    /// the sum of the matching per-step changes, an upper bound on the real
    /// number of net changes.
    pub fn search_delta_materialized(
        &self,
        pattern: &TriplePattern,
        window: Window,
        version_start: u32,
        version_end: u32,
    ) -> EngineResult<SearchPage<EncodedDelta>> {
        let max = self.require_max()?;
        if version_start >= version_end {
            return Err(EngineError::InvalidRange {
                start: version_start,
                end: version_end,
            });
        }
        if version_end > max {
            return Err(EngineError::UnknownVersion {
                requested: version_end,
                max,
            });
        }

        let from = self.materialize(version_start);
        let to = self.materialize(version_end);
        let mut changes: BTreeMap<&EncodedTriple, bool> = BTreeMap::new();
        for removed in from.difference(&to).filter(|t| pattern.matches(t)) {
            changes.insert(removed, false);
        }
        for added in to.difference(&from).filter(|t| pattern.matches(t)) {
            changes.insert(added, true);
        }

        let (total_count, has_exact_count) = if version_end - version_start == 1 {
            (changes.len(), true)
        } else {
            let estimate = self.patches[version_start as usize + 1..=version_end as usize]
                .iter()
                .map(|patch| patch.matching(pattern))
                .sum();
            (estimate, false)
        };

        let triples = window.apply(changes.into_iter().map(|(triple, addition)| EncodedDelta {
            triple: triple.clone(),
            addition,
        }));
        Ok(SearchPage {
            triples,
            total_count,
            has_exact_count,
        })
    }

    /// Every triple matching `pattern` that held in at least one version,
    /// with the ascending list of versions at which it held.
    pub fn search_version(
        &self,
        pattern: &TriplePattern,
        window: Window,
    ) -> EngineResult<SearchPage<EncodedVersions>> {
        self.require_max()?;

        let mut present = State::new();
        let mut lifetimes: BTreeMap<EncodedTriple, Vec<u32>> = BTreeMap::new();
        for patch in &self.patches {
            apply(&mut present, patch);
            for triple in present.iter().filter(|t| pattern.matches(t)) {
                lifetimes
                    .entry(triple.clone())
                    .or_default()
                    .push(patch.version);
            }
        }

        let total_count = lifetimes.len();
        let triples = window.apply(
            lifetimes
                .into_iter()
                .map(|(triple, versions)| EncodedVersions { triple, versions }),
        );
        Ok(SearchPage::exact(triples, total_count))
    }
}

fn apply(state: &mut State, patch: &Patch) {
    for delta in &patch.deltas {
        if delta.addition {
            state.insert(delta.triple.clone());
        } else {
            state.remove(&delta.triple);
        }
    }
}
