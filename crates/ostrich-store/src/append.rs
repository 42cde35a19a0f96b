use tracing::debug;

use ostrich_types::{sort_deltas, EncodedDelta, TripleDelta};

use crate::error::{Access, StoreError, StoreResult};
use crate::store::OstrichStore;

impl OstrichStore {
    /// Append a batch in any order. The batch is sorted into canonical SPO
    /// order and handed to [`OstrichStore::append_sorted`].
    pub async fn append(
        &self,
        mut triples: Vec<TripleDelta>,
        version: Option<u32>,
    ) -> StoreResult<usize> {
        sort_deltas(&mut triples);
        self.append_sorted(&triples, version).await
    }

    /// Append a batch already in canonical SPO order as `version`, by
    /// default one past the current maximum.
    ///
    /// Returns the number of triples the engine actually inserted. Terms that
    /// could not be read back, such as variables, are rejected before the
    /// engine sees the batch. Snapshot and ordering violations are detected
    /// by the engine and passed through.
    pub async fn append_sorted(
        &self,
        triples: &[TripleDelta],
        version: Option<u32>,
    ) -> StoreResult<usize> {
        let _operation = self.lifecycle.begin(Access::Append)?;
        if self.is_read_only() {
            return Err(StoreError::ReadOnly);
        }

        let encoded = triples
            .iter()
            .map(TripleDelta::try_encode)
            .collect::<Result<Vec<EncodedDelta>, _>>()
            .map_err(|error| StoreError::Engine(format!("invalid triple: {error}")))?;
        let version = version.unwrap_or_else(|| self.max_version().map_or(0, |max| max + 1));
        let inserted = self.engine.append_version(version, &encoded).await?;
        self.record_version(version);
        debug!(version, submitted = encoded.len(), inserted, "append");
        Ok(inserted)
    }
}
