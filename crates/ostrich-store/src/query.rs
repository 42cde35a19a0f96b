//! The three query modes and their count-only forms.
//!
//! Every query is admitted through the store's lifecycle, so it is rejected
//! once a close has been requested and always finishes before the engine
//! shuts down. Preconditions are checked in a fixed order: closed store,
//! empty store, then the version range.

use tracing::debug;

use ostrich_types::{Count, SearchPage, Term, Triple, TripleDelta, TriplePattern, TripleVersions};

use crate::error::{Access, StoreError, StoreResult};
use crate::options::{DeltaMaterializedQuery, VersionMaterializedQuery, VersionQuery};
use crate::store::OstrichStore;

/// Window used by the count-only operations: the engine still counts every
/// match but only one result is transferred.
const COUNT_WINDOW_LIMIT: usize = 1;

impl OstrichStore {
    fn require_versions(&self) -> StoreResult<u32> {
        self.max_version().ok_or(StoreError::Empty)
    }

    /// Triples matching the pattern in the materialized state of one version.
    ///
    /// Missing terms and variables match anything. `options.version` of
    /// `None` selects the latest version.
    pub async fn search_version_materialized(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        options: VersionMaterializedQuery,
    ) -> StoreResult<SearchPage<Triple>> {
        let _operation = self.lifecycle.begin(Access::Query)?;
        self.require_versions()?;

        let pattern = TriplePattern::from_terms(subject, predicate, object);
        let page = self
            .engine
            .search_version_materialized(&pattern, options.window(), options.version)
            .await?;
        debug!(
            ?pattern,
            version = ?options.version,
            offset = options.offset,
            limit = options.limit,
            total = page.total_count,
            "version-materialized query"
        );
        Ok(page.try_map(|triple| triple.decode())?)
    }

    /// Net changes between the materialized states at `version_start` and
    /// `version_end`, each tagged as addition or deletion.
    ///
    /// The count is exact only for adjacent versions; wider ranges report an
    /// upper bound with `has_exact_count == false`.
    pub async fn search_delta_materialized(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        options: DeltaMaterializedQuery,
    ) -> StoreResult<SearchPage<TripleDelta>> {
        let _operation = self.lifecycle.begin(Access::Query)?;
        let max = self.require_versions()?;
        let (start, end) = (options.version_start, options.version_end);
        if start >= end {
            return Err(StoreError::StartNotBeforeEnd { start, end });
        }
        if end > max {
            return Err(StoreError::EndExceedsMax { end, max });
        }

        let pattern = TriplePattern::from_terms(subject, predicate, object);
        let page = self
            .engine
            .search_delta_materialized(&pattern, options.window(), start, end)
            .await?;
        debug!(
            ?pattern,
            start,
            end,
            offset = options.offset,
            limit = options.limit,
            total = page.total_count,
            exact = page.has_exact_count,
            "delta-materialized query"
        );
        Ok(page.try_map(|delta| delta.decode())?)
    }

    /// Every matching triple that held in at least one version, with the
    /// ascending versions at which it held.
    pub async fn search_version(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        options: VersionQuery,
    ) -> StoreResult<SearchPage<TripleVersions>> {
        let _operation = self.lifecycle.begin(Access::Query)?;
        self.require_versions()?;

        let pattern = TriplePattern::from_terms(subject, predicate, object);
        let page = self
            .engine
            .search_version(&pattern, options.window())
            .await?;
        debug!(
            ?pattern,
            offset = options.offset,
            limit = options.limit,
            total = page.total_count,
            "version query"
        );
        Ok(page.try_map(|versions| versions.decode())?)
    }

    pub async fn count_version_materialized(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        options: VersionMaterializedQuery,
    ) -> StoreResult<Count> {
        let options = VersionMaterializedQuery {
            limit: COUNT_WINDOW_LIMIT,
            ..options
        };
        let page = self
            .search_version_materialized(subject, predicate, object, options)
            .await?;
        Ok(page.count())
    }

    pub async fn count_delta_materialized(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        options: DeltaMaterializedQuery,
    ) -> StoreResult<Count> {
        let options = DeltaMaterializedQuery {
            limit: COUNT_WINDOW_LIMIT,
            ..options
        };
        let page = self
            .search_delta_materialized(subject, predicate, object, options)
            .await?;
        Ok(page.count())
    }

    pub async fn count_version(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        options: VersionQuery,
    ) -> StoreResult<Count> {
        let options = VersionQuery {
            limit: COUNT_WINDOW_LIMIT,
            ..options
        };
        let page = self.search_version(subject, predicate, object, options).await?;
        Ok(page.count())
    }
}
