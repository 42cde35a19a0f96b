//! Store handle for OSTRICH versioned triple archives.
//!
//! [`OstrichStore`] wraps one [`ArchiveEngine`](ostrich_engine::ArchiveEngine)
//! and orchestrates the three query modes, the two append paths and the
//! drain-before-close shutdown.
//!
//! ```no_run
//! use ostrich_store::{OpenOptions, OstrichStore, VersionMaterializedQuery};
//! use ostrich_types::{Term, Triple, TripleDelta};
//!
//! # async fn demo() -> ostrich_store::StoreResult<()> {
//! let store = OstrichStore::open("data/archive", OpenOptions::default()).await?;
//! let a = Term::named_node("http://example.org/a");
//! store
//!     .append(vec![TripleDelta::addition(Triple::new(a.clone(), a.clone(), a.clone()))], None)
//!     .await?;
//! let page = store
//!     .search_version_materialized(Some(&a), None, None, VersionMaterializedQuery::default())
//!     .await?;
//! assert_eq!(page.total_count, 1);
//! store.close(false).await?;
//! # Ok(())
//! # }
//! ```

pub mod append;
pub mod error;
pub mod features;
pub mod lifecycle;
pub mod options;
pub mod query;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{Access, ErrorKind, StoreError, StoreResult};
pub use features::Features;
pub use lifecycle::{Lifecycle, OperationGuard};
pub use options::{DeltaMaterializedQuery, OpenOptions, VersionMaterializedQuery, VersionQuery};
pub use store::{OstrichStore, StoreMetadata};
