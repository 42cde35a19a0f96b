use serde::{Deserialize, Serialize};

/// Capabilities of an open store, fixed at open time.
///
/// Every query capability is always present; only `append` depends on the
/// store having been opened writable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Features {
    pub search_version_materialized: bool,
    pub count_version_materialized: bool,
    pub search_delta_materialized: bool,
    pub count_delta_materialized: bool,
    pub search_version: bool,
    pub count_version: bool,
    pub append: bool,
}

impl Features {
    pub fn for_mode(read_only: bool) -> Self {
        Self {
            search_version_materialized: true,
            count_version_materialized: true,
            search_delta_materialized: true,
            count_delta_materialized: true,
            search_version: true,
            count_version: true,
            append: !read_only,
        }
    }
}
