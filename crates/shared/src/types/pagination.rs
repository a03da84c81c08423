//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Largest page size any listing endpoint accepts.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Limit/offset pagination for list queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of items to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    10
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl Pagination {
    /// Creates a pagination window.
    #[must_use]
    pub const fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// Whether the limit is within the accepted range.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.limit >= 1 && self.limit <= MAX_PAGE_SIZE
    }
}
