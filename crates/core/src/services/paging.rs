//! Page-based pagination shared by list operations.

use serde::Deserialize;

/// Default page size for lists.
pub const DEFAULT_LIMIT: u64 = 20;

/// Largest page size any list accepts.
pub const MAX_LIMIT: u64 = 50;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageParams {
    /// Build a page request, clamping both values into range.
    #[must_use]
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Clamped page size.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    /// Row offset of the first item.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1) * self.limit()
    }
}
