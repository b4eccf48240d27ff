//! Pagination and sort helpers for admin listings.
//!
//! Listings are page-based (`page` starting at 1) with a per-page `limit`.
//! Sort columns are whitelisted per listing so user input never reaches SQL.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default page size for admin listings.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size for admin listings.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Sort direction toggled by the admin listing headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// The opposite direction, used to build the next header toggle link.
    pub fn swapped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// Build a window from optional `page` / `limit` inputs.
    ///
    /// Missing or non-positive pages resolve to page 1. The limit defaults to
    /// [`DEFAULT_PAGE_SIZE`] and is clamped to `1..=MAX_PAGE_SIZE`. The
    /// offset saturates instead of overflowing on huge pages.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        Self {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    /// Number of pages needed to show `total` rows.
    pub fn page_count(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        (total + self.limit - 1) / self.limit
    }
}

/// Resolve a requested sort column against a whitelist.
///
/// Returns the whitelisted column name, or `default` when nothing was
/// requested. Unknown columns are a validation error.
pub fn resolve_sort_column(
    requested: Option<&str>,
    allowed: &[&'static str],
    default: &'static str,
) -> Result<&'static str, CoreError> {
    match requested {
        None => Ok(default),
        Some(r) if r.trim().is_empty() => Ok(default),
        Some(r) => allowed.iter().copied().find(|c| *c == r).ok_or_else(|| {
            CoreError::Validation(format!(
                "Cannot sort by '{r}'. Sortable columns: {}",
                allowed.join(", ")
            ))
        }),
    }
}
