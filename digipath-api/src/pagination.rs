//! Pagination utilities
//!
//! Listings return `{items, total, page, per_page, total_pages}`. Requested
//! pages are clamped into `[1, total_pages]` and `per_page` into
//! `[1, max_per_page]`.

use serde::{Deserialize, Serialize};

/// Page query parameters (`?page=2&per_page=50`)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Page size limits (from configuration)
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_per_page: i64,
    pub max_per_page: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_per_page: digipath_common::config::DEFAULT_PAGE_SIZE as i64,
            max_per_page: digipath_common::config::MAX_PAGE_SIZE as i64,
        }
    }
}

impl PageLimits {
    /// Requested page size, defaulted and clamped
    pub fn per_page(&self, request: &PageRequest) -> i64 {
        request
            .per_page
            .unwrap_or(self.default_per_page)
            .clamp(1, self.max_per_page)
    }
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// # Examples
/// ```
/// use digipath_api::pagination::calculate_pagination;
///
/// // 45 results at 20 per page = 3 pages (20 + 20 + 5)
/// let p = calculate_pagination(45, 2, 20);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(45, 99, 20);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 40);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, per_page: i64) -> Pagination {
    let per_page = per_page.max(1);
    let total_pages = (total_results + per_page - 1) / per_page;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * per_page;

    Pagination {
        page,
        per_page,
        total_pages,
        offset,
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            total_pages: pagination.total_pages,
        }
    }
}
