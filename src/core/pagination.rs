//! Page-number pagination for list endpoints.

use serde::{Deserialize, Serialize};

/// Upper bound for the `limit` query parameter.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Raw `page` / `limit` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Rows per page
    pub limit: Option<u64>,
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number, at least 1
    pub page: u64,
    /// Rows per page, between 1 and [`MAX_PAGE_SIZE`]
    pub size: u64,
}

impl PageWindow {
    /// Clamps raw parameters into a usable window.
    ///
    /// The page number is capped so the row offset still fits a signed 64-bit
    /// SQL offset; pages past the end simply come back empty.
    #[must_use]
    pub fn new(params: PageParams, default_size: u64) -> Self {
        let size = params
            .limit
            .unwrap_or(default_size)
            .clamp(1, MAX_PAGE_SIZE);
        Self {
            page: params.page.unwrap_or(1).clamp(1, Self::max_page(size)),
            size,
        }
    }

    /// Largest page whose offset `(page - 1) * size` stays within `i64::MAX`.
    const fn max_page(size: u64) -> u64 {
        i64::MAX.unsigned_abs() / size
    }

    /// 0-based page index as used by `SeaORM` paginators.
    #[must_use]
    pub const fn index(self) -> u64 {
        self.page - 1
    }
}

/// One page of results plus navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Total number of rows across all pages
    pub count: u64,
    /// Next page number, if there is one
    pub next: Option<u64>,
    /// Previous page number, if there is one
    pub previous: Option<u64>,
    /// Rows on this page
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Builds a page from the fetched rows and the total row count.
    #[must_use]
    pub fn from_rows(results: Vec<T>, count: u64, window: PageWindow) -> Self {
        let page_count = count.div_ceil(window.size);
        Self {
            count,
            next: (window.page < page_count).then_some(window.page + 1),
            previous: (window.page > 1).then(|| window.page - 1),
            results,
        }
    }

    /// Swaps the rows for their representations, keeping the navigation.
    #[must_use]
    pub fn with_results<U>(self, results: Vec<U>) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        }
    }
}
