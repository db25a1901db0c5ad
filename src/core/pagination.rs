use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_PAGE_LIMIT;

/// Query parameters shared by every listing endpoint. Values below 1 are
/// clamped rather than rejected.
#[derive(Deserialize, Clone, Copy, Default)]
pub struct PageQuery {
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1)
    }

    pub fn skip(&self) -> usize {
        (self.page() - 1) * self.limit()
    }
}

/// Pagination block returned alongside every page.
#[derive(Serialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(total_count: usize, query: &PageQuery) -> Self {
        Self {
            total_count,
            current_page: query.page(),
            total_pages: total_count.div_ceil(query.limit()),
        }
    }
}

/// Apply skip/limit over an already-sorted slice, returning the page plus
/// its pagination block.
pub fn slice_page<T: Clone>(items: &[T], query: &PageQuery) -> (Vec<T>, Pagination) {
    let page = items
        .iter()
        .skip(query.skip())
        .take(query.limit())
        .cloned()
        .collect();
    (page, Pagination::new(items.len(), query))
}
