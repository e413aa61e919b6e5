use serde::{Deserialize, Serialize};

use crate::query::PageRequest;

/// One page of a filtered, sorted listing plus the counts needed for pagination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    /// Rows in the entity ignoring every filter.
    pub total: u64,
    /// Rows matching the filter.
    pub filtered_total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResult<T> {
    pub fn new(data: Vec<T>, total: u64, filtered_total: u64, page: PageRequest) -> Self {
        Self {
            data,
            total,
            filtered_total,
            page: page.page(),
            limit: page.limit(),
            total_pages: total_pages(filtered_total, page.limit()),
        }
    }

    pub fn empty(page: PageRequest) -> Self {
        Self::new(Vec::new(), 0, 0, page)
    }

    /// Map rows while keeping the counts (model → DTO convenience).
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            filtered_total: self.filtered_total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }
}

/// `ceil(filtered / limit)`; zero rows means zero pages.
pub fn total_pages(filtered_total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    filtered_total.div_ceil(limit)
}
