//! Pagination envelope.

use serde::Serialize;

/// Pagination metadata accompanying a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number that was requested.
    pub page: u64,
    /// Requested page size.
    pub per_page: u64,
    /// Total matching records across all pages.
    pub total_records: u64,
    /// Total number of pages; 1 when there are no records.
    pub total_pages: u64,
    /// Whether at least one page follows this one.
    pub has_more: bool,
    /// The previous page number, absent on the first page.
    pub previous_page: Option<u64>,
    /// The next page number, absent on the last page.
    pub next_page: Option<u64>,
}

impl Pagination {
    pub(crate) fn new(page: u64, per_page: u64, total_records: u64) -> Self {
        let total_pages = if total_records == 0 {
            1
        } else {
            total_records.div_ceil(per_page)
        };
        Self {
            page,
            per_page,
            total_records,
            total_pages,
            has_more: page < total_pages,
            previous_page: (page > 1).then(|| page - 1),
            next_page: (page < total_pages).then(|| page + 1),
        }
    }
}

/// One page of results with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// The records of this page, in query order.
    pub items: Vec<T>,
    /// Page position and totals.
    pub pagination: Pagination,
}
