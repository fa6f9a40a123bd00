//! Pagination and list results.

use super::Filter;
use super::OrderBy;

/// Number of pages needed for `total` rows.
///
/// Zero rows give zero pages. `page_size` of zero is treated as one so the
/// result is always finite.
pub fn page_count(total: u64, page_size: usize) -> usize {
    let size = page_size.max(1) as u64;
    usize::try_from(total.div_ceil(size)).unwrap_or(usize::MAX)
}

/// A page window derived from page index and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    /// Maximum number of rows to return.
    pub fn limit(&self) -> usize {
        self.page_size
    }
}

/// Parameters of one list/count round trip.
///
/// Two requests are equal exactly when they would produce the same page, which
/// is how the controller recognizes stale responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    /// AND-combined column filters.
    pub filter: Filter,
    /// Priority-ordered sort.
    pub order: OrderBy,
    pub pagination: Pagination,
}

/// A page of rows with the total count of matching rows.
///
/// # Example
///
/// ```
/// use blogdesk_lib::model::Record;
/// use blogdesk_lib::query::ListResult;
///
/// let page = ListResult::new(vec![Record::new("a")], 12);
/// assert_eq!(page.len(), 1);
/// assert_eq!(page.total_count(), 12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult<R> {
    rows: Vec<R>,
    total_count: u64,
}

impl<R> ListResult<R> {
    pub fn new(rows: Vec<R>, total_count: u64) -> Self {
        Self { rows, total_count }
    }

    /// Returns the rows of this page.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Consumes the result and returns the rows.
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// Total matching rows, ignoring pagination.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(5, 0), 5);
    }

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(0, 10).offset(), 0);
        assert_eq!(Pagination::new(3, 20).offset(), 60);
        assert_eq!(Pagination::new(3, 20).limit(), 20);
    }
}
