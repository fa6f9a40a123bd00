//! Table view state

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use super::FilterValue;
use crate::query::Direction;
use crate::query::Pagination;

/// Page size used when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One sort entry. Position in [`ViewState::sort`] is its priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortItem {
    pub column: String,
    pub descending: bool,
}

impl SortItem {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            descending: direction.is_desc(),
        }
    }

    pub fn direction(&self) -> Direction {
        if self.descending { Direction::Desc } else { Direction::Asc }
    }
}

/// Side a column is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinSide {
    Left,
    Right,
}

/// Columns pinned to either edge, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPinning {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

impl ColumnPinning {
    pub fn left(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            left: columns.into_iter().map(Into::into).collect(),
            right: Vec::new(),
        }
    }

    pub fn right(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            left: Vec::new(),
            right: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the side a column is pinned to.
    pub fn side_of(&self, column: &str) -> Option<PinSide> {
        if self.left.iter().any(|c| c == column) {
            Some(PinSide::Left)
        } else if self.right.iter().any(|c| c == column) {
            Some(PinSide::Right)
        } else {
            None
        }
    }

    /// Pins a column to a side (appended last), or unpins it with `None`.
    pub fn pin(&mut self, column: &str, side: Option<PinSide>) {
        if self.side_of(column) == side {
            return;
        }
        self.left.retain(|c| c != column);
        self.right.retain(|c| c != column);
        match side {
            Some(PinSide::Left) => self.left.push(column.to_string()),
            Some(PinSide::Right) => self.right.push(column.to_string()),
            None => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// The complete client-side configuration of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub page_index: usize,
    /// Always at least 1 once owned by a controller.
    pub page_size: usize,
    /// At most one entry per column.
    pub sort: Vec<SortItem>,
    /// Never holds empty values.
    pub filters: BTreeMap<String, FilterValue>,
    /// Columns without an entry are visible.
    pub visibility: BTreeMap<String, bool>,
    pub pinning: ColumnPinning,
    pub selection: BTreeSet<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    /// Creates a state on the first page with nothing sorted, filtered or selected.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size,
            sort: Vec::new(),
            filters: BTreeMap::new(),
            visibility: BTreeMap::new(),
            pinning: ColumnPinning::default(),
            selection: BTreeSet::new(),
        }
    }

    pub fn is_visible(&self, column: &str) -> bool {
        self.visibility.get(column).copied().unwrap_or(true)
    }

    /// Sort entry for a column, if it is sorted.
    pub fn sort_of(&self, column: &str) -> Option<&SortItem> {
        self.sort.iter().find(|s| s.column == column)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page_index, self.page_size)
    }
}

/// Per-table starting state, overlaid on the defaults before any shareable
/// state is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialState {
    pub page_size: Option<usize>,
    pub sort: Option<Vec<SortItem>>,
    pub filters: Option<BTreeMap<String, FilterValue>>,
    pub visibility: Option<BTreeMap<String, bool>>,
    pub pinning: Option<ColumnPinning>,
}

impl InitialState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_sort(mut self, sort: impl IntoIterator<Item = SortItem>) -> Self {
        self.sort = Some(sort.into_iter().collect());
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, value: FilterValue) -> Self {
        self.filters
            .get_or_insert_with(BTreeMap::new)
            .insert(column.into(), value);
        self
    }

    pub fn with_hidden(mut self, column: impl Into<String>) -> Self {
        self.visibility
            .get_or_insert_with(BTreeMap::new)
            .insert(column.into(), false);
        self
    }

    pub fn with_pinning(mut self, pinning: ColumnPinning) -> Self {
        self.pinning = Some(pinning);
        self
    }

    /// Applies this overlay to a state.
    pub fn apply(&self, state: &mut ViewState) {
        if let Some(page_size) = self.page_size {
            state.page_size = page_size;
        }
        if let Some(sort) = &self.sort {
            state.sort = sort.clone();
        }
        if let Some(filters) = &self.filters {
            state.filters = filters
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        if let Some(visibility) = &self.visibility {
            state.visibility = visibility.clone();
        }
        if let Some(pinning) = &self.pinning {
            state.pinning = pinning.clone();
        }
    }
}
