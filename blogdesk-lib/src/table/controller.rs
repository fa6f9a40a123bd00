//! Table state controller
//!
//! [`TableController`] owns a [`ViewState`] and exposes one transition per
//! user interaction. Each transition validates its input, updates the state
//! and re-derives the [`ListRequest`]. When the request changed, a refetch is
//! scheduled: the owner calls [`TableController::begin_fetch`], runs the
//! gateway calls, and hands the result back through
//! [`TableController::complete_fetch`]. Only the most recent ticket is
//! applied; anything older is reported as [`FetchOutcome::Stale`].

use std::collections::BTreeSet;

use super::ColumnDef;
use super::FilterValue;
use super::InitialState;
use super::PinSide;
use super::QueryCodec;
use super::QueryState;
use super::SortItem;
use super::TableSchema;
use super::ViewState;
use super::codec::KEY_PER_PAGE;
use super::state::DEFAULT_PAGE_SIZE;
use crate::error::ConfigError;
use crate::error::DecodeWarning;
use crate::error::Error;
use crate::error::GatewayError;
use crate::model::Row;
use crate::query::Direction;
use crate::query::Filter;
use crate::query::ListRequest;
use crate::query::ListResult;
use crate::query::OrderBy;
use crate::query::page_count;

/// Whether clicking a column replaces the sort or adds to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// At most one sorted column.
    #[default]
    Single,
    /// Several sorted columns in priority order, bounded by
    /// [`TableOptions::max_sort_entries`].
    Multi,
}

/// Controller configuration.
///
/// # Example
///
/// ```
/// use blogdesk_lib::table::{SortMode, TableOptions};
///
/// let options = TableOptions::default()
///     .with_page_size(20)
///     .with_sort_mode(SortMode::Multi)
///     .with_max_sort_entries(2);
/// assert_eq!(options.page_size, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    /// Default page size (must be at least 1).
    pub page_size: usize,
    /// Page sizes the user may pick. Empty allows any size.
    pub page_size_options: Vec<usize>,
    pub sort_mode: SortMode,
    /// Upper bound on sort entries in [`SortMode::Multi`].
    pub max_sort_entries: usize,
    /// Omit default-valued fields from the shareable state.
    pub clear_on_default: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: vec![10, 20, 30, 40, 50],
            sort_mode: SortMode::Single,
            max_sort_entries: 3,
            clear_on_default: true,
        }
    }
}

impl TableOptions {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_size_options(mut self, options: impl IntoIterator<Item = usize>) -> Self {
        self.page_size_options = options.into_iter().collect();
        self
    }

    pub fn with_sort_mode(mut self, sort_mode: SortMode) -> Self {
        self.sort_mode = sort_mode;
        self
    }

    pub fn with_max_sort_entries(mut self, max: usize) -> Self {
        self.max_sort_entries = max;
        self
    }

    pub fn with_clear_on_default(mut self, clear_on_default: bool) -> Self {
        self.clear_on_default = clear_on_default;
        self
    }

    fn sort_capacity(&self) -> usize {
        match self.sort_mode {
            SortMode::Single => 1,
            SortMode::Multi => self.max_sort_entries.max(1),
        }
    }

    fn check_page_size(&self, size: usize) -> Result<(), ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if !self.page_size_options.is_empty() && !self.page_size_options.contains(&size) {
            return Err(ConfigError::PageSizeNotAllowed {
                size,
                allowed: self.page_size_options.clone(),
            });
        }
        Ok(())
    }
}

/// A scheduled fetch. Hand it back to [`TableController::complete_fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    seq: u64,
    request: ListRequest,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The request the gateway should answer.
    pub fn request(&self) -> &ListRequest {
        &self.request
    }
}

/// What [`TableController::complete_fetch`] did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The rows and count were applied.
    Applied,
    /// A newer request superseded this one; the response was discarded.
    Stale,
}

/// A column as displayed, with its pin side and sort direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewColumn<'a> {
    pub def: &'a ColumnDef,
    pub pinned: Option<PinSide>,
    pub sort: Option<Direction>,
}

/// Everything a presentation layer needs to draw the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'a, R> {
    /// Visible columns: left-pinned, then unpinned in schema order, then right-pinned.
    pub columns: Vec<ViewColumn<'a>>,
    pub rows: &'a [R],
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total_count: Option<u64>,
    pub can_previous_page: bool,
    pub can_next_page: bool,
    pub all_page_rows_selected: bool,
    pub some_page_rows_selected: bool,
}

/// State controller for one table instance.
#[derive(Debug, Clone)]
pub struct TableController<R> {
    schema: TableSchema,
    options: TableOptions,
    codec: QueryCodec,
    state: ViewState,
    warnings: Vec<DecodeWarning>,
    rows: Vec<R>,
    total_count: Option<u64>,
    active_request: ListRequest,
    /// Request of the most recent ticket.
    requested: Option<ListRequest>,
    invalidated: bool,
    latest_seq: u64,
}

impl<R: Row> TableController<R> {
    /// Creates a controller.
    ///
    /// The starting state is the defaults, overlaid by `initial`, overlaid
    /// by the decoded `shared` state. Problems in `initial` or `options` are
    /// errors; problems in `shared` only produce [`DecodeWarning`]s.
    pub fn new(
        schema: TableSchema,
        initial: InitialState,
        options: TableOptions,
        shared: Option<&QueryState>,
    ) -> Result<Self, Error> {
        let mut defaults = ViewState::new(options.page_size);
        initial.apply(&mut defaults);
        options.check_page_size(defaults.page_size)?;
        validate_state(&schema, &options, &defaults)?;

        let codec = QueryCodec::new(defaults.clone()).with_clear_on_default(options.clear_on_default);
        let (mut state, mut warnings) = match shared {
            Some(query) => {
                let decoded = codec.decode(query, &schema);
                (decoded.state, decoded.warnings)
            }
            None => (defaults.clone(), Vec::new()),
        };

        if options.check_page_size(state.page_size).is_err() {
            let warning = DecodeWarning::Malformed {
                key: KEY_PER_PAGE.to_string(),
                value: state.page_size.to_string(),
            };
            log::warn!("Dropped shareable table state: {}", warning);
            warnings.push(warning);
            state.page_size = defaults.page_size;
        }
        let capacity = options.sort_capacity();
        if state.sort.len() > capacity {
            log::debug!("Truncating {} sort entries to {}", state.sort.len(), capacity);
            state.sort.truncate(capacity);
        }

        let active_request = derive_request(&schema, &state);
        Ok(Self {
            schema,
            options,
            codec,
            state,
            warnings,
            rows: Vec::new(),
            total_count: None,
            active_request,
            requested: None,
            invalidated: false,
            latest_seq: 0,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Warnings produced while decoding the shared state.
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    /// Rows of the most recently applied page.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Total matching rows, once a fetch has been applied.
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    // Sorting

    /// Sets the direction of a column, or removes it with `None`.
    ///
    /// In single mode a direction replaces any other sorted column. In multi
    /// mode an already sorted column keeps its priority, a new one is
    /// appended. Applying the same call twice has no further effect.
    pub fn set_sort(&mut self, column: &str, direction: Option<Direction>) -> Result<(), Error> {
        self.schema.sortable_column(column)?;
        match direction {
            None => self.state.sort.retain(|s| s.column != column),
            Some(direction) => match self.options.sort_mode {
                SortMode::Single => self.state.sort = vec![SortItem::new(column, direction)],
                SortMode::Multi => {
                    if let Some(item) = self.state.sort.iter_mut().find(|s| s.column == column) {
                        item.descending = direction.is_desc();
                    } else if self.state.sort.len() >= self.options.sort_capacity() {
                        return Err(ConfigError::TooManySortEntries {
                            max: self.options.sort_capacity(),
                        }
                        .into());
                    } else {
                        self.state.sort.push(SortItem::new(column, direction));
                    }
                }
            },
        }
        self.touch();
        Ok(())
    }

    /// Cycles a column through ascending, descending and unsorted.
    pub fn toggle_sort(&mut self, column: &str) -> Result<(), Error> {
        let next = match self.state.sort_of(column).map(SortItem::direction) {
            None => Some(Direction::Asc),
            Some(Direction::Asc) => Some(Direction::Desc),
            Some(Direction::Desc) => None,
        };
        self.set_sort(column, next)
    }

    pub fn clear_sort(&mut self) {
        self.state.sort.clear();
        self.touch();
    }

    // Filtering

    /// Sets the filter of a column; an empty value removes it.
    ///
    /// Changing a filter returns to the first page.
    pub fn set_filter(&mut self, column: &str, value: FilterValue) -> Result<(), Error> {
        let field = self
            .schema
            .filter_field(column)
            .ok_or_else(|| ConfigError::NotFilterable(column.to_string()))?;

        let changed = if value.is_empty() {
            self.state.filters.remove(column).is_some()
        } else {
            field.validate(&value)?;
            self.state.filters.insert(column.to_string(), value.clone()) != Some(value)
        };
        if changed {
            self.state.page_index = 0;
            self.touch();
        }
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        if !self.state.filters.is_empty() {
            self.state.filters.clear();
            self.state.page_index = 0;
            self.touch();
        }
    }

    // Pagination

    /// Number of pages for the last known total; 0 when the total is 0 or unknown.
    pub fn page_count(&self) -> usize {
        self.total_count
            .map(|total| page_count(total, self.state.page_size))
            .unwrap_or(0)
    }

    /// Moves to a page, clamped to `[0, max(0, page_count - 1)]`.
    pub fn set_page(&mut self, index: i64) {
        let last = self.page_count().saturating_sub(1);
        let index = if index <= 0 {
            0
        } else {
            usize::try_from(index).unwrap_or(usize::MAX).min(last)
        };
        if index != self.state.page_index {
            self.state.page_index = index;
            self.touch();
        }
    }

    pub fn can_previous_page(&self) -> bool {
        self.state.page_index > 0
    }

    pub fn can_next_page(&self) -> bool {
        self.state.page_index + 1 < self.page_count()
    }

    pub fn next_page(&mut self) {
        if self.can_next_page() {
            self.state.page_index += 1;
            self.touch();
        }
    }

    pub fn previous_page(&mut self) {
        if self.can_previous_page() {
            self.state.page_index -= 1;
            self.touch();
        }
    }

    /// Changes the page size, keeping the first visible row on screen.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), Error> {
        self.options.check_page_size(page_size)?;
        if page_size == self.state.page_size {
            return Ok(());
        }
        let offset = self.state.pagination().offset();
        self.state.page_size = page_size;
        self.state.page_index = offset / page_size;
        self.clamp_page();
        self.touch();
        Ok(())
    }

    // Visibility and pinning

    /// Shows or hides a column. Only hideable columns can be hidden.
    pub fn set_column_visibility(&mut self, column: &str, visible: bool) -> Result<(), Error> {
        if visible {
            self.column(column)?;
        } else {
            self.schema.hideable_column(column)?;
        }
        self.state.visibility.insert(column.to_string(), visible);
        Ok(())
    }

    /// Pins a column to a side, or unpins it with `None`.
    pub fn pin_column(&mut self, column: &str, side: Option<PinSide>) -> Result<(), Error> {
        self.column(column)?;
        self.state.pinning.pin(column, side);
        Ok(())
    }

    // Selection

    /// Replaces the selection.
    pub fn set_row_selection(&mut self, ids: impl IntoIterator<Item = impl Into<String>>) {
        self.state.selection = ids.into_iter().map(Into::into).collect();
    }

    pub fn toggle_row(&mut self, id: &str, selected: bool) {
        if selected {
            self.state.selection.insert(id.to_string());
        } else {
            self.state.selection.remove(id);
        }
    }

    /// Selects or deselects every row of the loaded page.
    ///
    /// Rows on other pages are not touched: selecting the whole remote result
    /// set would require loading it.
    pub fn toggle_all(&mut self, selected: bool) {
        for row in &self.rows {
            if selected {
                self.state.selection.insert(row.id().to_string());
            } else {
                self.state.selection.remove(row.id());
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.state.selection.clear();
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.state.selection
    }

    pub fn is_all_page_rows_selected(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| self.state.selection.contains(r.id()))
    }

    pub fn is_some_page_rows_selected(&self) -> bool {
        !self.is_all_page_rows_selected() && self.rows.iter().any(|r| self.state.selection.contains(r.id()))
    }

    // Derived values

    /// The gateway request for the current state.
    pub fn request(&self) -> ListRequest {
        derive_request(&self.schema, &self.state)
    }

    /// The shareable form of the current state.
    pub fn query_state(&self) -> QueryState {
        self.codec.encode(&self.state)
    }

    pub fn view(&self) -> TableView<'_, R> {
        let state = &self.state;
        let pinned = |ids: &[String]| {
            ids.iter()
                .filter_map(|id| self.schema.column(id))
                .filter(|def| state.is_visible(&def.id))
                .map(|def| self.view_column(def))
                .collect::<Vec<_>>()
        };

        let mut columns = pinned(&state.pinning.left);
        columns.extend(
            self.schema
                .columns()
                .iter()
                .filter(|def| state.pinning.side_of(&def.id).is_none() && state.is_visible(&def.id))
                .map(|def| self.view_column(def)),
        );
        columns.extend(pinned(&state.pinning.right));

        TableView {
            columns,
            rows: &self.rows,
            page_index: state.page_index,
            page_size: state.page_size,
            page_count: self.page_count(),
            total_count: self.total_count,
            can_previous_page: self.can_previous_page(),
            can_next_page: self.can_next_page(),
            all_page_rows_selected: self.is_all_page_rows_selected(),
            some_page_rows_selected: self.is_some_page_rows_selected(),
        }
    }

    // Fetch protocol

    /// Returns `true` if the derived request differs from the last ticket's,
    /// or the table was invalidated since.
    pub fn needs_fetch(&self) -> bool {
        self.invalidated || self.requested.as_ref() != Some(&self.active_request)
    }

    /// Schedules a refetch of the current request even if it did not change,
    /// e.g. after a mutation.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Issues a ticket for the current request, if a fetch is scheduled.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if !self.needs_fetch() {
            return None;
        }
        self.invalidated = false;
        self.requested = Some(self.active_request.clone());
        self.latest_seq += 1;
        log::debug!("Beginning fetch #{}: {:?}", self.latest_seq, self.active_request);
        Some(FetchTicket {
            seq: self.latest_seq,
            request: self.active_request.clone(),
        })
    }

    /// Applies the gateway's answer to a ticket.
    ///
    /// Responses to superseded tickets, or to a request the state has since
    /// moved away from, are discarded. A gateway error on the current ticket
    /// is returned as is; the local state is left untouched.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<ListResult<R>, GatewayError>,
    ) -> Result<FetchOutcome, Error> {
        if ticket.seq != self.latest_seq || ticket.request != self.active_request {
            log::debug!(
                "Discarding stale fetch #{} (latest #{})",
                ticket.seq,
                self.latest_seq
            );
            return Ok(FetchOutcome::Stale);
        }

        let result = result?;
        log::debug!(
            "Fetch #{} returned {} of {} rows",
            ticket.seq,
            result.len(),
            result.total_count()
        );
        self.total_count = Some(result.total_count());
        self.rows = result.into_rows();
        self.clamp_page();
        self.touch();
        Ok(FetchOutcome::Applied)
    }

    fn view_column<'a>(&'a self, def: &'a ColumnDef) -> ViewColumn<'a> {
        ViewColumn {
            def,
            pinned: self.state.pinning.side_of(&def.id),
            sort: self.state.sort_of(&def.id).map(SortItem::direction),
        }
    }

    fn column(&self, id: &str) -> Result<&ColumnDef, ConfigError> {
        self.schema
            .column(id)
            .ok_or_else(|| ConfigError::UnknownColumn(id.to_string()))
    }

    fn clamp_page(&mut self) {
        if self.total_count.is_none() {
            return;
        }
        let last = self.page_count().saturating_sub(1);
        if self.state.page_index > last {
            log::debug!("Clamping page {} to {}", self.state.page_index, last);
            self.state.page_index = last;
        }
    }

    fn touch(&mut self) {
        let request = derive_request(&self.schema, &self.state);
        if request != self.active_request {
            log::debug!("Table request changed: {:?}", request);
            self.active_request = request;
        }
    }
}

fn derive_request(schema: &TableSchema, state: &ViewState) -> ListRequest {
    let filter = Filter::and(
        state
            .filters
            .iter()
            .filter_map(|(column, value)| schema.filter_field(column).map(|f| f.to_filter(value))),
    );
    let order = state
        .sort
        .iter()
        .fold(OrderBy::none(), |order, item| order.then(item.column.as_str(), item.direction()));
    ListRequest {
        filter,
        order,
        pagination: state.pagination(),
    }
}

fn validate_state(schema: &TableSchema, options: &TableOptions, state: &ViewState) -> Result<(), ConfigError> {
    if state.sort.len() > options.sort_capacity() {
        return Err(ConfigError::TooManySortEntries {
            max: options.sort_capacity(),
        });
    }
    for item in &state.sort {
        schema.sortable_column(&item.column)?;
    }
    for (column, value) in &state.filters {
        schema
            .filter_field(column)
            .ok_or_else(|| ConfigError::NotFilterable(column.clone()))?
            .validate(value)?;
    }
    for (column, visible) in &state.visibility {
        if *visible {
            schema
                .column(column)
                .ok_or_else(|| ConfigError::UnknownColumn(column.clone()))?;
        } else {
            schema.hideable_column(column)?;
        }
    }
    for column in state.pinning.left.iter().chain(&state.pinning.right) {
        schema
            .column(column)
            .ok_or_else(|| ConfigError::UnknownColumn(column.clone()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::table::ColumnPinning;
    use crate::table::FilterField;
    use crate::table::FilterOption;

    fn schema() -> TableSchema {
        TableSchema::new(
            vec![
                ColumnDef::control("select"),
                ColumnDef::new("title", "Title"),
                ColumnDef::new("status", "Status"),
                ColumnDef::new("created_at", "Created At"),
                ColumnDef::new("author", "Author"),
                ColumnDef::control("actions"),
            ],
            vec![
                FilterField::text("title", "Title"),
                FilterField::multi_select(
                    "status",
                    "Status",
                    [
                        FilterOption::new("Published", "PUBLISHED"),
                        FilterOption::new("Draft", "DRAFT"),
                    ],
                ),
            ],
        )
        .unwrap()
    }

    fn initial() -> InitialState {
        InitialState::new()
            .with_sort([SortItem::desc("created_at")])
            .with_pinning(ColumnPinning::right(["actions"]))
    }

    fn controller() -> TableController<Record> {
        TableController::new(schema(), initial(), TableOptions::default(), None).unwrap()
    }

    fn page(ids: &[&str], total: u64) -> ListResult<Record> {
        ListResult::new(ids.iter().map(|id| Record::new(*id)).collect(), total)
    }

    /// Runs one fetch cycle with the given answer.
    fn load(table: &mut TableController<Record>, ids: &[&str], total: u64) {
        table.invalidate();
        let ticket = table.begin_fetch().unwrap();
        assert_eq!(
            table.complete_fetch(ticket, Ok(page(ids, total))).unwrap(),
            FetchOutcome::Applied
        );
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = TableController::<Record>::new(
            schema(),
            InitialState::new().with_page_size(0),
            TableOptions::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ConfigError::ZeroPageSize)));

        let err = TableController::<Record>::new(
            schema(),
            InitialState::new(),
            TableOptions::default().with_page_size(0).with_page_size_options([]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ConfigError::ZeroPageSize)));
    }

    #[test]
    fn test_invalid_initial_sort_rejected() {
        let err = TableController::<Record>::new(
            schema(),
            InitialState::new().with_sort([SortItem::asc("actions")]),
            TableOptions::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfiguration(ConfigError::NotSortable(_))
        ));
    }

    #[test]
    fn test_shared_state_wins_over_initial() {
        let shared = QueryState::from_query_string("sort=title.asc&perPage=20&status=DRAFT&bogus=1");
        let table =
            TableController::<Record>::new(schema(), initial(), TableOptions::default(), Some(&shared)).unwrap();

        assert_eq!(table.state().sort, vec![SortItem::asc("title")]);
        assert_eq!(table.state().page_size, 20);
        assert_eq!(table.state().filters.get("status"), Some(&FilterValue::set(["DRAFT"])));
        assert_eq!(table.warnings(), &[DecodeWarning::UnknownKey("bogus".into())]);
        assert!(table.needs_fetch());
    }

    #[test]
    fn test_shared_page_size_must_be_allowed() {
        let shared = QueryState::from_query_string("perPage=7");
        let table =
            TableController::<Record>::new(schema(), initial(), TableOptions::default(), Some(&shared)).unwrap();
        assert_eq!(table.state().page_size, 10);
        assert_eq!(table.warnings().len(), 1);
    }

    #[test]
    fn test_set_page_clamps() {
        let mut table = controller();
        table.set_page(3);
        assert_eq!(table.state().page_index, 0, "no count yet");

        load(&mut table, &["a"], 95);
        assert_eq!(table.page_count(), 10);

        for (requested, expected) in [(-5, 0), (i64::MIN, 0), (3, 3), (9, 9), (10, 9), (i64::MAX, 9)] {
            table.set_page(requested);
            assert_eq!(table.state().page_index, expected, "set_page({})", requested);
        }
    }

    #[test]
    fn test_zero_total() {
        let mut table = controller();
        load(&mut table, &[], 0);
        assert_eq!(table.page_count(), 0);

        table.set_page(4);
        assert_eq!(table.state().page_index, 0);
        assert!(!table.can_next_page());
        assert!(!table.can_previous_page());
    }

    #[test]
    fn test_next_and_previous_page() {
        let mut table = controller();
        load(&mut table, &["a"], 25);

        table.next_page();
        table.next_page();
        table.next_page();
        assert_eq!(table.state().page_index, 2);
        assert!(!table.can_next_page());

        table.previous_page();
        assert_eq!(table.state().page_index, 1);
        assert_eq!(table.request().pagination.offset(), 10);
    }

    #[test]
    fn test_set_sort_idempotent() {
        let mut table = controller();
        table.set_sort("title", Some(Direction::Asc)).unwrap();
        let once = table.state().clone();
        table.set_sort("title", Some(Direction::Asc)).unwrap();
        assert_eq!(table.state(), &once);
        assert_eq!(once.sort, vec![SortItem::asc("title")]);

        table.set_sort("title", None).unwrap();
        table.set_sort("title", None).unwrap();
        assert!(table.state().sort.is_empty());
    }

    #[test]
    fn test_toggle_sort_cycles() {
        let mut table = controller();
        table.toggle_sort("title").unwrap();
        assert_eq!(table.state().sort, vec![SortItem::asc("title")]);
        table.toggle_sort("title").unwrap();
        assert_eq!(table.state().sort, vec![SortItem::desc("title")]);
        table.toggle_sort("title").unwrap();
        assert!(table.state().sort.is_empty());
    }

    #[test]
    fn test_sort_rejects_control_columns() {
        let mut table = controller();
        let err = table.set_sort("select", Some(Direction::Asc)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ConfigError::NotSortable(_))));
        let err = table.toggle_sort("nope").unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ConfigError::UnknownColumn(_))));
    }

    #[test]
    fn test_multi_sort() {
        let options = TableOptions::default()
            .with_sort_mode(SortMode::Multi)
            .with_max_sort_entries(2);
        let mut table = TableController::<Record>::new(schema(), initial(), options, None).unwrap();

        table.set_sort("title", Some(Direction::Asc)).unwrap();
        assert_eq!(
            table.state().sort,
            vec![SortItem::desc("created_at"), SortItem::asc("title")]
        );

        table.set_sort("created_at", Some(Direction::Asc)).unwrap();
        assert_eq!(
            table.state().sort,
            vec![SortItem::asc("created_at"), SortItem::asc("title")]
        );

        let err = table.set_sort("status", Some(Direction::Desc)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfiguration(ConfigError::TooManySortEntries { max: 2 })
        ));

        table.toggle_sort("created_at").unwrap();
        table.toggle_sort("created_at").unwrap();
        assert_eq!(table.state().sort, vec![SortItem::asc("title")]);
    }

    #[test]
    fn test_set_filter() {
        let mut table = controller();
        load(&mut table, &["a"], 100);
        table.set_page(5);

        table.set_filter("title", FilterValue::text("rust")).unwrap();
        assert_eq!(table.state().page_index, 0);
        assert_eq!(table.request().filter, Filter::and([Filter::contains("title", "rust")]));

        table.set_filter("title", FilterValue::text("")).unwrap();
        assert!(table.state().filters.is_empty());
        assert!(table.request().filter.is_all());
    }

    #[test]
    fn test_set_filter_validates() {
        let mut table = controller();
        let err = table.set_filter("status", FilterValue::set(["ARCHIVED"])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ConfigError::UnknownOption { .. })));

        let err = table.set_filter("author", FilterValue::text("x")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ConfigError::NotFilterable(_))));

        let err = table.set_filter("title", FilterValue::set(["x"])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfiguration(ConfigError::FilterKindMismatch { .. })
        ));
        assert!(table.state().filters.is_empty());
    }

    #[test]
    fn test_request_combines_filters_and_sort() {
        let mut table = controller();
        table.set_filter("title", FilterValue::text("rust")).unwrap();
        table.set_filter("status", FilterValue::set(["DRAFT"])).unwrap();

        let request = table.request();
        assert_eq!(
            request.filter,
            Filter::and([
                Filter::is_in("status", ["DRAFT"]),
                Filter::contains("title", "rust"),
            ])
        );
        assert_eq!(request.order, OrderBy::desc("created_at"));
        assert_eq!(request.pagination.limit(), 10);
    }

    #[test]
    fn test_set_page_size_keeps_first_row() {
        let mut table = controller();
        load(&mut table, &["a"], 100);
        table.set_page(3);

        table.set_page_size(20).unwrap();
        assert_eq!(table.state().page_index, 1);
        assert_eq!(table.state().page_size, 20);

        let err = table.set_page_size(0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ConfigError::ZeroPageSize)));
        let err = table.set_page_size(15).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfiguration(ConfigError::PageSizeNotAllowed { size: 15, .. })
        ));
        assert_eq!(table.state().page_size, 20);
    }

    #[test]
    fn test_toggle_all_is_page_local() {
        let mut table = controller();
        table.toggle_row("elsewhere", true);
        load(&mut table, &["a", "b", "c"], 30);

        table.toggle_row("a", true);
        assert!(table.is_some_page_rows_selected());
        assert!(!table.is_all_page_rows_selected());

        table.toggle_all(true);
        assert!(table.is_all_page_rows_selected());
        assert_eq!(table.selection().len(), 4);

        table.toggle_all(false);
        assert_eq!(table.selection().iter().collect::<Vec<_>>(), vec!["elsewhere"]);
    }

    #[test]
    fn test_toggle_all_twice_empties_selection() {
        for ids in [&[][..], &["a"][..], &["a", "b", "c"][..]] {
            let mut table = controller();
            load(&mut table, ids, 3);
            table.toggle_all(true);
            table.toggle_all(false);
            assert!(table.selection().is_empty());
        }
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut table = controller();
        let first = table.begin_fetch().unwrap();

        table.set_filter("title", FilterValue::text("rust")).unwrap();
        let second = table.begin_fetch().unwrap();

        assert_eq!(
            table.complete_fetch(first, Ok(page(&["old"], 1))).unwrap(),
            FetchOutcome::Stale
        );
        assert!(table.rows().is_empty());

        assert_eq!(
            table.complete_fetch(second, Ok(page(&["new"], 1))).unwrap(),
            FetchOutcome::Applied
        );
        assert_eq!(table.rows()[0].id(), "new");
    }

    #[test]
    fn test_response_to_outdated_request_discarded() {
        let mut table = controller();
        let ticket = table.begin_fetch().unwrap();
        table.set_sort("title", Some(Direction::Asc)).unwrap();

        assert_eq!(
            table.complete_fetch(ticket, Ok(page(&["a"], 1))).unwrap(),
            FetchOutcome::Stale
        );
        assert!(table.needs_fetch());
    }

    #[test]
    fn test_returning_to_in_flight_request_needs_no_refetch() {
        let mut table = controller();
        let ticket = table.begin_fetch().unwrap();
        table.set_filter("title", FilterValue::text("x")).unwrap();
        assert!(table.needs_fetch());
        table.set_filter("title", FilterValue::text("")).unwrap();
        assert!(!table.needs_fetch());

        assert_eq!(
            table.complete_fetch(ticket, Ok(page(&["a"], 1))).unwrap(),
            FetchOutcome::Applied
        );
        assert!(!table.needs_fetch());
        assert!(table.begin_fetch().is_none());
    }

    #[test]
    fn test_invalidate_during_fetch_survives_completion() {
        let mut table = controller();
        let ticket = table.begin_fetch().unwrap();
        table.invalidate();

        table.complete_fetch(ticket, Ok(page(&["a"], 1))).unwrap();
        assert!(table.needs_fetch());
        assert!(table.begin_fetch().is_some());
    }

    #[test]
    fn test_gateway_error_keeps_state() {
        let mut table = controller();
        table.set_filter("title", FilterValue::text("rust")).unwrap();
        let before = table.state().clone();

        let ticket = table.begin_fetch().unwrap();
        let err = table
            .complete_fetch(ticket, Err(GatewayError::unavailable("offline")))
            .unwrap_err();
        assert!(err.is_gateway());
        assert_eq!(table.state(), &before);
        assert_eq!(table.total_count(), None);
    }

    #[test]
    fn test_shrinking_count_reclamps() {
        let mut table = controller();
        load(&mut table, &["a"], 100);
        table.set_page(8);
        let ticket = table.begin_fetch().unwrap();

        table.complete_fetch(ticket, Ok(page(&[], 25))).unwrap();
        assert_eq!(table.state().page_index, 2);
        assert!(table.needs_fetch());
        assert_eq!(table.begin_fetch().unwrap().request().pagination.offset(), 20);
    }

    #[test]
    fn test_only_request_changes_schedule_fetch() {
        let mut table = controller();
        table.begin_fetch().unwrap();

        table.toggle_row("a", true);
        table.set_column_visibility("author", false).unwrap();
        table.pin_column("title", Some(PinSide::Left)).unwrap();
        table.set_sort("created_at", Some(Direction::Desc)).unwrap();
        assert!(table.begin_fetch().is_none());

        table.set_sort("title", Some(Direction::Desc)).unwrap();
        assert!(table.begin_fetch().is_some());
    }

    #[test]
    fn test_visibility_rules() {
        let mut table = controller();
        let err = table.set_column_visibility("select", false).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ConfigError::NotHideable(_))));
        table.set_column_visibility("author", false).unwrap();
        assert!(!table.state().is_visible("author"));
        table.set_column_visibility("author", true).unwrap();
        assert!(table.state().is_visible("author"));
    }

    #[test]
    fn test_view_column_order() {
        let mut table = controller();
        table.pin_column("title", Some(PinSide::Left)).unwrap();
        table.set_column_visibility("author", false).unwrap();
        load(&mut table, &["a", "b"], 12);

        let view = table.view();
        let ids = view.columns.iter().map(|c| c.def.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["title", "select", "status", "created_at", "actions"]);
        assert_eq!(view.columns[0].pinned, Some(PinSide::Left));
        assert_eq!(view.columns[3].sort, Some(Direction::Desc));
        assert_eq!(view.page_count, 2);
        assert!(view.can_next_page);
        assert_eq!(view.rows.len(), 2);
    }

    #[test]
    fn test_query_state_reflects_changes() {
        let mut table = controller();
        assert!(table.query_state().is_empty());

        table.set_filter("status", FilterValue::set(["PUBLISHED"])).unwrap();
        table.clear_sort();
        assert_eq!(table.query_state().to_query_string(), "sort=&status=PUBLISHED");
    }
}
