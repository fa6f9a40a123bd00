//! Shareable query-state codec
//!
//! A [`ViewState`] is shared as a flat map of string keys to one or more
//! string values, small enough to live in a link:
//!
//! | Key | Value |
//! |-----|-------|
//! | `page` | 1-based page number |
//! | `perPage` | page size |
//! | `sort` | `column.asc` / `column.desc`, in priority order |
//! | `hide` / `show` | columns with explicit visibility |
//! | `pinLeft` / `pinRight` | pinned columns, in display order |
//! | `select` | selected row ids |
//! | *filter field id* | text, or the selected options |
//!
//! List-valued keys encode an empty list as an empty string, so clearing a
//! non-empty default survives `clear_on_default`.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::FilterField;
use super::FilterKind;
use super::FilterValue;
use super::SortItem;
use super::TableSchema;
use super::ViewState;
use crate::error::DecodeWarning;
use crate::query::Direction;

pub const KEY_PAGE: &str = "page";
pub const KEY_PER_PAGE: &str = "perPage";
pub const KEY_SORT: &str = "sort";
pub const KEY_HIDE: &str = "hide";
pub const KEY_SHOW: &str = "show";
pub const KEY_PIN_LEFT: &str = "pinLeft";
pub const KEY_PIN_RIGHT: &str = "pinRight";
pub const KEY_SELECT: &str = "select";

/// Keys owned by the codec; filter fields may not use them.
pub const RESERVED_KEYS: [&str; 8] = [
    KEY_PAGE,
    KEY_PER_PAGE,
    KEY_SORT,
    KEY_HIDE,
    KEY_SHOW,
    KEY_PIN_LEFT,
    KEY_PIN_RIGHT,
    KEY_SELECT,
];

/// A value in the shareable map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryValue {
    Single(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// The value read as a list. Empty strings are dropped, so `Single("")`
    /// is the empty list.
    pub fn items(&self) -> Vec<&str> {
        match self {
            QueryValue::Single(s) if s.is_empty() => Vec::new(),
            QueryValue::Single(s) => vec![s.as_str()],
            QueryValue::Many(values) => values
                .iter()
                .map(String::as_str)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// The value read as a scalar; a list of exactly one item also counts.
    pub fn single(&self) -> Option<&str> {
        match self {
            QueryValue::Single(s) => Some(s.as_str()),
            QueryValue::Many(values) if values.len() == 1 => Some(values[0].as_str()),
            QueryValue::Many(_) => None,
        }
    }

    fn raw(&self) -> String {
        match self {
            QueryValue::Single(s) => s.clone(),
            QueryValue::Many(values) => values.join(","),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Single(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Single(v)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(v: Vec<String>) -> Self {
        QueryValue::Many(v)
    }
}

/// The shareable representation of a view: a flat, ordered key/value map.
///
/// # Example
///
/// ```
/// use blogdesk_lib::table::{QueryState, QueryValue};
///
/// let query = QueryState::from_query_string("?page=2&status=DRAFT&status=PUBLISHED");
/// assert_eq!(query.get("page"), Some(&QueryValue::Single("2".into())));
/// assert_eq!(query.to_query_string(), "page=2&status=DRAFT&status=PUBLISHED");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    entries: BTreeMap<String, QueryValue>,
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses an `application/x-www-form-urlencoded` string (leading `?` allowed).
    ///
    /// Keys that repeat become [`QueryValue::Many`].
    pub fn from_query_string(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        let mut entries: BTreeMap<String, QueryValue> = BTreeMap::new();
        for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
            let value = value.into_owned();
            match entries.remove(key.as_ref()) {
                None => {
                    entries.insert(key.into_owned(), QueryValue::Single(value));
                }
                Some(QueryValue::Single(first)) => {
                    entries.insert(key.into_owned(), QueryValue::Many(vec![first, value]));
                }
                Some(QueryValue::Many(mut values)) => {
                    values.push(value);
                    entries.insert(key.into_owned(), QueryValue::Many(values));
                }
            }
        }
        Self { entries }
    }

    /// Serializes to an `application/x-www-form-urlencoded` string.
    ///
    /// Lists repeat their key; an empty list is written as `key=`.
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            match value {
                QueryValue::Single(s) => {
                    serializer.append_pair(key, s);
                }
                QueryValue::Many(values) if values.is_empty() => {
                    serializer.append_pair(key, "");
                }
                QueryValue::Many(values) => {
                    for v in values {
                        serializer.append_pair(key, v);
                    }
                }
            }
        }
        serializer.finish()
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Result of decoding a shareable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub state: ViewState,
    /// Entries that were dropped. Never fatal.
    pub warnings: Vec<DecodeWarning>,
}

/// Converts between [`ViewState`] and [`QueryState`] relative to a table's defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCodec {
    defaults: ViewState,
    clear_on_default: bool,
}

impl QueryCodec {
    /// Creates a codec that omits default-valued fields.
    pub fn new(defaults: ViewState) -> Self {
        Self {
            defaults,
            clear_on_default: true,
        }
    }

    /// When `false`, every field is encoded even if it equals its default.
    pub fn with_clear_on_default(mut self, clear_on_default: bool) -> Self {
        self.clear_on_default = clear_on_default;
        self
    }

    pub fn defaults(&self) -> &ViewState {
        &self.defaults
    }

    /// Encodes a state.
    pub fn encode(&self, state: &ViewState) -> QueryState {
        let defaults = &self.defaults;
        let keep = |is_default: bool| !(self.clear_on_default && is_default);
        let mut query = QueryState::new();

        if keep(state.page_index == defaults.page_index) {
            query.insert(KEY_PAGE, (state.page_index + 1).to_string());
        }
        if keep(state.page_size == defaults.page_size) {
            query.insert(KEY_PER_PAGE, state.page_size.to_string());
        }
        if keep(state.sort == defaults.sort) {
            let items = state
                .sort
                .iter()
                .map(|s| format!("{}.{}", s.column, s.direction()))
                .collect::<Vec<_>>();
            query.insert(KEY_SORT, items);
        }

        for (column, value) in &state.filters {
            if keep(defaults.filters.get(column) == Some(value)) {
                let encoded = match value {
                    FilterValue::Text(s) => QueryValue::Single(s.clone()),
                    FilterValue::Set(values) => QueryValue::Many(values.iter().cloned().collect()),
                };
                query.insert(column.as_str(), encoded);
            }
        }
        for column in defaults.filters.keys() {
            if !state.filters.contains_key(column) {
                query.insert(column.as_str(), "");
            }
        }

        if keep(state.visibility == defaults.visibility) {
            let ids_where = |visible: bool| {
                state
                    .visibility
                    .iter()
                    .filter(|(_, v)| **v == visible)
                    .map(|(k, _)| k.clone())
                    .collect::<Vec<_>>()
            };
            query.insert(KEY_HIDE, ids_where(false));
            query.insert(KEY_SHOW, ids_where(true));
        }
        if keep(state.pinning.left == defaults.pinning.left) {
            query.insert(KEY_PIN_LEFT, state.pinning.left.clone());
        }
        if keep(state.pinning.right == defaults.pinning.right) {
            query.insert(KEY_PIN_RIGHT, state.pinning.right.clone());
        }
        if keep(state.selection == defaults.selection) {
            query.insert(KEY_SELECT, state.selection.iter().cloned().collect::<Vec<_>>());
        }

        query
    }

    /// Decodes a shareable state against a schema.
    ///
    /// Never fails: anything unknown or malformed is dropped with a warning and
    /// the field keeps its default.
    pub fn decode(&self, query: &QueryState, schema: &TableSchema) -> Decoded {
        let mut state = self.defaults.clone();
        let mut warnings = Vec::new();

        for (key, value) in query.iter() {
            match key.as_str() {
                KEY_PAGE => match parse_positive(value) {
                    Some(page) => state.page_index = page - 1,
                    None => warnings.push(malformed(key, value)),
                },
                KEY_PER_PAGE => match parse_positive(value) {
                    Some(size) => state.page_size = size,
                    None => warnings.push(malformed(key, value)),
                },
                KEY_SORT => {
                    if let Some(sort) = decode_sort(key, value, schema, &mut warnings) {
                        state.sort = sort;
                    }
                }
                KEY_SELECT => {
                    state.selection = value.items().into_iter().map(str::to_string).collect();
                }
                KEY_HIDE | KEY_SHOW | KEY_PIN_LEFT | KEY_PIN_RIGHT => {}
                other => match schema.filter_field(other) {
                    Some(field) => match decode_filter(field, value, &mut warnings) {
                        Some(filter) if filter.is_empty() => {
                            state.filters.remove(other);
                        }
                        Some(filter) => {
                            state.filters.insert(other.to_string(), filter);
                        }
                        None => {}
                    },
                    None => warnings.push(DecodeWarning::UnknownKey(other.to_string())),
                },
            }
        }

        if query.contains_key(KEY_HIDE) || query.contains_key(KEY_SHOW) {
            let mut visibility = BTreeMap::new();
            for (key, visible) in [(KEY_HIDE, false), (KEY_SHOW, true)] {
                let Some(value) = query.get(key) else { continue };
                for column in value.items() {
                    let valid = if visible {
                        schema.column(column).is_some()
                    } else {
                        schema.hideable_column(column).is_ok()
                    };
                    if valid {
                        visibility.insert(column.to_string(), visible);
                    } else {
                        warnings.push(invalid_column(key, column));
                    }
                }
            }
            state.visibility = visibility;
        }

        if let Some(value) = query.get(KEY_PIN_LEFT) {
            state.pinning.left = decode_columns(KEY_PIN_LEFT, value, schema, &[], &mut warnings);
            state.pinning.right.retain(|c| !state.pinning.left.contains(c));
        }
        if let Some(value) = query.get(KEY_PIN_RIGHT) {
            let left = state.pinning.left.clone();
            state.pinning.right = decode_columns(KEY_PIN_RIGHT, value, schema, &left, &mut warnings);
        }

        for warning in &warnings {
            log::warn!("Dropped shareable table state: {}", warning);
        }

        Decoded { state, warnings }
    }
}

fn parse_positive(value: &QueryValue) -> Option<usize> {
    value
        .single()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
}

fn malformed(key: &str, value: &QueryValue) -> DecodeWarning {
    DecodeWarning::Malformed {
        key: key.to_string(),
        value: value.raw(),
    }
}

fn invalid_column(key: &str, column: &str) -> DecodeWarning {
    DecodeWarning::InvalidColumn {
        key: key.to_string(),
        column: column.to_string(),
    }
}

/// Returns `None` when entries were given but none survived, so the default stays.
fn decode_sort(
    key: &str,
    value: &QueryValue,
    schema: &TableSchema,
    warnings: &mut Vec<DecodeWarning>,
) -> Option<Vec<SortItem>> {
    let items = value.items();
    let mut sort: Vec<SortItem> = Vec::with_capacity(items.len());
    for item in &items {
        let Some((column, direction)) = item
            .rsplit_once('.')
            .and_then(|(c, d)| d.parse::<Direction>().ok().map(|d| (c, d)))
        else {
            warnings.push(DecodeWarning::Malformed {
                key: key.to_string(),
                value: item.to_string(),
            });
            continue;
        };
        if schema.sortable_column(column).is_err() {
            warnings.push(invalid_column(key, column));
            continue;
        }
        if sort.iter().any(|s| s.column == column) {
            continue;
        }
        sort.push(SortItem::new(column, direction));
    }
    if sort.is_empty() && !items.is_empty() {
        return None;
    }
    Some(sort)
}

/// Returns `None` when the value is unusable, so the default stays.
fn decode_filter(
    field: &FilterField,
    value: &QueryValue,
    warnings: &mut Vec<DecodeWarning>,
) -> Option<FilterValue> {
    match &field.kind {
        FilterKind::Text { .. } => match value.single() {
            Some(text) => Some(FilterValue::text(text)),
            None => {
                warnings.push(malformed(&field.id, value));
                None
            }
        },
        FilterKind::MultiSelect { .. } => {
            let items = value.items();
            let mut set = BTreeSet::new();
            for item in &items {
                if field.has_option(item) {
                    set.insert(item.to_string());
                } else {
                    warnings.push(DecodeWarning::UnknownOption {
                        key: field.id.clone(),
                        value: item.to_string(),
                    });
                }
            }
            if set.is_empty() && !items.is_empty() {
                return None;
            }
            Some(FilterValue::Set(set))
        }
    }
}

fn decode_columns(
    key: &str,
    value: &QueryValue,
    schema: &TableSchema,
    taken: &[String],
    warnings: &mut Vec<DecodeWarning>,
) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for column in value.items() {
        if schema.column(column).is_none() {
            warnings.push(invalid_column(key, column));
        } else if !taken.iter().any(|c| c == column) && !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }
    columns
}
