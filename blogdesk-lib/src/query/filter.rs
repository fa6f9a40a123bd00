//! Filter conditions.

use crate::model::Row;
use crate::model::Value;

/// A filter condition over row columns.
///
/// Filters are built by the table controller from the active column filters
/// and handed to the gateway, which either compiles them to SQL
/// ([`sql::filter_to_sql`](super::sql::filter_to_sql)) or evaluates them
/// directly against rows ([`Filter::matches`]).
///
/// # Example
///
/// ```
/// use blogdesk_lib::query::Filter;
///
/// let filter = Filter::and([
///     Filter::contains("title", "rust"),
///     Filter::is_in("status", ["DRAFT", "PUBLISHED"]),
/// ]);
///
/// let filter = Filter::eq("author_id", "m1")
///     .and_also(Filter::is_not_null("organization_id"));
/// # let _ = filter;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Equality: `field = value`
    Eq(String, Value),
    /// Not equal: `field <> value`
    Ne(String, Value),
    /// Case-insensitive substring containment.
    Contains(String, String),
    /// Membership: `field IN (values)`
    In(String, Vec<Value>),
    /// Is null.
    IsNull(String),
    /// Is not null.
    IsNotNull(String),
    /// Logical AND of multiple filters. Empty matches everything.
    And(Vec<Filter>),
    /// Logical OR of multiple filters. Empty matches nothing.
    Or(Vec<Filter>),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::all()
    }
}

impl Filter {
    /// A filter that matches every row.
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    /// Creates an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// Creates a not-equal filter.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    /// Creates a case-insensitive contains filter.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains(field.into(), value.into())
    }

    /// Creates a membership filter.
    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Creates an is-null filter.
    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::IsNull(field.into())
    }

    /// Creates an is-not-null filter.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Filter::IsNotNull(field.into())
    }

    /// Creates a logical AND of multiple filters.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Creates a logical OR of multiple filters.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Combines this filter with another using logical AND.
    pub fn and_also(self, other: Filter) -> Self {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            _ => Filter::And(vec![self, other]),
        }
    }

    /// Combines this filter with another using logical OR.
    pub fn or_else(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut filters) => {
                filters.push(other);
                Filter::Or(filters)
            }
            _ => Filter::Or(vec![self, other]),
        }
    }

    /// Returns `true` if this filter matches every row.
    pub fn is_all(&self) -> bool {
        matches!(self, Filter::And(filters) if filters.is_empty())
    }

    /// Evaluates the filter against a row.
    ///
    /// A missing column behaves like null.
    pub fn matches<R: Row>(&self, row: &R) -> bool {
        match self {
            Filter::Eq(field, value) => match value {
                Value::Null => is_null(row, field),
                _ => row.value(field).as_ref() == Some(value),
            },
            Filter::Ne(field, value) => match value {
                Value::Null => !is_null(row, field),
                _ => row.value(field).is_some_and(|v| !v.is_null() && &v != value),
            },
            Filter::Contains(field, needle) => row
                .value(field)
                .and_then(|v| v.to_text())
                .is_some_and(|text| contains_ignore_case(&text, needle)),
            Filter::In(field, values) => match row.value(field) {
                Some(Value::List(items)) => items
                    .iter()
                    .any(|item| values.iter().any(|v| v.as_text() == Some(item.as_str()))),
                Some(value) if !value.is_null() => values.contains(&value),
                _ => false,
            },
            Filter::IsNull(field) => is_null(row, field),
            Filter::IsNotNull(field) => !is_null(row, field),
            Filter::And(filters) => filters.iter().all(|f| f.matches(row)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(row)),
        }
    }
}

fn is_null<R: Row>(row: &R, field: &str) -> bool {
    row.value(field).is_none_or(|v| v.is_null())
}

/// Case-insensitive substring test.
///
/// An empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
