//! Filterable column descriptions and their predicates

use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::query::Filter;
use crate::query::contains_ignore_case;

/// One choice of a multiselect filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
    /// Icon name for the presentation layer.
    pub icon: Option<String>,
}

impl FilterOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// How a column is filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKind {
    /// Free text, matched by case-insensitive containment.
    Text { placeholder: Option<String> },
    /// A set of allowed values, matched by membership.
    MultiSelect { options: Vec<FilterOption> },
}

/// A filter value set on a column. Empty values mean "no filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Set(BTreeSet<String>),
}

impl FilterValue {
    pub fn text(value: impl Into<String>) -> Self {
        FilterValue::Text(value.into())
    }

    pub fn set(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        FilterValue::Set(values.into_iter().map(Into::into).collect())
    }

    /// Returns `true` for an empty string or an empty set.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::Set(values) => values.is_empty(),
        }
    }

    /// Tests a row value against this filter value.
    ///
    /// Text matches by case-insensitive substring containment, sets by
    /// membership. An empty filter value matches everything.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            FilterValue::Text(needle) => contains_ignore_case(value, needle),
            FilterValue::Set(values) => values.is_empty() || values.contains(value),
        }
    }
}

/// Describes how one column can be filtered.
///
/// # Example
///
/// ```
/// use blogdesk_lib::table::{FilterField, FilterOption, FilterValue};
///
/// let title = FilterField::text("title", "Title");
/// assert!(title.matches("Hello World", &FilterValue::text("world")));
///
/// let status = FilterField::multi_select(
///     "status",
///     "Status",
///     [FilterOption::new("Draft", "DRAFT"), FilterOption::new("Published", "PUBLISHED")],
/// );
/// assert!(!status.matches("DRAFT", &FilterValue::set(["PUBLISHED"])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    pub id: String,
    pub label: String,
    pub kind: FilterKind,
}

impl FilterField {
    pub fn text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: FilterKind::Text { placeholder: None },
        }
    }

    pub fn multi_select(
        id: impl Into<String>,
        label: impl Into<String>,
        options: impl IntoIterator<Item = FilterOption>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: FilterKind::MultiSelect {
                options: options.into_iter().collect(),
            },
        }
    }

    /// Sets the input placeholder of a text filter. No effect on multiselect.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        if let FilterKind::Text { placeholder: slot } = &mut self.kind {
            *slot = Some(placeholder.into());
        }
        self
    }

    /// Options of a multiselect filter; empty for text.
    pub fn options(&self) -> &[FilterOption] {
        match &self.kind {
            FilterKind::Text { .. } => &[],
            FilterKind::MultiSelect { options } => options,
        }
    }

    pub fn is_multi_select(&self) -> bool {
        matches!(self.kind, FilterKind::MultiSelect { .. })
    }

    /// Returns `true` if `value` is one of the multiselect options.
    pub fn has_option(&self, value: &str) -> bool {
        self.options().iter().any(|o| o.value == value)
    }

    /// Checks that a value has the right kind and only uses known options.
    pub fn validate(&self, value: &FilterValue) -> Result<(), ConfigError> {
        match (&self.kind, value) {
            (FilterKind::Text { .. }, FilterValue::Text(_)) => Ok(()),
            (FilterKind::MultiSelect { .. }, FilterValue::Set(values)) => {
                match values.iter().find(|v| !self.has_option(v)) {
                    Some(unknown) => Err(ConfigError::UnknownOption {
                        field: self.id.clone(),
                        value: unknown.clone(),
                    }),
                    None => Ok(()),
                }
            }
            (FilterKind::Text { .. }, _) => Err(ConfigError::FilterKindMismatch {
                field: self.id.clone(),
                expected: "text",
            }),
            (FilterKind::MultiSelect { .. }, _) => Err(ConfigError::FilterKindMismatch {
                field: self.id.clone(),
                expected: "multiselect",
            }),
        }
    }

    /// Client-side predicate: does a row value pass this filter?
    ///
    /// A value of the wrong kind for this field never matches.
    pub fn matches(&self, value: &str, filter: &FilterValue) -> bool {
        match (&self.kind, filter) {
            (FilterKind::Text { .. }, FilterValue::Text(_))
            | (FilterKind::MultiSelect { .. }, FilterValue::Set(_)) => filter.matches(value),
            _ => false,
        }
    }

    /// Builds the gateway filter for this column.
    pub fn to_filter(&self, filter: &FilterValue) -> Filter {
        match filter {
            FilterValue::Text(needle) => Filter::contains(self.id.as_str(), needle.as_str()),
            FilterValue::Set(values) => Filter::is_in(self.id.as_str(), values.iter().map(String::as_str)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> FilterField {
        FilterField::multi_select(
            "status",
            "Status",
            [
                FilterOption::new("Published", "PUBLISHED"),
                FilterOption::new("Draft", "DRAFT"),
            ],
        )
    }

    #[test]
    fn test_text_predicate() {
        let field = FilterField::text("title", "Title");
        assert!(field.matches("Hello World", &FilterValue::text("world")));
        assert!(!field.matches("Hello World", &FilterValue::text("xyz")));
        assert!(field.matches("Hello World", &FilterValue::text("")));
    }

    #[test]
    fn test_multiselect_predicate() {
        let field = status();
        assert!(!field.matches("DRAFT", &FilterValue::set(["PUBLISHED"])));
        assert!(field.matches("DRAFT", &FilterValue::set(["DRAFT", "PUBLISHED"])));
    }

    #[test]
    fn test_kind_mismatch_never_matches() {
        assert!(!status().matches("DRAFT", &FilterValue::text("DRAFT")));
        assert!(!FilterField::text("title", "Title").matches("a", &FilterValue::set(["a"])));
    }

    #[test]
    fn test_validate() {
        let field = status();
        assert!(field.validate(&FilterValue::set(["DRAFT"])).is_ok());
        assert_eq!(
            field.validate(&FilterValue::set(["ARCHIVED"])),
            Err(ConfigError::UnknownOption {
                field: "status".into(),
                value: "ARCHIVED".into()
            })
        );
        assert_eq!(
            field.validate(&FilterValue::text("DRAFT")),
            Err(ConfigError::FilterKindMismatch {
                field: "status".into(),
                expected: "multiselect"
            })
        );
    }

    #[test]
    fn test_to_filter() {
        assert_eq!(
            FilterField::text("title", "Title").to_filter(&FilterValue::text("rust")),
            Filter::contains("title", "rust")
        );
        assert_eq!(
            status().to_filter(&FilterValue::set(["PUBLISHED", "DRAFT"])),
            Filter::is_in("status", ["DRAFT", "PUBLISHED"])
        );
    }

    #[test]
    fn test_placeholder_only_on_text() {
        let field = FilterField::text("title", "Title").with_placeholder("Filter titles...");
        assert_eq!(
            field.kind,
            FilterKind::Text {
                placeholder: Some("Filter titles...".into())
            }
        );
        assert_eq!(status().with_placeholder("x"), status());
    }
}
