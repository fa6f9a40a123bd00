//! Configuration error types

/// Errors raised when a table is configured or mutated with invalid input.
///
/// These are raised at the call that introduced the bad value, never deferred.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Page size must be at least 1.
    #[error("Page size must be at least 1")]
    ZeroPageSize,

    /// Page size is not one of the allowed options.
    #[error("Page size {size} is not one of {allowed:?}")]
    PageSizeNotAllowed { size: usize, allowed: Vec<usize> },

    /// Two columns or two filter fields share the same id.
    #[error("Duplicate column id '{0}'")]
    DuplicateColumn(String),

    /// A column or filter id collides with a reserved query key.
    #[error("Column id '{0}' collides with a reserved query key")]
    ReservedKey(String),

    /// The column does not exist in the table schema.
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    /// The column exists but cannot be sorted.
    #[error("Column '{0}' is not sortable")]
    NotSortable(String),

    /// The column exists but cannot be hidden.
    #[error("Column '{0}' cannot be hidden")]
    NotHideable(String),

    /// The column has no filter field.
    #[error("Column '{0}' is not filterable")]
    NotFilterable(String),

    /// The filter value does not match the field's kind.
    #[error("Filter on '{field}' expects a {expected} value")]
    FilterKindMismatch { field: String, expected: &'static str },

    /// A multiselect value is not one of the field's options.
    #[error("'{value}' is not an option of filter '{field}'")]
    UnknownOption { field: String, value: String },

    /// Multi-sort capacity exceeded.
    #[error("At most {max} sort entries are allowed")]
    TooManySortEntries { max: usize },
}
