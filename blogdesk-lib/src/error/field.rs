//! FieldError for typed row access

/// Error type for typed field access on a [`Record`](crate::model::Record).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The row has no value for this column.
    #[error("Column '{column}' missing from row")]
    Missing { column: String },

    /// The value has a different type than requested.
    #[error("Column '{column}' holds {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The value has the right type but is not a valid member of the domain.
    #[error("Column '{column}' holds invalid value '{value}'")]
    Invalid { column: String, value: String },
}

impl FieldError {
    pub fn missing(column: impl Into<String>) -> Self {
        Self::Missing {
            column: column.into(),
        }
    }

    pub fn type_mismatch(column: impl Into<String>, expected: &'static str, actual: &'static str) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected,
            actual,
        }
    }

    pub fn invalid(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Invalid {
            column: column.into(),
            value: value.into(),
        }
    }
}
