//! Row contract and dynamic record

use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;

use super::Value;
use crate::error::FieldError;

/// A row that can be shown in a table.
///
/// Rows are identified by a stable, externally assigned id and expose their
/// columns as dynamic [`Value`]s. Everything else about the row's shape is
/// owned by the gateway that produced it.
pub trait Row: Clone + Send + Sync + 'static {
    /// Stable row id.
    fn id(&self) -> &str;

    /// Returns the value of a column, or `None` if the row has no such column.
    fn value(&self, column: &str) -> Option<Value>;
}

/// A dynamic row holding its columns in a map.
///
/// # Example
///
/// ```
/// use blogdesk_lib::model::{Record, Row};
///
/// let record = Record::new("b1")
///     .set("title", "Hello World")
///     .set("likes", 3i64);
///
/// assert_eq!(record.id(), "b1");
/// assert_eq!(record.get_text("title").unwrap(), Some("Hello World"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    fields: HashMap<String, Value>,
}

impl Record {
    /// Creates an empty record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    /// Returns a reference to the column value, if it exists.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Returns `true` if the record has the given column.
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Returns all columns.
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    /// Sets a column value (builder pattern).
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Inserts a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Removes a column and returns its value.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.fields.remove(column)
    }

    // =========================================================================
    // Typed getters
    //
    // Err if the column is missing or holds another type.
    // Ok(None) only if the column exists and is Value::Null.
    // =========================================================================

    /// Gets a text column.
    pub fn get_text(&self, column: &str) -> Result<Option<&str>, FieldError> {
        match self.fields.get(column) {
            None => Err(FieldError::missing(column)),
            Some(Value::Null) => Ok(None),
            Some(Value::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(FieldError::type_mismatch(column, "text", other.type_name())),
        }
    }

    /// Gets a boolean column.
    pub fn get_bool(&self, column: &str) -> Result<Option<bool>, FieldError> {
        match self.fields.get(column) {
            None => Err(FieldError::missing(column)),
            Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(FieldError::type_mismatch(column, "bool", other.type_name())),
        }
    }

    /// Gets an integer column.
    pub fn get_int(&self, column: &str) -> Result<Option<i64>, FieldError> {
        match self.fields.get(column) {
            None => Err(FieldError::missing(column)),
            Some(Value::Null) => Ok(None),
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(other) => Err(FieldError::type_mismatch(column, "int", other.type_name())),
        }
    }

    /// Gets a timestamp column.
    pub fn get_timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
        match self.fields.get(column) {
            None => Err(FieldError::missing(column)),
            Some(Value::Null) => Ok(None),
            Some(Value::Timestamp(t)) => Ok(Some(*t)),
            Some(other) => Err(FieldError::type_mismatch(column, "timestamp", other.type_name())),
        }
    }

    /// Gets a list column.
    pub fn get_list(&self, column: &str) -> Result<Option<&[String]>, FieldError> {
        match self.fields.get(column) {
            None => Err(FieldError::missing(column)),
            Some(Value::Null) => Ok(None),
            Some(Value::List(items)) => Ok(Some(items.as_slice())),
            Some(other) => Err(FieldError::type_mismatch(column, "list", other.type_name())),
        }
    }
}

impl Row for Record {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, column: &str) -> Option<Value> {
        self.fields.get(column).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let record = Record::new("r1")
            .set("title", "Draft notes")
            .set("likes", 3i64)
            .set("image", Value::Null);

        assert_eq!(record.get_text("title").unwrap(), Some("Draft notes"));
        assert_eq!(record.get_int("likes").unwrap(), Some(3));
        assert_eq!(record.get_text("image").unwrap(), None);
        assert_eq!(
            record.get_text("slug").unwrap_err(),
            FieldError::missing("slug")
        );
        assert_eq!(
            record.get_bool("likes").unwrap_err(),
            FieldError::type_mismatch("likes", "bool", "int")
        );
    }
}
