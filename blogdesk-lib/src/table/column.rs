//! Column definitions and table schema

use std::collections::HashSet;

use super::FilterField;
use super::codec::RESERVED_KEYS;
use crate::error::ConfigError;

/// Declarative description of a table column.
///
/// Rendering is left to the presentation layer; the controller only needs to
/// know whether a column can be sorted or hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub id: String,
    pub label: String,
    pub sortable: bool,
    pub hideable: bool,
}

impl ColumnDef {
    /// A data column: sortable and hideable.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            sortable: true,
            hideable: true,
        }
    }

    /// A control column (selection checkbox, row actions): neither sortable nor hideable.
    pub fn control(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            sortable: false,
            hideable: false,
        }
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn hideable(mut self, hideable: bool) -> Self {
        self.hideable = hideable;
        self
    }
}

/// Columns and filter fields of one table, validated together.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
    filter_fields: Vec<FilterField>,
}

impl TableSchema {
    /// Validates and builds a schema.
    ///
    /// Column ids must be unique. Every filter field must name a column,
    /// appear once, and not collide with a reserved query key.
    pub fn new(columns: Vec<ColumnDef>, filter_fields: Vec<FilterField>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.id.as_str()) {
                return Err(ConfigError::DuplicateColumn(column.id.clone()));
            }
        }

        let mut seen_filters = HashSet::new();
        for field in &filter_fields {
            if RESERVED_KEYS.contains(&field.id.as_str()) {
                return Err(ConfigError::ReservedKey(field.id.clone()));
            }
            if !seen.contains(field.id.as_str()) {
                return Err(ConfigError::UnknownColumn(field.id.clone()));
            }
            if !seen_filters.insert(field.id.as_str()) {
                return Err(ConfigError::DuplicateColumn(field.id.clone()));
            }
        }

        Ok(Self {
            columns,
            filter_fields,
        })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn filter_fields(&self) -> &[FilterField] {
        &self.filter_fields
    }

    pub fn column(&self, id: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn filter_field(&self, id: &str) -> Option<&FilterField> {
        self.filter_fields.iter().find(|f| f.id == id)
    }

    /// Looks up a column that may be sorted.
    pub fn sortable_column(&self, id: &str) -> Result<&ColumnDef, ConfigError> {
        let column = self
            .column(id)
            .ok_or_else(|| ConfigError::UnknownColumn(id.to_string()))?;
        if !column.sortable {
            return Err(ConfigError::NotSortable(id.to_string()));
        }
        Ok(column)
    }

    /// Looks up a column that may be hidden.
    pub fn hideable_column(&self, id: &str) -> Result<&ColumnDef, ConfigError> {
        let column = self
            .column(id)
            .ok_or_else(|| ConfigError::UnknownColumn(id.to_string()))?;
        if !column.hideable {
            return Err(ConfigError::NotHideable(id.to_string()));
        }
        Ok(column)
    }
}
