//! Ordering types.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::model::Row;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending order (A-Z, 0-9).
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    pub fn is_desc(&self) -> bool {
        matches!(self, Direction::Desc)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(()),
        }
    }
}

/// Specifies the ordering of list results.
///
/// Fields are compared in priority order; an empty `OrderBy` leaves the
/// gateway's natural order.
///
/// # Example
///
/// ```
/// use blogdesk_lib::query::OrderBy;
///
/// let order = OrderBy::desc("created_at").then_asc("title");
/// assert_eq!(order.fields().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy {
    fields: Vec<(String, Direction)>,
}

impl OrderBy {
    /// Creates an empty ordering.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates an ascending order on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            fields: vec![(field.into(), Direction::Asc)],
        }
    }

    /// Creates a descending order on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            fields: vec![(field.into(), Direction::Desc)],
        }
    }

    /// Adds a secondary ascending order on a field.
    pub fn then_asc(self, field: impl Into<String>) -> Self {
        self.then(field, Direction::Asc)
    }

    /// Adds a secondary descending order on a field.
    pub fn then_desc(self, field: impl Into<String>) -> Self {
        self.then(field, Direction::Desc)
    }

    /// Adds a lower-priority order on a field.
    pub fn then(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.fields.push((field.into(), direction));
        self
    }

    /// Returns the ordered fields with their directions.
    pub fn fields(&self) -> &[(String, Direction)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compares two rows by the ordered fields.
    pub fn compare<R: Row>(&self, a: &R, b: &R) -> Ordering {
        for (field, direction) in &self.fields {
            let left = a.value(field).unwrap_or_default();
            let right = b.value(field).unwrap_or_default();
            let ordering = match direction {
                Direction::Asc => left.sort_cmp(&right),
                Direction::Desc => right.sort_cmp(&left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    #[test]
    fn test_compare_uses_priority() {
        let a = Record::new("a").set("status", "DRAFT").set("title", "b");
        let b = Record::new("b").set("status", "DRAFT").set("title", "a");
        let c = Record::new("c").set("status", "PUBLISHED").set("title", "c");

        let order = OrderBy::desc("status").then_asc("title");
        let mut rows = vec![a.clone(), b.clone(), c.clone()];
        rows.sort_by(|x, y| order.compare(x, y));
        assert_eq!(rows, vec![c, b, a]);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("desc".parse::<Direction>(), Ok(Direction::Desc));
        assert!("DESC".parse::<Direction>().is_err());
    }
}
