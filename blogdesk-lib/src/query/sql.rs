//! SQLite `WHERE` / `ORDER BY` generation.
//!
//! Column ids never reach the SQL text directly: each gateway declares a
//! [`SqlColumns`] table mapping the ids it accepts to SQL expressions, and
//! every literal is bound as a parameter.

use crate::error::GatewayError;
use crate::model::Value;

use super::Direction;
use super::Filter;
use super::OrderBy;

/// Whitelist of column ids and the SQL expressions they stand for.
#[derive(Debug, Clone, Copy)]
pub struct SqlColumns {
    columns: &'static [(&'static str, &'static str)],
}

impl SqlColumns {
    pub const fn new(columns: &'static [(&'static str, &'static str)]) -> Self {
        Self { columns }
    }

    /// Resolves a column id to its SQL expression.
    pub fn expr(&self, column: &str) -> Result<&'static str, GatewayError> {
        self.columns
            .iter()
            .find(|(id, _)| *id == column)
            .map(|(_, expr)| *expr)
            .ok_or_else(|| GatewayError::rejected(format!("unknown column '{}'", column)))
    }
}

/// A SQL snippet with its positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlFragment {
    fn literal(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }
}

/// Compiles a `Filter` to a parameterized SQL boolean expression.
pub fn filter_to_sql(filter: &Filter, columns: &SqlColumns) -> Result<SqlFragment, GatewayError> {
    let fragment = match filter {
        Filter::Eq(field, Value::Null) | Filter::IsNull(field) => SqlFragment {
            sql: format!("{} IS NULL", columns.expr(field)?),
            params: Vec::new(),
        },
        Filter::Ne(field, Value::Null) | Filter::IsNotNull(field) => SqlFragment {
            sql: format!("{} IS NOT NULL", columns.expr(field)?),
            params: Vec::new(),
        },
        Filter::Eq(field, value) => SqlFragment {
            sql: format!("{} = ?", columns.expr(field)?),
            params: vec![value.clone()],
        },
        Filter::Ne(field, value) => SqlFragment {
            sql: format!("{} <> ?", columns.expr(field)?),
            params: vec![value.clone()],
        },
        Filter::Contains(field, needle) => SqlFragment {
            sql: format!("casefold({}) LIKE ? ESCAPE '\\'", columns.expr(field)?),
            params: vec![Value::Text(format!("%{}%", escape_like(&needle.to_lowercase())))],
        },
        Filter::In(field, values) => {
            if values.is_empty() {
                return Ok(SqlFragment::literal("0"));
            }
            let placeholders = vec!["?"; values.len()].join(", ");
            SqlFragment {
                sql: format!("{} IN ({})", columns.expr(field)?, placeholders),
                params: values.clone(),
            }
        }
        Filter::And(filters) => join(filters, " AND ", "1", columns)?,
        Filter::Or(filters) => join(filters, " OR ", "0", columns)?,
    };
    Ok(fragment)
}

fn join(
    filters: &[Filter],
    separator: &str,
    empty: &str,
    columns: &SqlColumns,
) -> Result<SqlFragment, GatewayError> {
    if filters.is_empty() {
        return Ok(SqlFragment::literal(empty));
    }
    let mut parts = Vec::with_capacity(filters.len());
    let mut params = Vec::new();
    for filter in filters {
        let fragment = filter_to_sql(filter, columns)?;
        parts.push(fragment.sql);
        params.extend(fragment.params);
    }
    Ok(SqlFragment {
        sql: format!("({})", parts.join(separator)),
        params,
    })
}

/// Converts an `OrderBy` to an `ORDER BY` list, or `None` when empty.
pub fn order_to_sql(order: &OrderBy, columns: &SqlColumns) -> Result<Option<String>, GatewayError> {
    if order.is_empty() {
        return Ok(None);
    }
    let parts = order
        .fields()
        .iter()
        .map(|(field, direction)| {
            let dir = match direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            Ok(format!("{} {}", columns.expr(field)?, dir))
        })
        .collect::<Result<Vec<_>, GatewayError>>()?;
    Ok(Some(parts.join(", ")))
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
