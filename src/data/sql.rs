//! SQL text rendering for warehouse reads.
//!
//! Statements are built from templates with `{name}` placeholders. Values pass
//! through a closed encoder ([`SqlValue`]); table identifiers are checked
//! separately since they cannot be quoted as literals.

use std::collections::HashMap;

use crate::error::AppError;

/// A value that may be spliced into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    /// Rendered comma-joined, e.g. for `IN ({values})`.
    List(Vec<SqlValue>),
    /// A pre-checked identifier (see [`SqlValue::ident`]); rendered verbatim.
    Ident(String),
}

impl SqlValue {
    /// A dotted table/column identifier (`catalog.schema.table`).
    pub fn ident(name: &str) -> Result<Self, AppError> {
        let valid = !name.is_empty()
            && name.split('.').all(|part| {
                !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            });
        if valid {
            Ok(SqlValue::Ident(name.to_string()))
        } else {
            Err(AppError::configuration(format!("invalid table identifier '{name}'")))
        }
    }

    pub fn encode(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) if v.is_finite() => v.to_string(),
            SqlValue::Float(_) => "NULL".to_string(),
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            SqlValue::List(items) => items.iter().map(SqlValue::encode).collect::<Vec<_>>().join(","),
            SqlValue::Ident(name) => name.clone(),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(values: Vec<T>) -> Self {
        SqlValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Substitute `{name}` placeholders. `{{` and `}}` emit literal braces.
pub fn render_sql(template: &str, params: &HashMap<&str, SqlValue>) -> Result<String, AppError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(AppError::query("unterminated placeholder in SQL template")),
                    }
                }
                let value = params
                    .get(name.trim())
                    .ok_or_else(|| AppError::query(format!("no value for SQL placeholder '{name}'")))?;
                out.push_str(&value.encode());
            }
            '}' => return Err(AppError::query("unbalanced '}' in SQL template")),
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Reject text holding more than one statement (a `;` before the trailing ones).
pub fn ensure_single_statement(sql: &str) -> Result<(), AppError> {
    let body = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if body.contains(';') {
        Err(AppError::query("multiple SQL statements are not allowed"))
    } else {
        Ok(())
    }
}

/// `SELECT * FROM <table>` for a checked identifier.
pub fn select_all(table: &str) -> Result<String, AppError> {
    let params = HashMap::from([("table", SqlValue::ident(table)?)]);
    render_sql("SELECT * FROM {table}", &params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_encode_as_literals() {
        assert_eq!(SqlValue::Null.encode(), "NULL");
        assert_eq!(SqlValue::from(42_i64).encode(), "42");
        assert_eq!(SqlValue::from(0.5_f64).encode(), "0.5");
        assert_eq!(SqlValue::from(f64::NAN).encode(), "NULL");
        assert_eq!(SqlValue::from("O'Brien").encode(), "'O''Brien'");
        assert_eq!(SqlValue::from(None::<i64>).encode(), "NULL");
        assert_eq!(SqlValue::from(vec!["SP", "RJ"]).encode(), "'SP','RJ'");
    }

    #[test]
    fn placeholders_are_substituted() {
        let params = HashMap::from([
            ("table", SqlValue::ident("analytics.lending.tickets").unwrap()),
            ("states", SqlValue::from(vec!["SP", "MG"])),
        ]);
        let sql = render_sql("SELECT * FROM {table} WHERE estado IN ({states}) AND x = '{{}}'", &params).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM analytics.lending.tickets WHERE estado IN ('SP','MG') AND x = '{}'"
        );
    }

    #[test]
    fn unknown_placeholder_is_a_query_error() {
        let err = render_sql("SELECT {missing}", &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Query(_)));
    }

    #[test]
    fn stacked_statements_are_rejected() {
        assert!(ensure_single_statement("SELECT 1").is_ok());
        assert!(ensure_single_statement("SELECT 1;;  ").is_ok());
        assert!(ensure_single_statement("SELECT 1; DROP TABLE t").is_err());
        assert!(ensure_single_statement("SELECT 1; SELECT 2;").is_err());
    }

    #[test]
    fn select_all_checks_the_identifier() {
        assert_eq!(select_all("ops.jobs").unwrap(), "SELECT * FROM ops.jobs");
        assert!(matches!(select_all("jobs; DROP TABLE x"), Err(AppError::Configuration(_))));
        assert!(select_all("a..b").is_err());
    }
}
