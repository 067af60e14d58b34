//! Error type shared by every pipeline stage.
//!
//! Each variant maps to a process exit code so the binary can report *what kind*
//! of failure happened without parsing messages:
//!
//! - `2`: configuration / usage problems (fix your flags or secrets)
//! - `3`: the data itself is invalid (schema violations)
//! - `4`: the external source or the filesystem failed us

use std::fmt;

use thiserror::Error;

use crate::domain::RecordFamily;

/// Maximum number of violations rendered by `Display`.
const DISPLAY_LIMIT: usize = 10;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// External source parameters missing/incomplete, or the source is unreachable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The external source was reached but refused or failed the statement.
    #[error("query error: {0}")]
    Query(String),

    /// Loaded data failed type/range/membership checks.
    #[error("{0}")]
    SchemaValidation(SchemaViolations),

    /// Filesystem read/write failure (CSV ingest, exports).
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid arguments passed to a pipeline operation.
    #[error("{0}")]
    Usage(String),

    /// A random distribution could not be constructed.
    #[error("sampling error: {0}")]
    Sampling(String),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Configuration(_) | AppError::Usage(_) => 2,
            AppError::SchemaValidation(_) => 3,
            AppError::Query(_) | AppError::Io(_) | AppError::Sampling(_) => 4,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AppError::Configuration(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        AppError::Query(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        AppError::Io(message.into())
    }

    pub fn usage(message: impl Into<String>) -> Self {
        AppError::Usage(message.into())
    }

    /// The violations carried by a schema failure, if this is one.
    pub fn violations(&self) -> Option<&SchemaViolations> {
        match self {
            AppError::SchemaValidation(v) => Some(v),
            _ => None,
        }
    }
}

impl From<SchemaViolations> for AppError {
    fn from(value: SchemaViolations) -> Self {
        AppError::SchemaValidation(value)
    }
}

/// A single failed check.
///
/// `row` is the 0-based row index within the family's table; it is `None` for
/// table-level problems such as a missing required column.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub family: RecordFamily,
    pub row: Option<usize>,
    pub column: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} row {row}, column `{}`: {}", self.family, self.column, self.message),
            None => write!(f, "{} column `{}`: {}", self.family, self.column, self.message),
        }
    }
}

/// Every violation found in a batch (validation never stops at the first one).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaViolations {
    pub violations: Vec<Violation>,
}

impl SchemaViolations {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// Merge another batch's violations into this one.
    pub fn extend(&mut self, other: SchemaViolations) {
        self.violations.extend(other.violations);
    }

    /// Whether a violation exists for the given row/column pair.
    pub fn contains(&self, family: RecordFamily, row: usize, column: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.family == family && v.row == Some(row) && v.column == column)
    }
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema validation failed with {} violation(s)", self.violations.len())?;
        for v in self.violations.iter().take(DISPLAY_LIMIT) {
            write!(f, "\n  - {v}")?;
        }
        if self.violations.len() > DISPLAY_LIMIT {
            write!(f, "\n  ... and {} more", self.violations.len() - DISPLAY_LIMIT)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_kind() {
        assert_eq!(AppError::configuration("x").exit_code(), 2);
        assert_eq!(AppError::usage("x").exit_code(), 2);
        assert_eq!(AppError::from(SchemaViolations::default()).exit_code(), 3);
        assert_eq!(AppError::query("x").exit_code(), 4);
    }

    #[test]
    fn display_truncates_long_violation_lists() {
        let violations = (0..15)
            .map(|row| Violation {
                family: RecordFamily::Tickets,
                row: Some(row),
                column: "tnps".to_string(),
                message: "out of range".to_string(),
            })
            .collect();
        let text = SchemaViolations::new(violations).to_string();
        assert!(text.starts_with("schema validation failed with 15 violation(s)"));
        assert!(text.contains("tickets row 9, column `tnps`"));
        assert!(!text.contains("row 10,"));
        assert!(text.ends_with("... and 5 more"));
    }
}
