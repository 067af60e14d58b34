//! Lazy batch validation.
//!
//! A table is checked column by column and row by row; every failure is recorded
//! and the batch only fails at the end. Records are built only when the whole
//! batch is clean, so a caller never sees a partially validated family.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::RecordFamily;
use crate::error::{SchemaViolations, Violation};
use crate::schema::column::ColumnSpec;
use crate::schema::value::{RawTable, Value};

/// A typed row of one record family.
pub trait Record: Sized {
    const FAMILY: RecordFamily;
    const COLUMNS: &'static [ColumnSpec];

    /// Build a record from cells already admitted by `COLUMNS` (same order).
    fn from_values(values: &[Value]) -> Result<Self, String>;

    /// Render the record back to cells (same order as `COLUMNS`).
    fn to_values(&self) -> Vec<Value>;
}

/// Validate and coerce a raw table into typed records.
pub fn validate_table<R: Record>(table: &RawTable) -> Result<Vec<R>, SchemaViolations> {
    let family = R::FAMILY;
    let mut violations = Vec::new();

    let mut index = Vec::with_capacity(R::COLUMNS.len());
    for spec in R::COLUMNS {
        let idx = table.column_index(spec.name);
        if idx.is_none() {
            if spec.required {
                violations.push(Violation {
                    family,
                    row: None,
                    column: spec.name.to_string(),
                    message: "required column is missing".to_string(),
                });
            } else {
                debug!(%family, column = spec.name, "optional column absent; filling with nulls");
            }
        }
        index.push(idx);
    }

    let mut seen: Vec<HashMap<String, usize>> = vec![HashMap::new(); R::COLUMNS.len()];
    let mut admitted = Vec::with_capacity(table.len());

    for (row_idx, row) in table.rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(R::COLUMNS.len());
        for (col_idx, (spec, idx)) in R::COLUMNS.iter().zip(&index).enumerate() {
            let Some(idx) = idx else {
                // Missing required columns were reported once above.
                cells.push(Value::Null);
                continue;
            };
            let raw = row.get(*idx).unwrap_or(&Value::Null);
            match spec.admit(raw) {
                Ok(value) => {
                    if spec.unique && !value.is_null() {
                        let key = value.to_string();
                        if let Some(first) = seen[col_idx].get(&key) {
                            violations.push(Violation {
                                family,
                                row: Some(row_idx),
                                column: spec.name.to_string(),
                                message: format!("duplicate value {key} (first seen in row {first})"),
                            });
                        } else {
                            seen[col_idx].insert(key, row_idx);
                        }
                    }
                    cells.push(value);
                }
                Err(message) => {
                    violations.push(Violation {
                        family,
                        row: Some(row_idx),
                        column: spec.name.to_string(),
                        message,
                    });
                    cells.push(Value::Null);
                }
            }
        }
        admitted.push(cells);
    }

    if !violations.is_empty() {
        return Err(SchemaViolations::new(violations));
    }

    let mut records = Vec::with_capacity(admitted.len());
    for (row_idx, cells) in admitted.iter().enumerate() {
        match R::from_values(cells) {
            Ok(record) => records.push(record),
            Err(message) => violations.push(Violation {
                family,
                row: Some(row_idx),
                column: "*".to_string(),
                message,
            }),
        }
    }

    if violations.is_empty() {
        debug!(%family, rows = records.len(), "batch validated");
        Ok(records)
    } else {
        Err(SchemaViolations::new(violations))
    }
}

/// Render typed records as a raw table with the canonical column order.
pub fn to_table<R: Record>(records: &[R]) -> RawTable {
    let mut table = RawTable::new(R::COLUMNS.iter().map(|c| c.name));
    table.rows = records.iter().map(Record::to_values).collect();
    table
}

/// Re-run the schema over already typed records.
pub fn revalidate<R: Record>(records: &[R]) -> Result<Vec<R>, SchemaViolations> {
    validate_table(&to_table(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::Check;
    use crate::schema::value::ColumnKind;

    #[derive(Debug, PartialEq)]
    struct Pair {
        id: i64,
        score: Option<f64>,
    }

    impl Record for Pair {
        const FAMILY: RecordFamily = RecordFamily::Tickets;
        const COLUMNS: &'static [ColumnSpec] = &[
            ColumnSpec::required("id", ColumnKind::Int).checked(Check::Min(1.0)).unique(),
            ColumnSpec::optional("score", ColumnKind::Float).checked(Check::Range(0.0, 1.0)),
        ];

        fn from_values(values: &[Value]) -> Result<Self, String> {
            match values {
                [Value::Int(id), score] => Ok(Pair {
                    id: *id,
                    score: score.as_f64(),
                }),
                _ => Err("bad shape".to_string()),
            }
        }

        fn to_values(&self) -> Vec<Value> {
            vec![Value::Int(self.id), Value::from(self.score)]
        }
    }

    #[test]
    fn collects_every_violation() {
        let mut table = RawTable::new(["id", "score"]);
        table.push_row(vec![Value::Text("0".into()), Value::Float(0.5)]);
        table.push_row(vec![Value::Int(2), Value::Float(1.5)]);
        table.push_row(vec![Value::Int(2), Value::Text("x".into())]);

        let err = validate_table::<Pair>(&table).unwrap_err();
        assert_eq!(err.len(), 4);
        assert!(err.contains(RecordFamily::Tickets, 0, "id"));
        assert!(err.contains(RecordFamily::Tickets, 1, "score"));
        assert!(err.contains(RecordFamily::Tickets, 2, "id"));
        assert!(err.contains(RecordFamily::Tickets, 2, "score"));
    }

    #[test]
    fn missing_optional_column_is_filled() {
        let mut table = RawTable::new(["id"]);
        table.push_row(vec![Value::Int(1)]);
        let rows = validate_table::<Pair>(&table).unwrap();
        assert_eq!(rows, vec![Pair { id: 1, score: None }]);
    }

    #[test]
    fn missing_required_column_reported_once() {
        let mut table = RawTable::new(["score"]);
        table.push_row(vec![Value::Float(0.1)]);
        table.push_row(vec![Value::Float(0.2)]);
        let err = validate_table::<Pair>(&table).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.violations[0].row, None);
        assert_eq!(err.violations[0].column, "id");
    }

    #[test]
    fn revalidation_is_idempotent() {
        let rows = vec![Pair { id: 1, score: Some(0.25) }, Pair { id: 2, score: None }];
        let again = revalidate(&rows).unwrap();
        assert_eq!(again, rows);
    }
}
