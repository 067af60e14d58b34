//! Generic tabular cells and the coercions applied to them.
//!
//! Sources hand us loosely typed scalars: the warehouse returns strings (or
//! nulls), CSV files return strings, the mock generator returns typed values.
//! Everything is funneled through `Value` so the validator sees one shape.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Epoch values above this magnitude are read as milliseconds, not seconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

const DATETIME_FMTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FMTS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// A single generic cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
        }
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map(Value::Text).unwrap_or(Value::Null)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map(Value::Float).unwrap_or(Value::Null)
    }
}

impl From<Option<u8>> for Value {
    fn from(value: Option<u8>) -> Self {
        value.map(|v| Value::Int(i64::from(v))).unwrap_or(Value::Null)
    }
}

/// Target type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    DateTime,
    Date,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Int => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "string",
            ColumnKind::DateTime => "datetime",
            ColumnKind::Date => "date",
        }
    }
}

/// Coerce a cell to the given kind.
///
/// Nulls stay null (nullability is checked by the caller). Blank strings are
/// treated as null for every non-text kind.
pub fn coerce(value: &Value, kind: ColumnKind) -> Result<Value, String> {
    if let Value::Text(s) = value {
        if kind != ColumnKind::Text && s.trim().is_empty() {
            return Ok(Value::Null);
        }
    }

    let coerced = match (kind, value) {
        (_, Value::Null) => Some(Value::Null),

        (ColumnKind::Int, Value::Int(v)) => Some(Value::Int(*v)),
        (ColumnKind::Int, Value::Bool(v)) => Some(Value::Int(i64::from(*v))),
        (ColumnKind::Int, Value::Float(v)) => float_to_int(*v).map(Value::Int),
        (ColumnKind::Int, Value::Text(s)) => parse_int(s).map(Value::Int),

        (ColumnKind::Float, Value::Float(v)) if v.is_nan() => Some(Value::Null),
        (ColumnKind::Float, Value::Float(v)) if v.is_finite() => Some(Value::Float(*v)),
        (ColumnKind::Float, Value::Int(v)) => Some(Value::Float(*v as f64)),
        (ColumnKind::Float, Value::Bool(v)) => Some(Value::Float(if *v { 1.0 } else { 0.0 })),
        (ColumnKind::Float, Value::Text(s)) => parse_float(s),

        (ColumnKind::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
        (ColumnKind::Text, Value::Int(v)) => Some(Value::Text(v.to_string())),
        (ColumnKind::Text, Value::Float(v)) => Some(Value::Text(v.to_string())),
        (ColumnKind::Text, Value::Bool(v)) => Some(Value::Text(v.to_string())),

        (ColumnKind::DateTime, Value::DateTime(v)) => Some(Value::DateTime(*v)),
        (ColumnKind::DateTime, Value::Date(d)) => Some(Value::DateTime(d.and_time(NaiveTime::MIN))),
        (ColumnKind::DateTime, Value::Text(s)) => parse_datetime(s).map(Value::DateTime),
        (ColumnKind::DateTime, Value::Int(v)) => from_epoch(*v).map(Value::DateTime),
        (ColumnKind::DateTime, Value::Float(v)) => float_to_int(*v).and_then(from_epoch).map(Value::DateTime),

        (ColumnKind::Date, Value::Date(d)) => Some(Value::Date(*d)),
        (ColumnKind::Date, Value::DateTime(v)) => Some(Value::Date(v.date())),
        (ColumnKind::Date, Value::Text(s)) => parse_date(s).map(Value::Date),
        (ColumnKind::Date, Value::Int(v)) => from_epoch(*v).map(|dt| Value::Date(dt.date())),

        _ => None,
    };

    coerced.ok_or_else(|| format!("expected {}, got {value}", kind.label()))
}

fn float_to_int(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(v as i64)
    } else {
        None
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    // Warehouses frequently render integral columns as "12.0".
    s.parse::<f64>().ok().and_then(float_to_int)
}

fn parse_float(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        return Some(Value::Null);
    }
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(Value::Float(v))
}

/// Parse a timestamp string (ISO-8601 / RFC 3339 variants, or a bare date).
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    let no_zone = s.strip_suffix('Z').unwrap_or(s);
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(no_zone, fmt) {
            return Some(dt);
        }
    }
    parse_date_only(s).map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a calendar date; timestamps are truncated to their day.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    parse_date_only(s).or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    DATE_FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn from_epoch(v: i64) -> Option<NaiveDateTime> {
    let dt = if v.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(v)
    } else {
        DateTime::from_timestamp(v, 0)
    };
    dt.map(|dt| dt.naive_utc())
}

/// A named-column table of generic cells, as delivered by a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `(row, column)`; short rows read as null.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r.get(idx).unwrap_or(&Value::Null))
    }

    /// Coerce one column in place where possible.
    ///
    /// Cells that fail to coerce are left untouched so the validator can report
    /// them with their original content. Returns the number of cells that could
    /// not be coerced; a missing column is a no-op.
    pub fn normalize_column(&mut self, name: &str, kind: ColumnKind) -> usize {
        let Some(idx) = self.column_index(name) else {
            return 0;
        };
        let mut failed = 0;
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                match coerce(cell, kind) {
                    Ok(v) => *cell = v,
                    Err(_) => failed += 1,
                }
            }
        }
        failed
    }
}
