//! Column declarations: type, nullability, presence, and value checks.

use crate::schema::value::{ColumnKind, Value, coerce};

/// A value-level constraint applied after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    /// `value >= min`
    Min(f64),
    /// `lo <= value <= hi`
    Range(f64, f64),
    /// Value is 0 or 1.
    Flag,
    /// Text value is one of the listed labels.
    OneOf(&'static [&'static str]),
}

impl Check {
    /// Returns a violation message, or `None` when the value passes.
    pub fn violation(&self, value: &Value) -> Option<String> {
        match (self, value) {
            (_, Value::Null) => None,
            (Check::Min(min), v) => {
                let x = v.as_f64()?;
                (x < *min).then(|| format!("{x} is below the minimum {min}"))
            }
            (Check::Range(lo, hi), v) => {
                let x = v.as_f64()?;
                (x < *lo || x > *hi).then(|| format!("{x} is outside [{lo}, {hi}]"))
            }
            (Check::Flag, Value::Int(x)) => (*x != 0 && *x != 1).then(|| format!("{x} is not 0/1")),
            (Check::Flag, v) => Some(format!("{v} is not 0/1")),
            (Check::OneOf(allowed), Value::Text(s)) => (!allowed.contains(&s.as_str()))
                .then(|| format!("'{s}' is not one of {}", allowed.join("/"))),
            (Check::OneOf(allowed), v) => Some(format!("{v} is not one of {}", allowed.join("/"))),
        }
    }
}

/// Declaration of one schema column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    /// Missing optional columns are filled with nulls instead of failing.
    pub required: bool,
    /// Values must be distinct across the batch.
    pub unique: bool,
    pub check: Option<Check>,
}

impl ColumnSpec {
    /// A required, non-nullable column.
    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            required: true,
            unique: false,
            check: None,
        }
    }

    /// A nullable column that may be absent from the source table.
    pub const fn optional(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            required: false,
            unique: false,
            check: None,
        }
    }

    pub const fn checked(mut self, check: Check) -> Self {
        self.check = Some(check);
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Coerce a raw cell and apply nullability + value checks.
    pub fn admit(&self, raw: &Value) -> Result<Value, String> {
        let value = coerce(raw, self.kind)?;
        if value.is_null() {
            if self.nullable {
                return Ok(value);
            }
            return Err("null value in non-nullable column".to_string());
        }
        if let Some(msg) = self.check.and_then(|c| c.violation(&value)) {
            return Err(msg);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_applies_coercion_then_checks() {
        let tnps = ColumnSpec::optional("tnps", ColumnKind::Float).checked(Check::Range(-100.0, 100.0));
        assert_eq!(tnps.admit(&Value::Text("55.5".into())), Ok(Value::Float(55.5)));
        assert_eq!(tnps.admit(&Value::Null), Ok(Value::Null));
        let err = tnps.admit(&Value::Float(150.0)).unwrap_err();
        assert!(err.contains("outside [-100, 100]"), "{err}");
    }

    #[test]
    fn non_nullable_rejects_nulls() {
        let job = ColumnSpec::required("job", ColumnKind::Text);
        assert!(job.admit(&Value::Null).is_err());
        let duration = ColumnSpec::required("duration_s", ColumnKind::Int);
        assert!(duration.admit(&Value::Text("".into())).is_err());
    }

    #[test]
    fn membership_and_flag_checks() {
        let status = ColumnSpec::required("status", ColumnKind::Text).checked(Check::OneOf(&["SUCCESS", "FAILED"]));
        assert!(status.admit(&Value::Text("SUCCESS".into())).is_ok());
        assert!(status.admit(&Value::Text("RUNNING".into())).is_err());

        let fcr = ColumnSpec::optional("fcr", ColumnKind::Int).checked(Check::Flag);
        assert_eq!(fcr.admit(&Value::Text("1".into())), Ok(Value::Int(1)));
        assert!(fcr.admit(&Value::Int(2)).is_err());
    }
}
