//! Schema enforcement for the three record families.
//!
//! - generic cells + coercions (`value`)
//! - column declarations and checks (`column`)
//! - lazy batch validation (`validate`)
//! - the concrete ticket/job/product schemas (`families`)

pub mod column;
pub mod families;
pub mod validate;
pub mod value;

pub use column::{Check, ColumnSpec};
pub use families::*;
pub use validate::{Record, revalidate, to_table, validate_table};
pub use value::{ColumnKind, RawTable, Value};
