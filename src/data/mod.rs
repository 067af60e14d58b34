//! Data sources.
//!
//! - `mock`: seeded synthetic datasets
//! - `sql`: statement rendering and the value encoder
//! - `warehouse`: the Databricks SQL client behind the `QueryRunner` seam
//! - `loader`: source selection + validation

pub mod loader;
pub mod mock;
pub mod sql;
pub mod warehouse;

pub use loader::{LoadConfig, load_data, load_from_dir, load_from_warehouse, load_mock, load_source};
pub use mock::{DEFAULT_MOCK_DAYS, DEFAULT_MOCK_SEED, MockOptions, generate_mock_data};
pub use warehouse::{QueryRunner, WarehouseClient};
