//! Warehouse connection settings.
//!
//! Credentials and table names are resolved through [`secrets::SecretChain`];
//! table names fall back to the `analytics.lending.*` defaults.

pub mod secrets;

use std::fmt;

use crate::error::AppError;

pub use secrets::{
    EnvProvider, MapProvider, ScopedSecretProvider, SecretChain, SecretProvider, SecretsFileProvider,
};

pub const KEY_HOST: &str = "DATABRICKS_HOST";
pub const KEY_HTTP_PATH: &str = "DATABRICKS_HTTP_PATH";
pub const KEY_TOKEN: &str = "DATABRICKS_TOKEN";
pub const KEY_TABLE_TICKETS: &str = "TABLE_TICKETS";
pub const KEY_TABLE_JOBS: &str = "TABLE_JOBS";
pub const KEY_TABLE_PRODUCT_METRICS: &str = "TABLE_PRODUCT_METRICS";
pub const KEY_TABLE_ELIGIBILITY: &str = "TABLE_ELIGIBILITY";

pub const DEFAULT_TABLE_TICKETS: &str = "analytics.lending.tickets";
pub const DEFAULT_TABLE_JOBS: &str = "analytics.lending.jobs";
pub const DEFAULT_TABLE_PRODUCT_METRICS: &str = "analytics.lending.product_metrics";
pub const DEFAULT_TABLE_ELIGIBILITY: &str = "analytics.lending.eligibility";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub host: Option<String>,
    pub http_path: Option<String>,
    pub token: Option<String>,
    pub table_tickets: String,
    pub table_jobs: String,
    pub table_product_metrics: String,
    /// Resolved for completeness; no loader path reads it yet.
    pub table_eligibility: String,
}

impl WarehouseConfig {
    pub fn resolve(chain: &SecretChain) -> Self {
        let table = |key: &str, default: &str| chain.resolve(key).unwrap_or_else(|| default.to_string());
        Self {
            host: chain.resolve(KEY_HOST),
            http_path: chain.resolve(KEY_HTTP_PATH),
            token: chain.resolve(KEY_TOKEN),
            table_tickets: table(KEY_TABLE_TICKETS, DEFAULT_TABLE_TICKETS),
            table_jobs: table(KEY_TABLE_JOBS, DEFAULT_TABLE_JOBS),
            table_product_metrics: table(KEY_TABLE_PRODUCT_METRICS, DEFAULT_TABLE_PRODUCT_METRICS),
            table_eligibility: table(KEY_TABLE_ELIGIBILITY, DEFAULT_TABLE_ELIGIBILITY),
        }
    }

    /// Load `.env` into the process environment, then resolve through the standard chain.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::resolve(&SecretChain::standard())
    }

    pub fn is_configured(&self) -> bool {
        self.missing_keys().is_empty()
    }

    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            (KEY_HOST, &self.host),
            (KEY_HTTP_PATH, &self.http_path),
            (KEY_TOKEN, &self.token),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect()
    }

    pub fn ensure_configured(&self) -> Result<(), AppError> {
        let missing = self.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::configuration(format!(
                "warehouse parameters missing: {}",
                missing.join(", ")
            )))
        }
    }

    /// Token-free one-line summary of the active source.
    pub fn describe(&self) -> String {
        match (&self.host, &self.http_path) {
            (Some(host), Some(path)) if self.token.is_some() => format!(
                "warehouse {host}{path} (tickets={}, jobs={}, product_metrics={})",
                self.table_tickets, self.table_jobs, self.table_product_metrics
            ),
            _ => format!("mock data (warehouse not configured; missing {})", self.missing_keys().join(", ")),
        }
    }
}

// Hand-written so the token never reaches logs.
impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("host", &self.host)
            .field("http_path", &self.http_path)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("table_tickets", &self.table_tickets)
            .field("table_jobs", &self.table_jobs)
            .field("table_product_metrics", &self.table_product_metrics)
            .field("table_eligibility", &self.table_eligibility)
            .finish()
    }
}
