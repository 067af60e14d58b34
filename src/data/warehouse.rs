//! Databricks SQL warehouse reads (Statement Execution API).

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WarehouseConfig;
use crate::data::sql::ensure_single_statement;
use crate::error::AppError;
use crate::schema::{RawTable, Value};

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";
const USER_AGENT: &str = concat!("lending-ops/", env!("CARGO_PKG_VERSION"));
/// Server-side wait before the statement call returns (API maximum is 50s).
const WAIT_TIMEOUT: &str = "50s";
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Something that can run one SQL statement and hand back a table.
pub trait QueryRunner {
    fn run_query(&self, sql: &str) -> Result<RawTable, AppError>;
}

pub struct WarehouseClient {
    client: Client,
    base_url: String,
    warehouse_id: String,
    token: String,
}

impl WarehouseClient {
    pub fn new(config: &WarehouseConfig) -> Result<Self, AppError> {
        config.ensure_configured()?;
        let (Some(host), Some(http_path), Some(token)) = (&config.host, &config.http_path, &config.token) else {
            return Err(AppError::configuration("warehouse parameters missing"));
        };

        let warehouse_id = warehouse_id(http_path).ok_or_else(|| {
            AppError::configuration(format!("cannot derive a warehouse id from http path '{http_path}'"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_host(host),
            warehouse_id,
            token: token.clone(),
        })
    }

    fn fetch_chunk(&self, link: &str) -> Result<ResultChunk, AppError> {
        let url = format!("{}{link}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| AppError::configuration(format!("warehouse unreachable: {e}")))?;
        let resp = check_status(resp)?;
        resp.json()
            .map_err(|e| AppError::query(format!("failed to parse result chunk: {e}")))
    }
}

impl QueryRunner for WarehouseClient {
    fn run_query(&self, sql: &str) -> Result<RawTable, AppError> {
        ensure_single_statement(sql)?;
        debug!(sql, warehouse_id = %self.warehouse_id, "executing statement");

        let request = StatementRequest {
            statement: sql,
            warehouse_id: &self.warehouse_id,
            wait_timeout: WAIT_TIMEOUT,
            on_wait_timeout: "CANCEL",
            disposition: "INLINE",
            format: "JSON_ARRAY",
        };

        let resp = self
            .client
            .post(format!("{}{STATEMENTS_PATH}", self.base_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .map_err(|e| AppError::configuration(format!("warehouse unreachable: {e}")))?;
        let resp = check_status(resp)?;

        let body: StatementResponse = resp
            .json()
            .map_err(|e| AppError::query(format!("failed to parse statement response: {e}")))?;

        let mut table = statement_to_table(&body)?;
        let mut next = body.result.and_then(|r| r.next_chunk_internal_link);
        while let Some(link) = next {
            let chunk = self.fetch_chunk(&link)?;
            debug!(chunk = chunk.chunk_index, rows = chunk.data_array.len(), "fetched result chunk");
            append_rows(&mut table, &chunk.data_array);
            next = chunk.next_chunk_internal_link;
        }

        Ok(table)
    }
}

/// Auth failures are a configuration problem; other non-2xx answers are a rejected query.
fn check_status(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp
        .json::<ApiError>()
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::configuration(format!(
            "warehouse rejected credentials ({status}) {detail}"
        ))),
        _ => Err(AppError::query(format!("warehouse request failed with status {status}: {detail}"))),
    }
}

/// Last non-empty path segment, e.g. `/sql/1.0/warehouses/abc123` → `abc123`.
fn warehouse_id(http_path: &str) -> Option<String> {
    http_path
        .split('/')
        .filter(|s| !s.trim().is_empty())
        .last()
        .map(|s| s.trim().to_string())
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn statement_to_table(body: &StatementResponse) -> Result<RawTable, AppError> {
    match body.status.state.as_str() {
        "SUCCEEDED" => {}
        state => {
            let reason = body
                .status
                .error
                .as_ref()
                .and_then(|e| e.message.clone())
                .unwrap_or_else(|| "no detail".to_string());
            return Err(AppError::query(format!("statement {state}: {reason}")));
        }
    }

    let mut columns: Vec<&ColumnInfo> = body
        .manifest
        .as_ref()
        .map(|m| m.schema.columns.iter().collect())
        .unwrap_or_default();
    columns.sort_by_key(|c| c.position);

    let mut table = RawTable::new(columns.iter().map(|c| c.name.to_ascii_lowercase()));
    if let Some(result) = &body.result {
        append_rows(&mut table, &result.data_array);
    }
    Ok(table)
}

fn append_rows(table: &mut RawTable, rows: &[Vec<serde_json::Value>]) {
    for row in rows {
        table.push_row(row.iter().map(json_cell).collect());
    }
}

fn json_cell(cell: &serde_json::Value) -> Value {
    match cell {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    warehouse_id: &'a str,
    wait_timeout: &'a str,
    on_wait_timeout: &'a str,
    disposition: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultChunk>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: ManifestSchema,
}

#[derive(Debug, Deserialize)]
struct ManifestSchema {
    #[serde(default)]
    columns: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
struct ColumnInfo {
    name: String,
    #[serde(default)]
    position: usize,
}

#[derive(Debug, Deserialize)]
struct ResultChunk {
    #[serde(default)]
    chunk_index: usize,
    #[serde(default)]
    data_array: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    next_chunk_internal_link: Option<String>,
}
