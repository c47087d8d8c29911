//! Snowflake session over the REST protocol the official drivers use.
//!
//! Login trades username/password for a session token, statements go to
//! `query-request` with positional bindings, and large results arrive as
//! separately downloaded chunks.

use super::{query_error, Dialect, Row, Session, SqlValue};
use crate::config::SnowflakeConfig;
use crate::error::{Result, WarehouseError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const CLIENT_APP_ID: &str = "culture_warehouse";
const QUERY_ACCEPT: &str = "application/snowflake";
// "Query in progress" codes; the result has to be fetched from `getResultUrl`.
const IN_PROGRESS_CODES: [&str; 2] = ["333333", "333334"];
const MAX_RESULT_POLLS: u32 = 240;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    success: bool,
}

impl Envelope {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(c)) => Some(c.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn in_progress(&self) -> bool {
        self.code()
            .map(|c| IN_PROGRESS_CODES.contains(&c.as_str()))
            .unwrap_or(false)
    }

    fn failure(&self) -> String {
        format!(
            "{} (code {})",
            self.message.as_deref().unwrap_or("request failed"),
            self.code().unwrap_or_else(|| "unknown".to_string())
        )
    }
}

/// A query reply: either the finished result or where to poll for it.
#[derive(Debug)]
enum QueryStep {
    Done(QueryData),
    Pending(String),
}

fn query_step(envelope: Envelope) -> std::result::Result<QueryStep, String> {
    if !envelope.success {
        return Err(envelope.failure());
    }
    if envelope.in_progress() {
        return envelope
            .data
            .as_ref()
            .and_then(|d| d.get("getResultUrl"))
            .and_then(Value::as_str)
            .map(|url| QueryStep::Pending(url.to_string()))
            .ok_or_else(|| format!("query still in progress and no result URL given ({})", envelope.failure()));
    }
    serde_json::from_value(envelope.data.unwrap_or(Value::Null))
        .map(QueryStep::Done)
        .map_err(|e| e.to_string())
}

/// `getResultUrl` is usually a path relative to the account host.
fn result_endpoint(base_url: &str, result_url: &str) -> String {
    if result_url.starts_with("http://") || result_url.starts_with("https://") {
        result_url.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), result_url.trim_start_matches('/'))
    }
}

fn poll_delay(polls: u32) -> Duration {
    Duration::from_millis((500 * u64::from(polls)).min(5_000))
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    scale: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Chunk {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<ColumnType>,
    #[serde(default)]
    rowset: Vec<Vec<Option<String>>>,
    #[serde(default)]
    chunks: Vec<Chunk>,
    #[serde(default)]
    chunk_headers: HashMap<String, String>,
    #[serde(default)]
    qrmk: Option<String>,
    #[serde(default)]
    query_id: Option<String>,
}

pub struct SnowflakeSession {
    client: Client,
    base_url: String,
    token: String,
    sequence: AtomicU64,
}

impl SnowflakeSession {
    /// Authenticate and open a session bound to the configured warehouse,
    /// database and schema.
    pub async fn login(cfg: &SnowflakeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| WarehouseError::Connection(format!("Failed to build HTTP client: {e}")))?;
        let base_url = cfg.base_url();

        let url = format!("{base_url}/session/v1/login-request");
        let request_id = Uuid::new_v4().to_string();
        let body = login_body(cfg);

        let response = client
            .post(&url)
            .query(&[
                ("request_id", request_id.as_str()),
                ("warehouse", cfg.warehouse.as_str()),
                ("databaseName", cfg.database.as_str()),
                ("schemaName", cfg.schema.as_str()),
            ])
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| WarehouseError::Connection(format!("Login request to {base_url} failed: {e}")))?;

        let status = response.status();
        let envelope: Envelope = response.json().await.map_err(|e| {
            WarehouseError::Connection(format!("Unreadable login response (HTTP {status}): {e}"))
        })?;
        if !envelope.success {
            return Err(WarehouseError::Connection(format!(
                "Login rejected: {}",
                envelope.failure()
            )));
        }
        let data: LoginData = serde_json::from_value(envelope.data.unwrap_or(Value::Null))
            .map_err(|e| WarehouseError::Connection(format!("Login response has no token: {e}")))?;

        info!("Snowflake session opened for {}@{}", cfg.user, cfg.account);
        Ok(Self {
            client,
            base_url,
            token: data.token,
            sequence: AtomicU64::new(0),
        })
    }

    fn auth_header(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token)
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<QueryData> {
        let url = format!("{}/queries/v1/query-request", self.base_url);
        let request_id = Uuid::new_v4().to_string();
        let sequence_id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let mut body = json!({
            "sqlText": sql,
            "asyncExec": false,
            "sequenceId": sequence_id,
            "querySubmissionTime": chrono::Utc::now().timestamp_millis(),
        });
        if !params.is_empty() {
            body["bindings"] = bindings(params);
        }

        debug!(sequence_id, "Submitting statement");
        let response = self
            .client
            .post(&url)
            .query(&[("requestId", request_id.as_str())])
            .header(AUTHORIZATION, self.auth_header())
            .header(ACCEPT, QUERY_ACCEPT)
            .json(&body)
            .send()
            .await
            .map_err(|e| query_error(sql, e))?;

        let mut envelope: Envelope = response.json().await.map_err(|e| query_error(sql, e))?;
        let mut polls = 0;
        loop {
            match query_step(envelope).map_err(|e| query_error(sql, e))? {
                QueryStep::Done(data) => {
                    if let Some(id) = &data.query_id {
                        debug!(query_id = %id, "Statement completed");
                    }
                    return Ok(data);
                }
                QueryStep::Pending(result_url) => {
                    polls += 1;
                    if polls > MAX_RESULT_POLLS {
                        return Err(query_error(
                            sql,
                            format!("query still in progress after {MAX_RESULT_POLLS} polls"),
                        ));
                    }
                    debug!(polls, "Statement still running, polling {}", result_url);
                    tokio::time::sleep(poll_delay(polls)).await;
                    envelope = self
                        .fetch_result(&result_url)
                        .await
                        .map_err(|e| query_error(sql, e))?;
                }
            }
        }
    }

    async fn fetch_result(&self, result_url: &str) -> Result<Envelope> {
        let url = result_endpoint(&self.base_url, result_url);
        let envelope: Envelope = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header(ACCEPT, QUERY_ACCEPT)
            .send()
            .await?
            .json()
            .await?;
        Ok(envelope)
    }

    async fn download_chunks(&self, data: &QueryData) -> Result<Vec<Vec<Option<String>>>> {
        let headers = chunk_headers(data)?;
        let mut rows = Vec::new();
        for (idx, chunk) in data.chunks.iter().enumerate() {
            debug!(chunk = idx, "Downloading result chunk");
            let body = self
                .client
                .get(&chunk.url)
                .headers(headers.clone())
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            rows.extend(parse_chunk(&body)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl Session for SnowflakeSession {
    fn dialect(&self) -> Dialect {
        Dialect::Snowflake
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let data = self.run(sql, params).await?;
        Ok(affected_rows(&data))
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let mut data = self.run(sql, params).await?;
        if !data.chunks.is_empty() {
            let extra = self.download_chunks(&data).await?;
            data.rowset.extend(extra);
        }
        decode_rows(&data.rowtype, data.rowset)
    }

    async fn close(&self) -> Result<()> {
        let url = format!("{}/session", self.base_url);
        let request_id = Uuid::new_v4().to_string();
        let response = self
            .client
            .post(&url)
            .query(&[("delete", "true"), ("request_id", request_id.as_str())])
            .header(AUTHORIZATION, self.auth_header())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let envelope: Envelope = response.json().await?;
        if !envelope.success {
            return Err(WarehouseError::Connection(format!(
                "Session close rejected: {}",
                envelope.failure()
            )));
        }
        debug!("Snowflake session closed");
        Ok(())
    }
}

fn login_body(cfg: &SnowflakeConfig) -> Value {
    // The login endpoint wants the bare account locator, without region or cloud suffix.
    let account_name = cfg.account.split('.').next().unwrap_or(&cfg.account);
    json!({
        "data": {
            "CLIENT_APP_ID": CLIENT_APP_ID,
            "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
            "ACCOUNT_NAME": account_name,
            "LOGIN_NAME": cfg.user,
            "PASSWORD": cfg.password,
            "CLIENT_ENVIRONMENT": {
                "APPLICATION": CLIENT_APP_ID,
                "OS": std::env::consts::OS,
            },
            "SESSION_PARAMETERS": {
                "QUERY_RESULT_FORMAT": "JSON",
            },
        }
    })
}

/// Positional bindings keyed "1", "2", ... with Snowflake type names.
fn bindings(params: &[SqlValue]) -> Value {
    let mut map = Map::new();
    for (idx, param) in params.iter().enumerate() {
        let (kind, value) = match param {
            SqlValue::Null => ("TEXT", Value::Null),
            SqlValue::Text(s) => ("TEXT", Value::String(s.clone())),
            SqlValue::Integer(i) => ("FIXED", Value::String(i.to_string())),
            SqlValue::Real(f) => ("REAL", Value::String(f.to_string())),
            SqlValue::Boolean(b) => ("BOOLEAN", Value::String(b.to_string())),
        };
        map.insert((idx + 1).to_string(), json!({ "type": kind, "value": value }));
    }
    Value::Object(map)
}

fn chunk_headers(data: &QueryData) -> Result<HeaderMap> {
    let mut pairs: Vec<(String, String)> = data
        .chunk_headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if pairs.is_empty() {
        if let Some(qrmk) = &data.qrmk {
            pairs.push((
                "x-amz-server-side-encryption-customer-algorithm".to_string(),
                "AES256".to_string(),
            ));
            pairs.push((
                "x-amz-server-side-encryption-customer-key".to_string(),
                qrmk.clone(),
            ));
        }
    }

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| WarehouseError::Query(format!("Bad chunk header name {name}: {e}")))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|e| WarehouseError::Query(format!("Bad chunk header value: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Chunk bodies are comma-separated JSON arrays without the enclosing brackets.
fn parse_chunk(body: &str) -> Result<Vec<Vec<Option<String>>>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&format!("[{trimmed}]"))?)
}

fn affected_rows(data: &QueryData) -> u64 {
    let counts_rows = data
        .rowtype
        .first()
        .map(|c| c.name.to_ascii_lowercase().starts_with("number of rows"))
        .unwrap_or(false);
    if !counts_rows {
        return 0;
    }
    data.rowset
        .first()
        .and_then(|row| row.first())
        .and_then(|cell| cell.as_deref())
        .and_then(|cell| cell.parse().ok())
        .unwrap_or(0)
}

fn decode_rows(rowtype: &[ColumnType], rowset: Vec<Vec<Option<String>>>) -> Result<Vec<Row>> {
    let columns: Arc<[String]> = rowtype.iter().map(|c| c.name.clone()).collect();
    rowset
        .into_iter()
        .map(|cells| {
            if cells.len() != rowtype.len() {
                return Err(WarehouseError::Query(format!(
                    "Row has {} cells but result declares {} columns",
                    cells.len(),
                    rowtype.len()
                )));
            }
            let values = cells
                .into_iter()
                .zip(rowtype)
                .map(|(cell, column)| decode_cell(cell, column))
                .collect();
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

fn decode_cell(cell: Option<String>, column: &ColumnType) -> SqlValue {
    let Some(raw) = cell else {
        return SqlValue::Null;
    };
    let parsed = match column.kind.as_str() {
        "fixed" if column.scale.unwrap_or(0) == 0 => raw.parse().ok().map(SqlValue::Integer),
        "fixed" | "real" => raw.parse().ok().map(SqlValue::Real),
        "boolean" => match raw.as_str() {
            "1" | "true" | "TRUE" => Some(SqlValue::Boolean(true)),
            "0" | "false" | "FALSE" => Some(SqlValue::Boolean(false)),
            _ => None,
        },
        _ => None,
    };
    parsed.unwrap_or(SqlValue::Text(raw))
}
