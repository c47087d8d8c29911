//! Sessions against the warehouse.
//!
//! A [`Session`] is the live, credentialed handle every operation runs on.
//! Callers open one through a [`Connector`] and must hand it back to
//! [`release`] on every exit path.

#[cfg(feature = "db")]
pub mod libsql_session;
pub mod snowflake;

use crate::config::WarehouseTarget;
use crate::error::{Result, WarehouseError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// A single bound parameter or result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Booleans come back as integers from libSQL and as text from some drivers.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::Integer(i) => Some(*i != 0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One result row. Column names are shared by every row of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Case-insensitive lookup by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, value) in self.values.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

/// SQL flavor of the backend behind a session, for the few statements that differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Snowflake,
    Sqlite,
}

/// A live warehouse session.
#[async_trait]
pub trait Session: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run a statement with positional `?` parameters; returns affected rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run a query with positional `?` parameters and collect every row.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// End the session on the server side.
    async fn close(&self) -> Result<()>;
}

/// Opens sessions for a target.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &WarehouseTarget) -> Result<Box<dyn Session>>;
}

/// Connector for the real backends.
#[derive(Debug, Clone, Default)]
pub struct WarehouseConnector;

#[async_trait]
impl Connector for WarehouseConnector {
    async fn connect(&self, target: &WarehouseTarget) -> Result<Box<dyn Session>> {
        info!("Opening warehouse session ({})", target.describe());
        match target {
            WarehouseTarget::Snowflake(cfg) => {
                let session = snowflake::SnowflakeSession::login(cfg).await?;
                Ok(Box::new(session))
            }
            #[cfg(feature = "db")]
            WarehouseTarget::Libsql { url, auth_token } => {
                let session = libsql_session::LibsqlSession::open(url, auth_token.as_deref()).await?;
                Ok(Box::new(session))
            }
            #[cfg(not(feature = "db"))]
            WarehouseTarget::Libsql { .. } => Err(WarehouseError::Config(
                "LIBSQL_URL is set but this build does not include the `db` feature".to_string(),
            )),
        }
    }
}

/// Resolve the target from the process environment and open a session.
pub async fn connect_from_env() -> Result<Box<dyn Session>> {
    let target = WarehouseTarget::from_env()?;
    WarehouseConnector.connect(&target).await
}

/// Close a session, logging rather than failing if the server rejects it.
pub async fn release(session: Box<dyn Session>) {
    if let Err(e) = session.close().await {
        warn!("Failed to close warehouse session: {}", e);
    }
}

/// Shorthand for a failed statement.
pub(crate) fn query_error(sql: &str, err: impl fmt::Display) -> WarehouseError {
    let head: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let head: String = head.chars().take(80).collect();
    WarehouseError::Query(format!("{err} (statement: {head})"))
}
