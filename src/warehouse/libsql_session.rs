use super::{query_error, Dialect, Row, Session, SqlValue};
use crate::error::{Result, WarehouseError};
use async_trait::async_trait;
use libsql::{params::Params, Builder, Connection, Database, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Session on a libSQL database: a remote Turso instance or a local file.
pub struct LibsqlSession {
    // Held so the database outlives the connection.
    _db: Database,
    conn: Connection,
}

impl LibsqlSession {
    /// `libsql://`, `http(s)://` URLs go to Turso; anything else is a local
    /// path, with an optional `file:` prefix.
    pub async fn open(url: &str, auth_token: Option<&str>) -> Result<Self> {
        if url.starts_with("libsql://") || url.starts_with("https://") || url.starts_with("http://") {
            info!("Connecting to Turso database at {}", url);
            let db = Builder::new_remote(url.to_string(), auth_token.unwrap_or_default().to_string())
                .build()
                .await
                .map_err(|e| WarehouseError::Connection(format!("Failed to connect to database: {e}")))?;
            return Self::from_database(db);
        }

        let path = url.strip_prefix("file:").unwrap_or(url);
        Self::open_local(Path::new(path)).await
    }

    pub async fn open_local(path: &Path) -> Result<Self> {
        info!("Opening local libSQL database {}", path.display());
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| WarehouseError::Connection(format!("Failed to open {}: {e}", path.display())))?;
        Self::from_database(db)
    }

    fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| WarehouseError::Connection(format!("Failed to get database connection: {e}")))?;
        Ok(Self { _db: db, conn })
    }
}

fn to_params(params: &[SqlValue]) -> Params {
    Params::Positional(
        params
            .iter()
            .map(|p| match p {
                SqlValue::Null => Value::Null,
                SqlValue::Text(s) => Value::Text(s.clone()),
                SqlValue::Integer(i) => Value::Integer(*i),
                SqlValue::Real(f) => Value::Real(*f),
                SqlValue::Boolean(b) => Value::Integer(i64::from(*b)),
            })
            .collect(),
    )
}

fn from_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(i),
        Value::Real(f) => SqlValue::Real(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(bytes) => SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

#[async_trait]
impl Session for LibsqlSession {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.conn
            .execute(sql, to_params(params))
            .await
            .map_err(|e| query_error(sql, e))
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let mut rows = self
            .conn
            .query(sql, to_params(params))
            .await
            .map_err(|e| query_error(sql, e))?;

        let count = rows.column_count();
        let columns: Arc<[String]> = (0..count)
            .map(|idx| rows.column_name(idx).unwrap_or_default().to_string())
            .collect();

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| query_error(sql, e))? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..count {
                let value = row.get_value(idx).map_err(|e| query_error(sql, e))?;
                values.push(from_value(value));
            }
            results.push(Row::new(columns.clone(), values));
        }
        Ok(results)
    }

    async fn close(&self) -> Result<()> {
        // Dropping the connection is enough for libSQL.
        Ok(())
    }
}
