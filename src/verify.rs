//! Read-only checks that a load actually landed.

use crate::error::{Result, WarehouseError};
use crate::schema::Table;
use crate::warehouse::{Row, Session};
use tracing::{error, info};

/// Outcome of sampling one table. `verified` means the table is non-empty.
#[derive(Debug, Clone)]
pub struct Verification {
    pub table: Table,
    pub verified: bool,
    pub rows: Vec<Row>,
}

/// Fetch up to `limit` rows from `table`. Query failures are logged and
/// reported as an unverified table rather than returned.
pub async fn verify_table(session: &dyn Session, table: Table, limit: usize) -> Verification {
    let sql = format!("SELECT * FROM {} LIMIT {}", table.name(), limit);
    match session.query(&sql, &[]).await {
        Ok(rows) => {
            info!("Sample data from {}: {} rows", table, rows.len());
            Verification {
                table,
                verified: !rows.is_empty(),
                rows,
            }
        }
        Err(e) => {
            error!("Error verifying table {}: {}", table, e);
            Verification {
                table,
                verified: false,
                rows: Vec::new(),
            }
        }
    }
}

pub async fn verify_all(session: &dyn Session, limit: usize) -> Vec<Verification> {
    let mut results = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        results.push(verify_table(session, table, limit).await);
    }
    results
}

pub async fn count_rows(session: &dyn Session, table: Table) -> Result<i64> {
    let rows = session
        .query(&format!("SELECT COUNT(*) AS ROW_COUNT FROM {}", table.name()), &[])
        .await?;
    rows.first()
        .and_then(|row| row.get("ROW_COUNT"))
        .and_then(|v| v.as_i64())
        .ok_or_else(|| WarehouseError::Query(format!("COUNT(*) on {table} returned no value")))
}

/// Tourism rows per state, ordered by state name.
pub async fn tourism_rows_per_state(session: &dyn Session) -> Result<Vec<(String, i64)>> {
    let rows = session
        .query(
            "SELECT STATE, COUNT(*) AS ROW_COUNT FROM TOURISM_DATA GROUP BY STATE ORDER BY STATE",
            &[],
        )
        .await?;
    rows.iter()
        .map(|row| {
            let state = row
                .get("STATE")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let count = row
                .get("ROW_COUNT")
                .and_then(|v| v.as_i64())
                .ok_or_else(|| WarehouseError::Query("per-state count missing".to_string()))?;
            Ok((state, count))
        })
        .collect()
}
