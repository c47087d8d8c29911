//! The two fixed tables and the statements that create and empty them.

use crate::error::{Result, WarehouseError};
use crate::warehouse::{Dialect, Session, SqlValue};
use std::fmt;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Financial,
    Tourism,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::Financial, Table::Tourism];

    pub fn name(self) -> &'static str {
        match self {
            Self::Financial => "ART_CULTURE_FINANCIAL_DATA",
            Self::Tourism => "TOURISM_DATA",
        }
    }

    // CURRENT_TIMESTAMP without parentheses is accepted by Snowflake and SQLite alike.
    pub fn create_statement(self) -> &'static str {
        match self {
            Self::Financial => {
                "CREATE TABLE IF NOT EXISTS ART_CULTURE_FINANCIAL_DATA (
                    STATE_UT VARCHAR,
                    FINANCIAL_YEAR VARCHAR,
                    NO_OF_ORGS INTEGER,
                    AMOUNT_RS_IN_LAKHS FLOAT,
                    CREATED_AT TIMESTAMP_NTZ DEFAULT CURRENT_TIMESTAMP
                )"
            }
            Self::Tourism => {
                "CREATE TABLE IF NOT EXISTS TOURISM_DATA (
                    STATE VARCHAR,
                    DOMESTIC_TOURIST_VISITS_MILLION FLOAT,
                    FOREIGN_TOURIST_VISITS_MILLION FLOAT,
                    HAS_ART BOOLEAN,
                    HAS_CULTURE BOOLEAN,
                    HAS_TOURISM BOOLEAN,
                    CREATED_AT TIMESTAMP_NTZ DEFAULT CURRENT_TIMESTAMP
                )"
            }
        }
    }

    /// `INSERT` with one `?` per listed column.
    pub fn insert_statement(self, columns: &[&str]) -> String {
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name(),
            columns.join(", "),
            placeholders
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ensure both tables exist. Safe to run repeatedly.
pub async fn create_tables(session: &dyn Session) -> Result<()> {
    for table in Table::ALL {
        session
            .execute(table.create_statement(), &[])
            .await
            .map_err(|e| {
                error!("Error creating table {}: {}", table, e);
                WarehouseError::Schema(format!("Failed to create {table}: {e}"))
            })?;
    }
    info!("Tables created successfully");
    Ok(())
}

/// Delete every row from both tables. Missing tables are skipped.
pub async fn clear_tables(session: &dyn Session) -> Result<()> {
    for table in Table::ALL {
        clear_table(session, table).await.map_err(|e| {
            error!("Error clearing table {}: {}", table, e);
            WarehouseError::Schema(format!("Failed to clear {table}: {e}"))
        })?;
    }
    info!("Tables cleared successfully");
    Ok(())
}

async fn clear_table(session: &dyn Session, table: Table) -> Result<()> {
    match session.dialect() {
        Dialect::Snowflake => {
            session
                .execute(&format!("TRUNCATE TABLE IF EXISTS {}", table.name()), &[])
                .await?;
        }
        Dialect::Sqlite => {
            if table_exists(session, table).await? {
                session
                    .execute(&format!("DELETE FROM {}", table.name()), &[])
                    .await?;
            }
        }
    }
    Ok(())
}

pub async fn table_exists(session: &dyn Session, table: Table) -> Result<bool> {
    let rows = match session.dialect() {
        Dialect::Snowflake => {
            session
                .query(
                    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                     WHERE TABLE_SCHEMA = CURRENT_SCHEMA() AND TABLE_NAME = ?",
                    &[SqlValue::from(table.name())],
                )
                .await?
        }
        Dialect::Sqlite => {
            session
                .query(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                    &[SqlValue::from(table.name())],
                )
                .await?
        }
    };
    Ok(!rows.is_empty())
}
