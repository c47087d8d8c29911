use crate::error::{Result, WarehouseError};
use crate::warehouse::{Row, SqlValue};
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

/// One row of `ART_CULTURE_FINANCIAL_DATA`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialAssistanceRecord {
    pub state_or_territory: String,
    pub fiscal_year: String,
    pub org_count: i64,
    /// Rupees, in lakhs (units of 100,000).
    pub amount_lakhs: f64,
    pub created_at: Option<NaiveDateTime>,
}

/// One row of `TOURISM_DATA`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourismRecord {
    pub state: String,
    pub domestic_visits_millions: Option<f64>,
    pub foreign_visits_millions: Option<f64>,
    pub has_art: Option<bool>,
    pub has_culture: Option<bool>,
    pub has_tourism: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
}

impl FinancialAssistanceRecord {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            state_or_territory: text(row, "STATE_UT")?,
            fiscal_year: text(row, "FINANCIAL_YEAR")?,
            org_count: required(row, "NO_OF_ORGS", SqlValue::as_i64)?,
            amount_lakhs: required(row, "AMOUNT_RS_IN_LAKHS", SqlValue::as_f64)?,
            created_at: timestamp(row, "CREATED_AT"),
        })
    }
}

impl TourismRecord {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            state: text(row, "STATE")?,
            domestic_visits_millions: optional(row, "DOMESTIC_TOURIST_VISITS_MILLION", SqlValue::as_f64)?,
            foreign_visits_millions: optional(row, "FOREIGN_TOURIST_VISITS_MILLION", SqlValue::as_f64)?,
            has_art: optional(row, "HAS_ART", SqlValue::as_bool)?,
            has_culture: optional(row, "HAS_CULTURE", SqlValue::as_bool)?,
            has_tourism: optional(row, "HAS_TOURISM", SqlValue::as_bool)?,
            created_at: timestamp(row, "CREATED_AT"),
        })
    }
}

fn text(row: &Row, column: &str) -> Result<String> {
    match row.get(column) {
        Some(SqlValue::Null) => Ok(String::new()),
        Some(SqlValue::Text(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(missing(column)),
    }
}

fn required<T>(row: &Row, column: &str, convert: fn(&SqlValue) -> Option<T>) -> Result<T> {
    optional(row, column, convert)?
        .ok_or_else(|| WarehouseError::Query(format!("Column {column} is NULL")))
}

/// NULL maps to `None`; a value that does not convert is an error.
fn optional<T>(row: &Row, column: &str, convert: fn(&SqlValue) -> Option<T>) -> Result<Option<T>> {
    let value = row.get(column).ok_or_else(|| missing(column))?;
    if value.is_null() {
        return Ok(None);
    }
    convert(value)
        .map(Some)
        .ok_or_else(|| WarehouseError::Query(format!("Column {column} has unexpected value {value}")))
}

fn missing(column: &str) -> WarehouseError {
    WarehouseError::Query(format!("Result has no column {column}"))
}

/// SQLite returns `YYYY-MM-DD HH:MM:SS`; Snowflake JSON results carry epoch seconds.
fn timestamp(row: &Row, column: &str) -> Option<NaiveDateTime> {
    let raw = row.get(column)?;
    match raw {
        SqlValue::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .or_else(|| {
                let secs: f64 = s.parse().ok()?;
                let nanos = (secs.fract() * 1e9) as u32;
                DateTime::from_timestamp(secs.trunc() as i64, nanos).map(|dt| dt.naive_utc())
            }),
        SqlValue::Integer(secs) => DateTime::from_timestamp(*secs, 0).map(|dt| dt.naive_utc()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn row(columns: &[&str], values: Vec<SqlValue>) -> Row {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        Row::new(columns, values)
    }

    #[test]
    fn test_financial_from_row() {
        let r = row(
            &["STATE_UT", "FINANCIAL_YEAR", "NO_OF_ORGS", "AMOUNT_RS_IN_LAKHS", "CREATED_AT"],
            vec![
                "Goa".into(),
                "2020-21".into(),
                SqlValue::Integer(3),
                SqlValue::Real(12.5),
                "2024-03-01 10:15:00".into(),
            ],
        );
        let record = FinancialAssistanceRecord::from_row(&r).unwrap();
        assert_eq!(record.state_or_territory, "Goa");
        assert_eq!(record.org_count, 3);
        assert_eq!(record.amount_lakhs, 12.5);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_tourism_from_row_keeps_nulls() {
        let r = row(
            &[
                "STATE",
                "DOMESTIC_TOURIST_VISITS_MILLION",
                "FOREIGN_TOURIST_VISITS_MILLION",
                "HAS_ART",
                "HAS_CULTURE",
                "HAS_TOURISM",
            ],
            vec![
                "Kerala".into(),
                SqlValue::Real(38.5),
                SqlValue::Null,
                SqlValue::Null,
                SqlValue::Integer(1),
                SqlValue::Boolean(false),
            ],
        );
        let record = TourismRecord::from_row(&r).unwrap();
        assert_eq!(record.foreign_visits_millions, None);
        assert_eq!(record.has_art, None);
        assert_eq!(record.has_culture, Some(true));
        assert_eq!(record.has_tourism, Some(false));
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn test_epoch_timestamps() {
        let r = row(&["CREATED_AT"], vec!["1700000000.500000000".into()]);
        let ts = timestamp(&r, "CREATED_AT").unwrap();
        assert_eq!(ts.and_utc().timestamp(), 1_700_000_000);
    }
}
