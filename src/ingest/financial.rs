use super::{ingest_dir, ColumnKind, ColumnSpec, Dataset, IngestSummary};
use crate::error::Result;
use crate::schema::Table;
use crate::warehouse::Session;
use std::path::Path;

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { source: "State/UT", target: "STATE_UT", kind: ColumnKind::Text, required: true },
    ColumnSpec { source: "Financial Year", target: "FINANCIAL_YEAR", kind: ColumnKind::Text, required: true },
    ColumnSpec { source: "No. of Orgs", target: "NO_OF_ORGS", kind: ColumnKind::Integer, required: true },
    ColumnSpec { source: "Amount (Rs in lakhs)", target: "AMOUNT_RS_IN_LAKHS", kind: ColumnKind::Float, required: true },
];

/// Financial assistance for art and culture promotion, per state and year.
pub const FINANCIAL: Dataset = Dataset {
    name: "financial",
    table: Table::Financial,
    columns: COLUMNS,
};

pub async fn upload_financial_data(session: &dyn Session, dir: &Path) -> Result<IngestSummary> {
    ingest_dir(&FINANCIAL, dir, Some(session)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WarehouseError;
    use crate::ingest::testing::RecordingSession;
    use crate::warehouse::SqlValue;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "State/UT,Financial Year,No. of Orgs,Amount (Rs in lakhs)\n";

    #[tokio::test]
    async fn test_goa_row_maps_to_columns() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("2020.csv"), format!("{HEADER}Goa,2020-21,3,12.5\n")).unwrap();

        let session = RecordingSession::new();
        let statements = session.statements.clone();
        let summary = upload_financial_data(&session, dir.path()).await.unwrap();
        assert_eq!(summary.total_rows(), 1);

        let statements = statements.lock().await;
        assert_eq!(statements.len(), 1);
        let (sql, params) = &statements[0];
        assert_eq!(
            sql,
            "INSERT INTO ART_CULTURE_FINANCIAL_DATA (STATE_UT, FINANCIAL_YEAR, NO_OF_ORGS, AMOUNT_RS_IN_LAKHS) VALUES (?, ?, ?, ?)"
        );
        assert_eq!(
            params,
            &vec![
                SqlValue::Text("Goa".to_string()),
                SqlValue::Text("2020-21".to_string()),
                SqlValue::Integer(3),
                SqlValue::Real(12.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_directory_inserts_nothing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), "not data").unwrap();

        let session = RecordingSession::new();
        let statements = session.statements.clone();
        let summary = upload_financial_data(&session, dir.path()).await.unwrap();

        assert!(summary.files.is_empty());
        assert_eq!(summary.total_rows(), 0);
        assert!(statements.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_row_aborts_file_with_context() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("bad.csv"),
            format!("{HEADER}Goa,2020-21,3,12.5\nKerala,2020-21,many,4.0\nBihar,2020-21,1,1.0\n"),
        )
        .unwrap();

        let session = RecordingSession::new();
        let statements = session.statements.clone();
        let err = upload_financial_data(&session, dir.path()).await.unwrap_err();

        match &err {
            WarehouseError::Ingestion { file, row, message } => {
                assert_eq!(file, "bad.csv");
                assert_eq!(*row, Some(2));
                assert!(message.contains("No. of Orgs"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("bad.csv at row 2"));
        // The row before the failure stays inserted.
        assert_eq!(statements.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_required_header_fails_before_inserting() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("short.csv"), "State/UT,Financial Year\nGoa,2020-21\n").unwrap();

        let session = RecordingSession::new();
        let statements = session.statements.clone();
        let err = upload_financial_data(&session, dir.path()).await.unwrap_err();

        match err {
            WarehouseError::Ingestion { row, message, .. } => {
                assert_eq!(row, None);
                assert!(message.contains("No. of Orgs"));
                assert!(message.contains("Amount (Rs in lakhs)"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(statements.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_is_an_ingestion_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("ok.csv"),
            format!("{HEADER}Goa,2020-21,3,12.5\nKerala,2021-22,5,40\n"),
        )
        .unwrap();

        let mut session = RecordingSession::new();
        session.fail_on = Some(2);
        let err = upload_financial_data(&session, dir.path()).await.unwrap_err();
        assert!(matches!(err, WarehouseError::Ingestion { row: Some(2), .. }));
    }
}
