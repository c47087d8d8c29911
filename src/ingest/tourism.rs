use super::{ingest_dir, ColumnKind, ColumnSpec, Dataset, IngestSummary};
use crate::error::Result;
use crate::schema::Table;
use crate::warehouse::Session;
use std::path::Path;

// Only the state is mandatory; per-state files often lack the visit or feature columns.
const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { source: "State", target: "STATE", kind: ColumnKind::Text, required: true },
    ColumnSpec {
        source: "Domestic Tourist Visits (million)",
        target: "DOMESTIC_TOURIST_VISITS_MILLION",
        kind: ColumnKind::NullableFloat,
        required: false,
    },
    ColumnSpec {
        source: "Foreign Tourist Visits (million)",
        target: "FOREIGN_TOURIST_VISITS_MILLION",
        kind: ColumnKind::NullableFloat,
        required: false,
    },
    ColumnSpec { source: "Art", target: "HAS_ART", kind: ColumnKind::YesNo, required: false },
    ColumnSpec { source: "Culture", target: "HAS_CULTURE", kind: ColumnKind::YesNo, required: false },
    ColumnSpec { source: "Tourism", target: "HAS_TOURISM", kind: ColumnKind::YesNo, required: false },
];

/// Tourist visit statistics and cultural feature flags, per state.
pub const TOURISM: Dataset = Dataset {
    name: "tourism",
    table: Table::Tourism,
    columns: COLUMNS,
};

pub async fn upload_tourism_data(session: &dyn Session, dir: &Path) -> Result<IngestSummary> {
    ingest_dir(&TOURISM, dir, Some(session)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testing::RecordingSession;
    use crate::ingest::ingest_dir;
    use crate::warehouse::SqlValue;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_art_column_is_null() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Kerala_Tourism_Data.csv"),
            "State,Domestic Tourist Visits (million),Foreign Tourist Visits (million),Culture,Tourism\n\
             Kerala,38.5,,YES,no\n",
        )
        .unwrap();

        let session = RecordingSession::new();
        let statements = session.statements.clone();
        upload_tourism_data(&session, dir.path()).await.unwrap();

        let statements = statements.lock().await;
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].1,
            vec![
                SqlValue::Text("Kerala".to_string()),
                SqlValue::Real(38.5),
                SqlValue::Null,
                SqlValue::Null,
                SqlValue::Boolean(true),
                SqlValue::Boolean(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_headers_are_ignored() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Goa_Tourism_Data.csv"),
            "Sl. No.,State,Art\n1,Goa, yes \n",
        )
        .unwrap();

        let session = RecordingSession::new();
        let statements = session.statements.clone();
        upload_tourism_data(&session, dir.path()).await.unwrap();

        let statements = statements.lock().await;
        assert_eq!(statements[0].1[0], SqlValue::Text("Goa".to_string()));
        assert_eq!(statements[0].1[3], SqlValue::Boolean(true));
    }

    #[tokio::test]
    async fn test_dry_run_reports_header_only_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Bihar_Tourism_Data.csv"), "State,Art,Culture,Tourism\n").unwrap();
        fs::write(
            dir.path().join("Goa_Tourism_Data.csv"),
            "State,Art,Culture,Tourism\nGoa,Yes,Yes,Yes\n",
        )
        .unwrap();

        let summary = ingest_dir(&TOURISM, dir.path(), None).await.unwrap();
        assert_eq!(summary.files.len(), 2);
        assert!(summary.files[0].header_only());
        assert_eq!(summary.files[1].rows, 1);
        assert_eq!(summary.total_rows(), 1);
    }
}
