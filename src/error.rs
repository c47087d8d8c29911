use thiserror::Error;

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Missing required environment variables: {}", .missing.join(", "))]
    MissingEnv { missing: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Ingestion error in {file}{}: {message}", .row.map(|r| format!(" at row {r}")).unwrap_or_default())]
    Ingestion {
        file: String,
        row: Option<usize>,
        message: String,
    },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("Server error: {0}")]
    Server(#[from] hyper::Error),

    #[cfg(feature = "db")]
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),
}

impl WarehouseError {
    /// True for errors the user fixes by editing their configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingEnv { .. } | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, WarehouseError>;
