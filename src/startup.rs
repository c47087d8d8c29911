//! Process-wide initialization, run once at the top of every binary.

use crate::logging;
use tracing::{debug, warn};

/// Which environment file a process reads its credentials from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFile {
    /// `local.env`, read by the ingestion and maintenance tools.
    Ingest,
    /// `.env.local`, read by the dashboard.
    Dashboard,
}

impl EnvFile {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Ingest => "local.env",
            Self::Dashboard => ".env.local",
        }
    }
}

/// Load the environment file (if present) and install logging.
///
/// Variables already set in the process environment win over the file.
pub fn init(env_file: EnvFile) {
    let loaded = dotenv::from_filename(env_file.file_name());
    logging::init_logging();

    match loaded {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(dotenv::Error::Io(_)) => {
            debug!("No {} found, using process environment", env_file.file_name())
        }
        Err(e) => warn!("Could not parse {}: {}", env_file.file_name(), e),
    }
}
