use anyhow::Result;
use clap::Parser;
use culture_warehouse::config::Settings;
use culture_warehouse::ingest::financial::FINANCIAL;
use culture_warehouse::ingest::tourism::TOURISM;
use culture_warehouse::ingest::{ingest_dir, IngestSummary};
use culture_warehouse::startup::{self, EnvFile};
use culture_warehouse::warehouse::{connect_from_env, release, Session};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "upload-data")]
#[command(about = "Load the financial assistance and tourism CSV files into the warehouse")]
struct Cli {
    /// Directory of financial assistance CSV files
    #[arg(long)]
    financial_dir: Option<PathBuf>,

    /// Directory of tourism CSV files
    #[arg(long)]
    tourism_dir: Option<PathBuf>,

    /// Parse and coerce every file without connecting
    #[arg(long)]
    dry_run: bool,

    /// Settings file (defaults to culture_warehouse.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn report(summary: &IngestSummary) {
    for file in &summary.files {
        if file.header_only() {
            warn!("{}: header only, no data rows", file.file);
        } else {
            info!("{}: {} rows", file.file, file.rows);
        }
    }
    info!(
        "{}: {} rows from {} files into {}",
        summary.dataset,
        summary.total_rows(),
        summary.files.len(),
        summary.table
    );
}

async fn upload_all(session: Option<&dyn Session>, financial_dir: &Path, tourism_dir: &Path) -> Result<()> {
    info!("Uploading financial assistance data from {}", financial_dir.display());
    let financial = ingest_dir(&FINANCIAL, financial_dir, session).await?;
    report(&financial);

    info!("Uploading tourism data from {}", tourism_dir.display());
    let tourism = ingest_dir(&TOURISM, tourism_dir, session).await?;
    report(&tourism);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    startup::init(EnvFile::Ingest);

    let settings = Settings::load(cli.config.as_deref())?;
    let financial_dir = cli.financial_dir.unwrap_or(settings.ingest.financial_dir);
    let tourism_dir = cli.tourism_dir.unwrap_or(settings.ingest.tourism_dir);

    if cli.dry_run {
        info!("Dry run: no data will be written");
        return upload_all(None, &financial_dir, &tourism_dir).await.map_err(|e| {
            error!("Dry run failed: {}", e);
            e
        });
    }

    let session = match connect_from_env().await {
        Ok(session) => session,
        Err(e) => {
            error!("Error connecting to the warehouse: {}", e);
            return Err(e.into());
        }
    };

    let result = upload_all(Some(session.as_ref()), &financial_dir, &tourism_dir).await;
    release(session).await;

    match result {
        Ok(()) => {
            info!("Data upload completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Error uploading data: {}", e);
            Err(e)
        }
    }
}
