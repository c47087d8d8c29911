use anyhow::Result;
use clap::Parser;
use culture_warehouse::config::Settings;
use culture_warehouse::schema::Table;
use culture_warehouse::startup::{self, EnvFile};
use culture_warehouse::verify::{count_rows, tourism_rows_per_state, verify_all};
use culture_warehouse::warehouse::{connect_from_env, release, Session};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "verify-data")]
#[command(about = "Print sample rows from both warehouse tables")]
struct Cli {
    /// Number of sample rows per table
    #[arg(short, long)]
    limit: Option<usize>,

    /// Also print row counts and tourism rows per state
    #[arg(long)]
    counts: bool,

    /// Settings file (defaults to culture_warehouse.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

async fn print_counts(session: &dyn Session) {
    for table in Table::ALL {
        match count_rows(session, table).await {
            Ok(count) => println!("{table}: {count} rows"),
            Err(e) => warn!("Could not count rows in {}: {}", table, e),
        }
    }
    match tourism_rows_per_state(session).await {
        Ok(per_state) => {
            println!("\nTourism rows per state:");
            for (state, count) in per_state {
                println!("  {state}: {count}");
            }
        }
        Err(e) => warn!("Could not count tourism rows per state: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    startup::init(EnvFile::Ingest);

    let settings = Settings::load(cli.config.as_deref())?;
    let limit = cli.limit.unwrap_or(settings.verify.sample_limit);

    let session = match connect_from_env().await {
        Ok(session) => session,
        Err(e) => {
            error!("Error connecting to the warehouse: {}", e);
            return Err(e.into());
        }
    };

    let results = verify_all(session.as_ref(), limit).await;
    if cli.counts {
        print_counts(session.as_ref()).await;
    }
    release(session).await;

    for result in &results {
        println!("\nSample data from {}:", result.table);
        for row in &result.rows {
            println!("{row}");
        }
    }

    if results.iter().all(|r| r.verified) {
        info!("Data verification completed successfully");
    } else {
        warn!("Data verification failed: at least one table is empty or unreadable");
    }
    Ok(())
}
