use anyhow::Result;
use clap::Parser;
use culture_warehouse::schema::clear_tables;
use culture_warehouse::startup::{self, EnvFile};
use culture_warehouse::warehouse::{connect_from_env, release};
use tracing::error;

#[derive(Parser)]
#[command(name = "clear-tables")]
#[command(about = "Delete every row from both warehouse tables")]
struct Cli {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    startup::init(EnvFile::Ingest);

    if !cli.yes {
        println!("WARNING: This will delete ALL rows from ART_CULTURE_FINANCIAL_DATA and TOURISM_DATA!");
        println!("Press Enter to continue or Ctrl+C to cancel...");
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
    }

    let session = match connect_from_env().await {
        Ok(session) => session,
        Err(e) => {
            error!("Error connecting to the warehouse: {}", e);
            return Err(e.into());
        }
    };

    let result = clear_tables(session.as_ref()).await;
    release(session).await;

    if let Err(e) = result {
        error!("Error clearing tables: {}", e);
        return Err(e.into());
    }
    Ok(())
}
