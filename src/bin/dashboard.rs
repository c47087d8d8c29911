use anyhow::Result;
use clap::Parser;
use culture_warehouse::config::Settings;
use culture_warehouse::dashboard::server::{start_server, AppState};
use culture_warehouse::startup::{self, EnvFile};
use culture_warehouse::warehouse::WarehouseConnector;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "dashboard")]
#[command(about = "Serve the tourism and financial assistance dashboard")]
struct Cli {
    /// Port to run the server on
    #[arg(short, long)]
    port: Option<u16>,

    /// Settings file (defaults to culture_warehouse.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    startup::init(EnvFile::Dashboard);

    let settings = Settings::load(cli.config.as_deref())?;
    let port = cli.port.unwrap_or(settings.dashboard.port);

    let state = AppState::from_process_env(Arc::new(WarehouseConnector));
    if let Err(e) = start_server(state, port, &settings.dashboard.frame_ancestors).await {
        error!("Dashboard server stopped: {}", e);
        return Err(e.into());
    }
    Ok(())
}
