use anyhow::Result;
use culture_warehouse::config::WarehouseTarget;
use culture_warehouse::startup::{self, EnvFile};
use culture_warehouse::warehouse::{release, Connector, WarehouseConnector};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    startup::init(EnvFile::Ingest);

    let target = match WarehouseTarget::from_env() {
        Ok(target) => target,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    info!("Connecting to {}...", target.describe());
    let session = match WarehouseConnector.connect(&target).await {
        Ok(session) => session,
        Err(e) => {
            error!("Error connecting to the warehouse: {}", e);
            return Err(e.into());
        }
    };

    let probe = session.query("SELECT 1 AS OK", &[]).await;
    release(session).await;

    match probe {
        Ok(_) => {
            info!("Successfully connected to {}", target.describe());
            Ok(())
        }
        Err(e) => {
            error!("Connected, but a test query failed: {}", e);
            Err(e.into())
        }
    }
}
