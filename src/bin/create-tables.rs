use anyhow::Result;
use culture_warehouse::schema::create_tables;
use culture_warehouse::startup::{self, EnvFile};
use culture_warehouse::warehouse::{connect_from_env, release};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    startup::init(EnvFile::Ingest);

    let session = match connect_from_env().await {
        Ok(session) => session,
        Err(e) => {
            error!("Error connecting to the warehouse: {}", e);
            return Err(e.into());
        }
    };

    let result = create_tables(session.as_ref()).await;
    release(session).await;

    if let Err(e) = result {
        error!("Error creating tables: {}", e);
        return Err(e.into());
    }
    Ok(())
}
