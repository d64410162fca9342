use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::store::StoreError;

const SERVER_SELECTION_TIMEOUT_SECS: u64 = 10;

/// Connects to the cluster and binds the configured database.
///
/// The connection is verified with a `ping` so an unreachable cluster fails
/// startup instead of the first request.
pub async fn connect(config: &DatabaseConfig) -> Result<Database, StoreError> {
    let mut options = ClientOptions::parse(&config.uri).await?;
    options.app_name = Some(config.app_name.clone());
    options.server_selection_timeout = Some(Duration::from_secs(SERVER_SELECTION_TIMEOUT_SECS));

    let client = Client::with_options(options)?;
    let database = client.database(&config.database);

    database.run_command(doc! { "ping": 1 }).await?;

    info!(database = %config.database, "Successfully connected to database");
    Ok(database)
}
