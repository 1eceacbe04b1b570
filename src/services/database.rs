use crate::config::Config;
use log::info;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

/// Opens the pooled client and pings the server so an unreachable store fails startup.
pub async fn connect_to_database(config: &Config) -> mongodb::error::Result<Database> {
    let mut options = ClientOptions::parse(&config.mongo_uri).await?;
    options.app_name = Some("sui-epoch-indexer".to_string());
    options.max_pool_size = Some(config.mongo_max_pool_size);
    let client = Client::with_options(options)?;

    let db = client.database(&config.db_name);
    db.run_command(doc! { "ping": 1 }).await?;
    info!("Connected to MongoDB database {}", config.db_name);
    Ok(db)
}
