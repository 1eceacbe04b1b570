use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

mod config;
mod errors;
mod models;
mod repositories;
mod services;
#[cfg(test)]
mod testing;
mod utils;

use crate::config::Config;
use crate::repositories::{EpochStore, MongoEpochStore};
use crate::services::epoch_processor::{EpochProcessor, SyncOptions};
use crate::services::jobs::{EpochCountdownJob, RateChangeJob, SyncJob};
use crate::services::scheduler::Scheduler;
use crate::services::sui_rpc::{RetryPolicy, SuiRpcClient};
use crate::services::database;

const SCHEDULER_TICK: Duration = Duration::from_secs(1);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("{}", "-".repeat(40));
    info!("Sui epoch indexer");
    info!("{}", "-".repeat(40));

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    info!("Collecting {} from {}", config.network, config.rpc_url);

    let rpc = Arc::new(SuiRpcClient::connect(
        &config.rpc_url,
        config.rpc_timeout,
        RetryPolicy {
            max_attempts: config.rpc_max_attempts,
            backoff_base: config.rpc_backoff_base,
        },
    )?);

    let db = database::connect_to_database(&config).await.map_err(|e| {
        error!("Cannot reach MongoDB: {}", e);
        e
    })?;
    let store: Arc<dyn EpochStore> = Arc::new(MongoEpochStore::new(db));

    let processor = Arc::new(EpochProcessor::new(
        Arc::clone(&rpc),
        store,
        SyncOptions::from(&config),
    ));

    let mut scheduler = Scheduler::new(SCHEDULER_TICK);
    scheduler
        .every_starting_now(config.sync_interval, SyncJob::new(Arc::clone(&processor)))
        .every(config.rate_change_interval, RateChangeJob::new(processor))
        .every(config.countdown_interval, EpochCountdownJob::new(rpc));

    scheduler.run_forever().await;
    Ok(())
}
