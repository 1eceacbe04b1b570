use super::{system_state_repository, validators_data_repository, BatchOutcome, EpochStore};
use crate::errors::StoreError;
use crate::models::{ExchangeRateSample, ValidatorSnapshot};
use async_trait::async_trait;
use log::{error, info};
use mongodb::Database;
use std::collections::HashSet;

/// `EpochStore` over the `system_state` and `validators_data` collections.
///
/// Every call checks a connection out of the driver's pool for one command.
#[derive(Clone)]
pub struct MongoEpochStore {
    db: Database,
}

impl MongoEpochStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EpochStore for MongoEpochStore {
    async fn latest_snapshot_epoch(&self, network: &str) -> Result<Option<u64>, StoreError> {
        system_state_repository::get_latest_epoch(&self.db, network).await
    }

    async fn upsert_snapshots(
        &self,
        snapshots: &[ValidatorSnapshot],
    ) -> Result<BatchOutcome, StoreError> {
        let mut outcome = BatchOutcome::default();
        for snapshot in snapshots {
            match system_state_repository::upsert_snapshot(&self.db, snapshot).await {
                Ok(()) => {
                    outcome.written += 1;
                    info!(
                        "Data for {} for validator {} - {} - stored",
                        snapshot.epoch, snapshot.name, snapshot.sui_address
                    );
                }
                Err(e) => {
                    outcome.failed += 1;
                    error!(
                        "Failed to store validator {} for epoch {} on {}: {}",
                        snapshot.sui_address, snapshot.epoch, snapshot.network, e
                    );
                }
            }
        }
        Ok(outcome)
    }

    async fn apply_apy(
        &self,
        network: &str,
        epoch: u64,
        address: &str,
        apy: f64,
    ) -> Result<bool, StoreError> {
        system_state_repository::set_apy(&self.db, network, epoch, address, apy).await
    }

    async fn epoch_missing_apy(&self, network: &str, epoch: u64) -> Result<bool, StoreError> {
        Ok(system_state_repository::count_missing_apy(&self.db, network, epoch).await? > 0)
    }

    async fn pending_rate_change_epochs(&self, network: &str) -> Result<Vec<u64>, StoreError> {
        system_state_repository::get_epochs_missing_rate_change(&self.db, network).await
    }

    async fn epoch_snapshots(
        &self,
        network: &str,
        epoch: u64,
    ) -> Result<Vec<ValidatorSnapshot>, StoreError> {
        system_state_repository::get_epoch_snapshots(&self.db, network, epoch).await
    }

    async fn apply_rate_change(
        &self,
        network: &str,
        epoch: u64,
        address: &str,
        delta: f64,
    ) -> Result<(), StoreError> {
        system_state_repository::set_rate_change(&self.db, network, epoch, address, delta).await
    }

    async fn known_epochs(&self, exchange_rates_id: &str) -> Result<HashSet<u64>, StoreError> {
        validators_data_repository::get_epochs(&self.db, exchange_rates_id).await
    }

    async fn insert_sample_if_absent(
        &self,
        sample: &ExchangeRateSample,
    ) -> Result<bool, StoreError> {
        validators_data_repository::insert_if_absent(&self.db, sample).await
    }

    async fn samples_for_collection(
        &self,
        exchange_rates_id: &str,
    ) -> Result<Vec<ExchangeRateSample>, StoreError> {
        validators_data_repository::get_samples(&self.db, exchange_rates_id).await
    }
}
