mod mongo_store;
pub mod system_state_repository;
pub mod validators_data_repository;

use crate::errors::StoreError;
use crate::models::{ExchangeRateSample, ValidatorSnapshot};
use async_trait::async_trait;
use mongodb::bson::Bson;
use std::collections::HashSet;

pub use mongo_store::MongoEpochStore;

/// Result of a batch write where each row commits on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub written: usize,
    pub failed: usize,
}

/// Persistence used by the sync engine.
///
/// Every write is independently committed; no call spans a transaction.
#[async_trait]
pub trait EpochStore: Send + Sync {
    async fn latest_snapshot_epoch(&self, network: &str) -> Result<Option<u64>, StoreError>;

    /// Inserts or refreshes rows keyed by (epoch, network, sui_address).
    /// Existing `apy` and `rate_change` values are left untouched.
    async fn upsert_snapshots(
        &self,
        snapshots: &[ValidatorSnapshot],
    ) -> Result<BatchOutcome, StoreError>;

    /// Sets `apy` on a row that has none yet; returns whether such a row existed.
    async fn apply_apy(
        &self,
        network: &str,
        epoch: u64,
        address: &str,
        apy: f64,
    ) -> Result<bool, StoreError>;

    async fn epoch_missing_apy(&self, network: &str, epoch: u64) -> Result<bool, StoreError>;

    /// Epochs with at least one row whose `rate_change` is unset, ascending.
    async fn pending_rate_change_epochs(&self, network: &str) -> Result<Vec<u64>, StoreError>;

    async fn epoch_snapshots(
        &self,
        network: &str,
        epoch: u64,
    ) -> Result<Vec<ValidatorSnapshot>, StoreError>;

    async fn apply_rate_change(
        &self,
        network: &str,
        epoch: u64,
        address: &str,
        delta: f64,
    ) -> Result<(), StoreError>;

    async fn known_epochs(&self, exchange_rates_id: &str) -> Result<HashSet<u64>, StoreError>;

    /// Returns `true` when the row was new.
    async fn insert_sample_if_absent(&self, sample: &ExchangeRateSample)
        -> Result<bool, StoreError>;

    /// All stored samples of a collection, ascending by epoch.
    async fn samples_for_collection(
        &self,
        exchange_rates_id: &str,
    ) -> Result<Vec<ExchangeRateSample>, StoreError>;
}

fn decode_epoch(value: Bson) -> Result<u64, StoreError> {
    match value {
        Bson::Int64(epoch) if epoch >= 0 => Ok(epoch as u64),
        Bson::Int32(epoch) if epoch >= 0 => Ok(epoch as u64),
        other => Err(StoreError::Decode(format!("unexpected epoch value {}", other))),
    }
}
