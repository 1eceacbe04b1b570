use crate::config::{Config, RateChangeFallback};
use crate::errors::SyncError;
use crate::models::{ExchangeRateSample, SuiSystemStateSummary, SuiValidatorSummary, SyncCursor, ValidatorSnapshot};
use crate::repositories::EpochStore;
use crate::services::sui_rpc::{SuiRpcClient, GET_LATEST_SYSTEM_STATE, GET_VALIDATORS_APY};
use crate::services::{apy_calculator, pagination, reconciler};
use crate::utils::helpers::round_rate;
use log::{debug, error, info, warn};
use num_bigint::BigInt;
use num_traits::Zero;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    CheckEpoch,
    SnapshotNewEpoch,
    Skip,
    UpdateApy,
    UpdateRateChange,
    BackfillHistory,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub network: String,
    /// Pause after every exchange-rate detail request.
    pub backfill_delay: Duration,
    pub max_pages: usize,
    pub rate_change_fallback: RateChangeFallback,
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            network: config.network.clone(),
            backfill_delay: config.backfill_delay,
            max_pages: config.max_pages,
            rate_change_fallback: config.rate_change_fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub collections: usize,
    pub inserted: usize,
    pub failed_collections: usize,
}

/// Drives one network's epoch sync: snapshot, APY, rate change, exchange-rate history.
pub struct EpochProcessor {
    rpc: Arc<SuiRpcClient>,
    store: Arc<dyn EpochStore>,
    options: SyncOptions,
}

impl EpochProcessor {
    pub fn new(rpc: Arc<SuiRpcClient>, store: Arc<dyn EpochStore>, options: SyncOptions) -> Self {
        Self {
            rpc,
            store,
            options,
        }
    }

    fn enter(&self, state: SyncState) {
        debug!("[{}] sync state -> {:?}", self.options.network, state);
    }

    /// Runs one sync cycle and returns the cursor for the next one.
    ///
    /// Failures are logged here; the returned cursor is unchanged when the
    /// cycle did not get past the APY pass, so the next tick retries.
    pub async fn run(&self, cursor: SyncCursor) -> SyncCursor {
        let next = match self.run_cycle(&cursor).await {
            Ok(next) => next,
            Err(e) => {
                error!("[{}] sync cycle failed: {}", self.options.network, e);
                cursor
            }
        };
        self.enter(SyncState::Idle);
        next
    }

    async fn run_cycle(&self, cursor: &SyncCursor) -> Result<SyncCursor, SyncError> {
        self.enter(SyncState::CheckEpoch);
        let system_state = self
            .rpc
            .latest_system_state()
            .await?
            .ok_or(SyncError::Unreachable {
                method: GET_LATEST_SYSTEM_STATE,
            })?;
        let epoch = system_state.epoch_number()?;
        info!("Current epoch: {}", epoch);

        if cursor.is_settled_at(epoch) {
            info!("Epoch {} already synced, waiting until epoch changes", epoch);
            return Ok(cursor.clone());
        }

        let state = self.check_epoch(epoch).await?;
        self.enter(state);
        match state {
            SyncState::SnapshotNewEpoch => {
                self.snapshot_epoch(&system_state, epoch).await?;
                self.update_apy(epoch).await?;
            }
            SyncState::UpdateApy => {
                info!("Epoch {} has rows without APY, resuming APY pass", epoch);
                self.update_apy(epoch).await?;
            }
            _ if cursor.backfill_incomplete => {
                info!("Epoch {} unchanged, retrying unfinished backfill", epoch);
                let report = self.backfill_history(&system_state.active_validators).await;
                return Ok(SyncCursor {
                    last_epoch: Some(epoch),
                    backfill_incomplete: report.failed_collections > 0,
                });
            }
            _ => {
                info!("Data for epoch {} already stored, skipping", epoch);
                return Ok(SyncCursor {
                    last_epoch: Some(epoch),
                    backfill_incomplete: false,
                });
            }
        }

        if let Err(e) = self.update_rate_change().await {
            error!("[{}] rate change pass failed: {}", self.options.network, e);
        }
        let report = self.backfill_history(&system_state.active_validators).await;

        Ok(SyncCursor {
            last_epoch: Some(epoch),
            backfill_incomplete: report.failed_collections > 0,
        })
    }

    /// Decides the next state from the node's epoch and what the store holds.
    pub async fn check_epoch(&self, node_epoch: u64) -> Result<SyncState, SyncError> {
        let network = &self.options.network;
        let stored = self.store.latest_snapshot_epoch(network).await?;
        match stored {
            None => {
                info!("No data found for {}, fetching epoch {}", network, node_epoch);
                Ok(SyncState::SnapshotNewEpoch)
            }
            Some(stored) if stored != node_epoch => {
                info!(
                    "Last epoch in the database: {}, node is at {}",
                    stored, node_epoch
                );
                Ok(SyncState::SnapshotNewEpoch)
            }
            Some(stored) => {
                if self.store.epoch_missing_apy(network, stored).await? {
                    Ok(SyncState::UpdateApy)
                } else {
                    Ok(SyncState::Skip)
                }
            }
        }
    }

    async fn snapshot_epoch(
        &self,
        system_state: &SuiSystemStateSummary,
        epoch: u64,
    ) -> Result<(), SyncError> {
        let network = &self.options.network;
        let snapshots: Vec<ValidatorSnapshot> = system_state
            .active_validators
            .iter()
            .map(|validator| ValidatorSnapshot::from_summary(epoch, network, validator))
            .collect();

        let mut total_stake = BigInt::zero();
        for s in &snapshots {
            match BigInt::from_str(&s.stake) {
                Ok(stake) => total_stake += stake,
                Err(_) => warn!(
                    "[{}] epoch {}: unparsable stake {:?} for validator {}, left out of total",
                    network, epoch, s.stake, s.sui_address
                ),
            }
        }

        let outcome = self.store.upsert_snapshots(&snapshots).await?;
        if outcome.failed > 0 {
            warn!(
                "[{}] epoch {}: {} of {} validator rows failed to store",
                network,
                epoch,
                outcome.failed,
                snapshots.len()
            );
        }
        info!(
            "[{}] stored {} validators for epoch {} (total stake {})",
            network, outcome.written, epoch, total_stake
        );
        Ok(())
    }

    /// Applies the node's APY map to the rows of `epoch` only.
    pub async fn update_apy(&self, epoch: u64) -> Result<(), SyncError> {
        self.enter(SyncState::UpdateApy);
        let network = &self.options.network;
        let apys = self
            .rpc
            .validators_apy()
            .await?
            .ok_or(SyncError::Unreachable {
                method: GET_VALIDATORS_APY,
            })?;

        let mut updated = 0;
        for entry in &apys.apys {
            match self
                .store
                .apply_apy(network, epoch, &entry.address, entry.apy)
                .await
            {
                Ok(true) => updated += 1,
                Ok(false) => debug!(
                    "No row awaiting APY for validator {} in epoch {}, value ignored",
                    entry.address, epoch
                ),
                Err(e) => error!(
                    "Failed to store APY for validator {} epoch {} on {}: {}",
                    entry.address, epoch, network, e
                ),
            }
        }
        info!(
            "[{}] APY values updated for {} validators in epoch {}",
            network, updated, epoch
        );
        Ok(())
    }

    /// Fills `rate_change` for every row still missing it; returns how many were set.
    ///
    /// Each value is computed once. Rows whose own APY is unset, or whose previous
    /// epoch row has no APY yet, stay pending for a later pass.
    pub async fn update_rate_change(&self) -> Result<usize, SyncError> {
        self.enter(SyncState::UpdateRateChange);
        let network = &self.options.network;
        let mut applied = 0;

        for epoch in self.store.pending_rate_change_epochs(network).await? {
            let previous: HashMap<String, Option<f64>> = match epoch.checked_sub(1) {
                Some(prev_epoch) => self
                    .store
                    .epoch_snapshots(network, prev_epoch)
                    .await?
                    .into_iter()
                    .map(|row| (row.sui_address, row.apy))
                    .collect(),
                None => HashMap::new(),
            };

            let rows = self.store.epoch_snapshots(network, epoch).await?;
            for row in rows.iter().filter(|row| row.rate_change.is_none()) {
                let apy = match row.apy {
                    Some(apy) => apy,
                    None => continue,
                };
                let delta = match previous.get(&row.sui_address) {
                    Some(Some(prev_apy)) => apy - prev_apy,
                    Some(None) => {
                        warn!(
                            "[{}] rate change for validator {} epoch {} pending: epoch {} has no APY",
                            network,
                            row.sui_address,
                            epoch,
                            epoch - 1
                        );
                        continue;
                    }
                    None => match self.options.rate_change_fallback {
                        RateChangeFallback::Zero => 0.0,
                        RateChangeFallback::Skip => continue,
                    },
                };
                let delta = round_rate(delta);

                match self
                    .store
                    .apply_rate_change(network, epoch, &row.sui_address, delta)
                    .await
                {
                    Ok(()) => {
                        applied += 1;
                        info!(
                            "Rate change for epoch {} for validator {} is {}",
                            epoch, row.sui_address, delta
                        );
                    }
                    Err(e) => error!(
                        "Failed to store rate change for validator {} epoch {} on {}: {}",
                        row.sui_address, epoch, network, e
                    ),
                }
            }
        }

        Ok(applied)
    }

    /// Reconciles every validator's exchange-rate history against the store.
    pub async fn backfill_history(&self, validators: &[SuiValidatorSummary]) -> BackfillReport {
        self.enter(SyncState::BackfillHistory);
        let mut report = BackfillReport::default();

        for validator in validators {
            if validator.exchange_rates_id.is_empty() {
                continue;
            }
            report.collections += 1;
            match self.backfill_collection(validator).await {
                Ok(inserted) => report.inserted += inserted,
                Err(e) => {
                    report.failed_collections += 1;
                    error!(
                        "Backfill of {} for validator {} on {} abandoned: {}",
                        validator.exchange_rates_id,
                        validator.sui_address,
                        self.options.network,
                        e
                    );
                }
            }
        }

        info!(
            "[{}] backfill finished: {} samples inserted across {} collections, {} failed",
            self.options.network, report.inserted, report.collections, report.failed_collections
        );
        report
    }

    async fn backfill_collection(&self, validator: &SuiValidatorSummary) -> Result<usize, SyncError> {
        let exchange_rates_id = validator.exchange_rates_id.as_str();
        let remote =
            pagination::list_epochs(&self.rpc, exchange_rates_id, self.options.max_pages).await?;
        let stored = self.store.known_epochs(exchange_rates_id).await?;
        let missing = reconciler::missing_epochs(&remote, &stored);
        info!(
            "ExchangeRatesId: {}, missing epochs: {}",
            exchange_rates_id,
            missing.len()
        );

        let mut inserted = 0;
        for epoch in missing {
            let rate = self
                .rpc
                .dynamic_field_object(exchange_rates_id, epoch)
                .await?
                .ok_or_else(|| SyncError::ReconciliationGap {
                    collection_id: exchange_rates_id.to_string(),
                    reason: format!("node unreachable while fetching epoch {}", epoch),
                })?;

            let sample = ExchangeRateSample {
                exchange_rates_id: exchange_rates_id.to_string(),
                network: self.options.network.clone(),
                sui_address: validator.sui_address.clone(),
                pool_id: validator.staking_pool_id.clone(),
                active: true,
                epoch,
                pool_token_amount: rate.pool_token_amount,
                sui_amount: rate.sui_amount,
            };
            match self.store.insert_sample_if_absent(&sample).await {
                Ok(true) => {
                    inserted += 1;
                    info!(
                        "Epoch: {}, PoolTokenAmount: {}, SuiAmount: {}",
                        epoch, rate.pool_token_amount, rate.sui_amount
                    );
                }
                Ok(false) => debug!("Epoch {} of {} already stored", epoch, exchange_rates_id),
                Err(e) => error!(
                    "Failed to store exchange rate of {} epoch {} on {}: {}",
                    exchange_rates_id, epoch, self.options.network, e
                ),
            }

            sleep(self.options.backfill_delay).await;
        }

        if inserted > 0 {
            self.log_exchange_rate_apy(exchange_rates_id).await;
        }
        Ok(inserted)
    }

    async fn log_exchange_rate_apy(&self, exchange_rates_id: &str) {
        match self.store.samples_for_collection(exchange_rates_id).await {
            Ok(samples) => {
                if let Some(latest) = samples.last().map(|s| s.epoch) {
                    let apy = apy_calculator::exchange_rate_apy(&samples, latest);
                    info!(
                        "ExchangeRatesId: {}, Epoch: {}, Average APY: {:.8}",
                        exchange_rates_id, latest, apy
                    );
                }
            }
            Err(e) => warn!(
                "Cannot read samples of {} to derive APY: {}",
                exchange_rates_id, e
            ),
        }
    }
}
