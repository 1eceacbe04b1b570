use crate::errors::RpcError;
use crate::models::{SuiSystemStateSummary, SyncCursor};
use crate::services::epoch_processor::EpochProcessor;
use crate::services::scheduler::Job;
use crate::services::sui_rpc::SuiRpcClient;
use crate::utils::helpers::decode_u64;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use log::{error, info, warn};
use serde_json::Value;
use std::sync::Arc;

/// Runs the epoch sync and carries its cursor from one run to the next.
pub struct SyncJob {
    processor: Arc<EpochProcessor>,
    cursor: SyncCursor,
}

impl SyncJob {
    pub fn new(processor: Arc<EpochProcessor>) -> Self {
        Self {
            processor,
            cursor: SyncCursor::default(),
        }
    }

    pub fn cursor(&self) -> &SyncCursor {
        &self.cursor
    }
}

#[async_trait]
impl Job for SyncJob {
    fn name(&self) -> &str {
        "sync"
    }

    async fn run(&mut self) {
        let cursor = std::mem::take(&mut self.cursor);
        self.cursor = self.processor.run(cursor).await;
    }
}

pub struct RateChangeJob {
    processor: Arc<EpochProcessor>,
}

impl RateChangeJob {
    pub fn new(processor: Arc<EpochProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl Job for RateChangeJob {
    fn name(&self) -> &str {
        "rate-change"
    }

    async fn run(&mut self) {
        match self.processor.update_rate_change().await {
            Ok(0) => {}
            Ok(applied) => info!("Rate change stored for {} validators", applied),
            Err(e) => error!("Rate change pass failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochCountdown {
    pub epoch: u64,
    pub minutes_left: i64,
    pub next_epoch_at: DateTime<Utc>,
}

pub fn epoch_countdown(
    state: &SuiSystemStateSummary,
    now: DateTime<Utc>,
) -> Result<EpochCountdown, RpcError> {
    let epoch = state.epoch_number()?;
    let start_ms = decode_u64(
        &Value::String(state.epoch_start_timestamp_ms.clone()),
        "epochStartTimestampMs",
    )?;
    let duration_ms = decode_u64(
        &Value::String(state.epoch_duration_ms.clone()),
        "epochDurationMs",
    )?;

    let end_ms = i64::try_from(start_ms.saturating_add(duration_ms))
        .map_err(|_| RpcError::Protocol("epoch end is out of range".to_string()))?;
    let next_epoch_at = Utc
        .timestamp_millis_opt(end_ms)
        .single()
        .ok_or_else(|| RpcError::Protocol(format!("epoch end {} is not a valid time", end_ms)))?;
    let minutes_left = (next_epoch_at - now).num_minutes();

    Ok(EpochCountdown {
        epoch,
        minutes_left,
        next_epoch_at,
    })
}

/// Read-only job logging how long the current epoch has left.
pub struct EpochCountdownJob {
    rpc: Arc<SuiRpcClient>,
}

impl EpochCountdownJob {
    pub fn new(rpc: Arc<SuiRpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Job for EpochCountdownJob {
    fn name(&self) -> &str {
        "epoch-countdown"
    }

    async fn run(&mut self) {
        let state = match self.rpc.latest_system_state().await {
            Ok(Some(state)) => state,
            Ok(None) => {
                warn!("Node unreachable, epoch countdown skipped");
                return;
            }
            Err(e) => {
                error!("Cannot read system state for epoch countdown: {}", e);
                return;
            }
        };

        match epoch_countdown(&state, Utc::now()) {
            Ok(countdown) => {
                info!(
                    "Time left on epoch {} until next epoch: {} minutes",
                    countdown.epoch, countdown.minutes_left
                );
                info!(
                    "Epoch {} will occur at: {}",
                    countdown.epoch + 1,
                    countdown
                        .next_epoch_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M:%S")
                );
            }
            Err(e) => error!("Malformed epoch timing in system state: {}", e),
        }
    }
}
