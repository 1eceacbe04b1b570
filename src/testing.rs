//! In-process doubles for the RPC transport and the epoch store.

use crate::errors::{RpcError, StoreError};
use crate::models::{ExchangeRateSample, ValidatorSnapshot};
use crate::repositories::{BatchOutcome, EpochStore};
use crate::services::sui_rpc::RpcTransport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<Result<Value, RpcError>>>,
    sticky: HashMap<String, Value>,
    calls: Vec<(String, Value)>,
}

/// Replays canned responses per method, in order, then falls back to a sticky one.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

fn envelope(result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "result": result })
}

impl ScriptedTransport {
    pub fn push_result(&self, method: &str, result: Value) {
        self.push_raw(method, envelope(result));
    }

    pub fn push_raw(&self, method: &str, response: Value) {
        self.push(method, Ok(response));
    }

    pub fn push_error(&self, method: &str, err: RpcError) {
        self.push(method, Err(err));
    }

    /// Served whenever the queue for `method` is empty.
    pub fn always(&self, method: &str, result: Value) {
        let mut script = self.script.lock().unwrap();
        script.sticky.insert(method.to_string(), envelope(result));
    }

    fn push(&self, method: &str, response: Result<Value, RpcError>) {
        let mut script = self.script.lock().unwrap();
        script
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls_to(&self, method: &str) -> usize {
        let script = self.script.lock().unwrap();
        script.calls.iter().filter(|(m, _)| m == method).count()
    }

    pub fn last_params(&self, method: &str) -> Option<Value> {
        let script = self.script.lock().unwrap();
        script
            .calls
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn post(&self, body: &Value) -> Result<Value, RpcError> {
        let method = body["method"].as_str().unwrap_or_default().to_string();
        let mut script = self.script.lock().unwrap();
        script.calls.push((method.clone(), body["params"].clone()));
        if let Some(response) = script.queued.get_mut(&method).and_then(VecDeque::pop_front) {
            return response;
        }
        script
            .sticky
            .get(&method)
            .cloned()
            .ok_or_else(|| RpcError::Protocol(format!("no scripted response for {}", method)))
    }
}

#[derive(Default)]
struct Tables {
    snapshots: Vec<ValidatorSnapshot>,
    samples: Vec<ExchangeRateSample>,
    writes: usize,
}

/// `EpochStore` kept in memory, with hooks to make single rows fail.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    failing_addresses: Arc<Mutex<HashSet<String>>>,
}

impl MemoryStore {
    pub fn with_snapshots(snapshots: Vec<ValidatorSnapshot>) -> Self {
        let store = Self::default();
        store.tables.lock().unwrap().snapshots = snapshots;
        store
    }

    pub fn fail_writes_for(&self, address: &str) {
        self.failing_addresses
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    pub fn snapshots(&self) -> Vec<ValidatorSnapshot> {
        self.tables.lock().unwrap().snapshots.clone()
    }

    pub fn snapshot(&self, network: &str, epoch: u64, address: &str) -> Option<ValidatorSnapshot> {
        self.snapshots()
            .into_iter()
            .find(|s| s.network == network && s.epoch == epoch && s.sui_address == address)
    }

    pub fn samples(&self) -> Vec<ExchangeRateSample> {
        self.tables.lock().unwrap().samples.clone()
    }

    pub fn insert_sample(&self, sample: ExchangeRateSample) {
        self.tables.lock().unwrap().samples.push(sample);
    }

    pub fn writes(&self) -> usize {
        self.tables.lock().unwrap().writes
    }

    fn check_writable(&self, address: &str) -> Result<(), StoreError> {
        if self.failing_addresses.lock().unwrap().contains(address) {
            return Err(StoreError::Decode(format!("rejected write for {}", address)));
        }
        Ok(())
    }
}

#[async_trait]
impl EpochStore for MemoryStore {
    async fn latest_snapshot_epoch(&self, network: &str) -> Result<Option<u64>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .snapshots
            .iter()
            .filter(|s| s.network == network)
            .map(|s| s.epoch)
            .max())
    }

    async fn upsert_snapshots(
        &self,
        snapshots: &[ValidatorSnapshot],
    ) -> Result<BatchOutcome, StoreError> {
        let mut outcome = BatchOutcome::default();
        for snapshot in snapshots {
            if self.check_writable(&snapshot.sui_address).is_err() {
                outcome.failed += 1;
                continue;
            }
            let mut tables = self.tables.lock().unwrap();
            tables.writes += 1;
            let existing = tables.snapshots.iter_mut().find(|s| {
                s.epoch == snapshot.epoch
                    && s.network == snapshot.network
                    && s.sui_address == snapshot.sui_address
            });
            match existing {
                Some(row) => {
                    let (apy, rate_change) = (row.apy, row.rate_change);
                    *row = ValidatorSnapshot {
                        apy,
                        rate_change,
                        ..snapshot.clone()
                    };
                }
                None => tables.snapshots.push(ValidatorSnapshot {
                    apy: None,
                    rate_change: None,
                    ..snapshot.clone()
                }),
            }
            outcome.written += 1;
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
        self.check_writable(address)?;
        let mut tables = self.tables.lock().unwrap();
        tables.writes += 1;
        let row = tables
            .snapshots
            .iter_mut()
            .find(|s| s.network == network && s.epoch == epoch && s.sui_address == address);
        Ok(match row {
            Some(row) if row.apy.is_none() => {
                row.apy = Some(apy);
                true
            }
            _ => false,
        })
    }

    async fn epoch_missing_apy(&self, network: &str, epoch: u64) -> Result<bool, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .snapshots
            .iter()
            .any(|s| s.network == network && s.epoch == epoch && s.apy.is_none()))
    }

    async fn pending_rate_change_epochs(&self, network: &str) -> Result<Vec<u64>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let mut epochs: Vec<u64> = tables
            .snapshots
            .iter()
            .filter(|s| s.network == network && s.rate_change.is_none())
            .map(|s| s.epoch)
            .collect();
        epochs.sort_unstable();
        epochs.dedup();
        Ok(epochs)
    }

    async fn epoch_snapshots(
        &self,
        network: &str,
        epoch: u64,
    ) -> Result<Vec<ValidatorSnapshot>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .snapshots
            .iter()
            .filter(|s| s.network == network && s.epoch == epoch)
            .cloned()
            .collect())
    }

    async fn apply_rate_change(
        &self,
        network: &str,
        epoch: u64,
        address: &str,
        delta: f64,
    ) -> Result<(), StoreError> {
        self.check_writable(address)?;
        let mut tables = self.tables.lock().unwrap();
        tables.writes += 1;
        if let Some(row) = tables.snapshots.iter_mut().find(|s| {
            s.network == network
                && s.epoch == epoch
                && s.sui_address == address
                && s.rate_change.is_none()
        }) {
            row.rate_change = Some(delta);
        }
        Ok(())
    }

    async fn known_epochs(&self, exchange_rates_id: &str) -> Result<HashSet<u64>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .samples
            .iter()
            .filter(|s| s.exchange_rates_id == exchange_rates_id)
            .map(|s| s.epoch)
            .collect())
    }

    async fn insert_sample_if_absent(
        &self,
        sample: &ExchangeRateSample,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let exists = tables
            .samples
            .iter()
            .any(|s| s.exchange_rates_id == sample.exchange_rates_id && s.epoch == sample.epoch);
        if exists {
            return Ok(false);
        }
        tables.writes += 1;
        tables.samples.push(sample.clone());
        Ok(true)
    }

    async fn samples_for_collection(
        &self,
        exchange_rates_id: &str,
    ) -> Result<Vec<ExchangeRateSample>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let mut samples: Vec<ExchangeRateSample> = tables
            .samples
            .iter()
            .filter(|s| s.exchange_rates_id == exchange_rates_id)
            .cloned()
            .collect();
        samples.sort_by_key(|s| s.epoch);
        Ok(samples)
    }
}

pub fn snapshot(network: &str, epoch: u64, address: &str, apy: Option<f64>) -> ValidatorSnapshot {
    ValidatorSnapshot {
        epoch,
        network: network.to_string(),
        sui_address: address.to_string(),
        protocol_pubkey_bytes: "protocol".to_string(),
        network_pubkey_bytes: "network".to_string(),
        worker_pubkey_bytes: "worker".to_string(),
        name: format!("validator {}", address),
        description: String::new(),
        image_url: String::new(),
        project_url: String::new(),
        net_address: "/dns/validator/tcp/8080/http".to_string(),
        p2p_address: "/dns/validator/udp/8084".to_string(),
        primary_address: "/dns/validator/udp/8081".to_string(),
        worker_address: "/dns/validator/udp/8082".to_string(),
        voting_power: "100".to_string(),
        gas_price: "1000".to_string(),
        commission_rate: "200".to_string(),
        stake: "5000000000".to_string(),
        apy,
        rate_change: None,
    }
}

/// Wire form of one active validator as `suix_getLatestSuiSystemState` returns it.
pub fn validator_json(address: &str, exchange_rates_id: &str) -> Value {
    json!({
        "suiAddress": address,
        "protocolPubkeyBytes": "protocol",
        "networkPubkeyBytes": "network",
        "workerPubkeyBytes": "worker",
        "name": format!("validator {}", address),
        "description": "",
        "imageUrl": "",
        "projectUrl": "",
        "netAddress": "/dns/validator/tcp/8080/http",
        "p2pAddress": "/dns/validator/udp/8084",
        "primaryAddress": "/dns/validator/udp/8081",
        "workerAddress": "/dns/validator/udp/8082",
        "votingPower": "100",
        "gasPrice": "1000",
        "commissionRate": "200",
        "stakingPoolSuiBalance": "5000000000",
        "stakingPoolId": format!("pool-{}", address),
        "exchangeRatesId": exchange_rates_id,
    })
}

pub fn system_state_json(epoch: u64, validators: Vec<Value>) -> Value {
    json!({
        "epoch": epoch.to_string(),
        "epochStartTimestampMs": "1700000000000",
        "epochDurationMs": "86400000",
        "activeValidators": validators,
    })
}

pub fn dynamic_fields_page(epochs: &[u64], next_cursor: Option<&str>) -> Value {
    let data: Vec<Value> = epochs
        .iter()
        .map(|epoch| json!({ "name": { "type": "u64", "value": epoch.to_string() } }))
        .collect();
    json!({
        "data": data,
        "hasNextPage": next_cursor.is_some(),
        "nextCursor": next_cursor,
    })
}

pub fn exchange_rate_json(pool_token_amount: u64, sui_amount: u64) -> Value {
    json!({ "data": { "content": { "fields": { "value": { "fields": {
        "pool_token_amount": pool_token_amount.to_string(),
        "sui_amount": sui_amount.to_string(),
    } } } } } })
}
