use crate::errors::RpcError;
use crate::utils::helpers::decode_u64;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiSystemStateSummary {
    pub epoch: String,
    pub epoch_start_timestamp_ms: String,
    pub epoch_duration_ms: String,
    pub active_validators: Vec<SuiValidatorSummary>,
}

impl SuiSystemStateSummary {
    pub fn epoch_number(&self) -> Result<u64, RpcError> {
        decode_u64(&Value::String(self.epoch.clone()), "epoch")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiValidatorSummary {
    pub sui_address: String,
    pub protocol_pubkey_bytes: String,
    pub network_pubkey_bytes: String,
    pub worker_pubkey_bytes: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub project_url: String,
    pub net_address: String,
    pub p2p_address: String,
    pub primary_address: String,
    pub worker_address: String,
    pub voting_power: String,
    pub gas_price: String,
    pub commission_rate: String,
    pub staking_pool_sui_balance: String,
    pub staking_pool_id: String,
    pub exchange_rates_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorsApy {
    pub apys: Vec<ValidatorApy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorApy {
    pub address: String,
    pub apy: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicFieldPage {
    pub data: Vec<DynamicFieldInfo>,
    pub has_next_page: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DynamicFieldInfo {
    pub name: DynamicFieldName,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DynamicFieldName {
    pub value: Value,
}

/// Amounts of one entry in a staking pool's exchange-rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTokenExchangeRate {
    pub pool_token_amount: u64,
    pub sui_amount: u64,
}
