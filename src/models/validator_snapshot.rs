use crate::models::SuiValidatorSummary;
use serde::{Deserialize, Serialize};

/// One `system_state` row: a validator as seen at a given epoch on a given network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSnapshot {
    pub epoch: u64,
    pub network: String,
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
    pub stake: String,
    pub apy: Option<f64>,
    pub rate_change: Option<f64>,
}

impl ValidatorSnapshot {
    pub fn from_summary(epoch: u64, network: &str, validator: &SuiValidatorSummary) -> Self {
        Self {
            epoch,
            network: network.to_string(),
            sui_address: validator.sui_address.clone(),
            protocol_pubkey_bytes: validator.protocol_pubkey_bytes.clone(),
            network_pubkey_bytes: validator.network_pubkey_bytes.clone(),
            worker_pubkey_bytes: validator.worker_pubkey_bytes.clone(),
            name: validator.name.clone(),
            description: validator.description.clone(),
            image_url: validator.image_url.clone(),
            project_url: validator.project_url.clone(),
            net_address: validator.net_address.clone(),
            p2p_address: validator.p2p_address.clone(),
            primary_address: validator.primary_address.clone(),
            worker_address: validator.worker_address.clone(),
            voting_power: validator.voting_power.clone(),
            gas_price: validator.gas_price.clone(),
            commission_rate: validator.commission_rate.clone(),
            stake: validator.staking_pool_sui_balance.clone(),
            apy: None,
            rate_change: None,
        }
    }
}
