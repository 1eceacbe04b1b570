use serde::{Deserialize, Serialize};

/// One `validators_data` row: a staking pool's exchange rate at the end of an epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateSample {
    pub exchange_rates_id: String,
    pub network: String,
    #[serde(rename = "suiAddress")]
    pub sui_address: String,
    pub pool_id: String,
    pub active: bool,
    pub epoch: u64,
    pub pool_token_amount: u64,
    pub sui_amount: u64,
}
