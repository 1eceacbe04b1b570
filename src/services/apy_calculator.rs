use crate::models::ExchangeRateSample;

const EPOCHS_PER_YEAR: i32 = 365;
const WINDOW: usize = 31;
/// Samples whose SUI-per-token ratio reaches this are treated as outliers.
const MAX_SUI_PER_TOKEN: f64 = 1.2;
/// First epoch in which stake subsidies were paid.
const STAKE_SUBSIDY_START_EPOCH: u64 = 1;

fn pool_token_rate(sample: &ExchangeRateSample) -> Option<f64> {
    if sample.pool_token_amount == 0 || sample.sui_amount == 0 {
        return None;
    }
    Some(sample.pool_token_amount as f64 / sample.sui_amount as f64)
}

/// Average annualised yield over the trailing window of epochs up to `epoch`.
///
/// `samples` must be ascending by epoch. Returns `0.0` when fewer than two
/// usable samples fall in the window.
pub fn exchange_rate_apy(samples: &[ExchangeRateSample], epoch: u64) -> f64 {
    let rates: Vec<f64> = samples
        .iter()
        .filter(|s| s.epoch >= STAKE_SUBSIDY_START_EPOCH && s.epoch <= epoch)
        .filter_map(pool_token_rate)
        .filter(|rate| 1.0 / rate < MAX_SUI_PER_TOKEN)
        .collect();
    let window = &rates[rates.len().saturating_sub(WINDOW)..];

    if window.len() < 2 {
        return 0.0;
    }

    let total: f64 = window
        .windows(2)
        .map(|pair| (pair[0] / pair[1]).powi(EPOCHS_PER_YEAR) - 1.0)
        .sum();
    total / (window.len() - 1) as f64
}
