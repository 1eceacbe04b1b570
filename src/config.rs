use crate::errors::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// What to store as `rate_change` when the previous epoch has no row for a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateChangeFallback {
    /// Record a change of zero, as if the previous APY equalled the current one.
    Zero,
    /// Leave `rate_change` unset until the previous epoch shows up.
    Skip,
}

impl FromStr for RateChangeFallback {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(RateChangeFallback::Zero),
            "skip" => Ok(RateChangeFallback::Skip),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub network: String,
    pub mongo_uri: String,
    pub db_name: String,
    pub mongo_max_pool_size: u32,
    pub rpc_timeout: Duration,
    pub rpc_max_attempts: u32,
    pub rpc_backoff_base: f64,
    pub backfill_delay: Duration,
    pub max_pages: usize,
    pub sync_interval: Duration,
    pub rate_change_interval: Duration,
    pub countdown_interval: Duration,
    pub rate_change_fallback: RateChangeFallback,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let rpc_backoff_base: f64 = parse_or(&lookup, "RPC_BACKOFF_BASE", 1.5)?;
        if !(rpc_backoff_base > 1.0) {
            return Err(ConfigError::Invalid {
                key: "RPC_BACKOFF_BASE",
                value: rpc_backoff_base.to_string(),
            });
        }
        let rpc_max_attempts: u32 = parse_or(&lookup, "RPC_MAX_ATTEMPTS", 3)?;
        if rpc_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "RPC_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            rpc_url: required("SUI_RPC_URL")?,
            network: required("NETWORK")?,
            mongo_uri: required("MONGO_URI")?,
            db_name: required("DB_NAME")?,
            mongo_max_pool_size: parse_or(&lookup, "MONGO_MAX_POOL_SIZE", 5)?,
            rpc_timeout: Duration::from_secs(parse_or(&lookup, "RPC_TIMEOUT_SECS", 30)?),
            rpc_max_attempts,
            rpc_backoff_base,
            backfill_delay: Duration::from_millis(parse_or(&lookup, "BACKFILL_DELAY_MS", 100)?),
            max_pages: parse_or(&lookup, "MAX_PAGES", 1000)?,
            sync_interval: Duration::from_secs(parse_or(&lookup, "SYNC_INTERVAL_SECS", 300)?),
            rate_change_interval: Duration::from_secs(parse_or(
                &lookup,
                "RATE_CHANGE_INTERVAL_SECS",
                300,
            )?),
            countdown_interval: Duration::from_secs(parse_or(
                &lookup,
                "COUNTDOWN_INTERVAL_SECS",
                600,
            )?),
            rate_change_fallback: parse_or(&lookup, "RATE_CHANGE_FALLBACK", RateChangeFallback::Zero)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
