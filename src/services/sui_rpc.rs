use crate::errors::RpcError;
use crate::models::{DynamicFieldPage, PoolTokenExchangeRate, SuiSystemStateSummary, ValidatorsApy};
use crate::utils::helpers::decode_u64;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

pub const GET_LATEST_SYSTEM_STATE: &str = "suix_getLatestSuiSystemState";
pub const GET_VALIDATORS_APY: &str = "suix_getValidatorsApy";
pub const GET_DYNAMIC_FIELDS: &str = "suix_getDynamicFields";
pub const GET_DYNAMIC_FIELD_OBJECT: &str = "suix_getDynamicFieldObject";

/// Delivers one JSON-RPC request body and returns the decoded response envelope.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post(&self, body: &Value) -> Result<Value, RpcError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Protocol(format!("cannot build http client: {}", e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

fn classify(err: reqwest::Error) -> RpcError {
    if err.is_builder() || err.is_decode() {
        RpcError::Protocol(err.to_string())
    } else {
        RpcError::Transport(err.to_string())
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(&self, body: &Value) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Protocol(format!("HTTP status {}", status)));
        }

        response.json::<Value>().await.map_err(classify)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: f64,
}

impl RetryPolicy {
    /// Pause after the failed attempt numbered `attempt`, counting from zero.
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.backoff_base.powi(attempt as i32))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 1.5,
        }
    }
}

pub struct SuiRpcClient {
    transport: Box<dyn RpcTransport>,
    policy: RetryPolicy,
}

impl SuiRpcClient {
    pub fn new(transport: Box<dyn RpcTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn connect(url: &str, timeout: Duration, policy: RetryPolicy) -> Result<Self, RpcError> {
        info!("Connecting to Sui RPC at {}", url);
        Ok(Self::new(Box::new(HttpTransport::new(url, timeout)?), policy))
    }

    /// Issues `method` with retries on transport failures.
    ///
    /// `Ok(None)` means the node stayed unreachable for every attempt.
    /// Protocol failures are returned on the first occurrence.
    pub async fn call(&self, method: &'static str, params: Value) -> Result<Option<Value>, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        for attempt in 0..self.policy.max_attempts {
            debug!("RPC call {} (attempt {})", method, attempt + 1);
            match self.transport.post(&body).await.and_then(unwrap_envelope) {
                Ok(result) => return Ok(Some(result)),
                Err(e) if e.is_retryable() => {
                    warn!(
                        "RPC {} failed on attempt {}/{}: {}",
                        method,
                        attempt + 1,
                        self.policy.max_attempts,
                        e
                    );
                    if attempt + 1 < self.policy.max_attempts {
                        sleep(self.policy.delay(attempt)).await;
                    }
                }
                Err(e) => {
                    error!("RPC {} failed: {}", method, e);
                    return Err(e);
                }
            }
        }

        error!(
            "RPC {} unreachable after {} attempts",
            method, self.policy.max_attempts
        );
        Ok(None)
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<Option<T>, RpcError> {
        match self.call(method, params).await? {
            Some(result) => Ok(Some(serde_json::from_value(result)?)),
            None => Ok(None),
        }
    }

    pub async fn latest_system_state(&self) -> Result<Option<SuiSystemStateSummary>, RpcError> {
        self.call_typed(GET_LATEST_SYSTEM_STATE, json!([])).await
    }

    pub async fn validators_apy(&self) -> Result<Option<ValidatorsApy>, RpcError> {
        self.call_typed(GET_VALIDATORS_APY, json!([])).await
    }

    pub async fn dynamic_fields_page(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<Option<DynamicFieldPage>, RpcError> {
        let params = match cursor {
            Some(cursor) => json!([collection_id, cursor]),
            None => json!([collection_id]),
        };
        self.call_typed(GET_DYNAMIC_FIELDS, params).await
    }

    pub async fn dynamic_field_object(
        &self,
        collection_id: &str,
        epoch: u64,
    ) -> Result<Option<PoolTokenExchangeRate>, RpcError> {
        let params = json!([collection_id, { "type": "u64", "value": epoch.to_string() }]);
        let result = match self.call(GET_DYNAMIC_FIELD_OBJECT, params).await? {
            Some(result) => result,
            None => return Ok(None),
        };

        let fields = result
            .pointer("/data/content/fields/value/fields")
            .ok_or_else(|| {
                RpcError::Protocol(format!(
                    "exchange rate for epoch {} of {} has no value fields",
                    epoch, collection_id
                ))
            })?;
        let amount = |name: &str| {
            fields
                .get(name)
                .ok_or_else(|| RpcError::Protocol(format!("missing {} for epoch {}", name, epoch)))
                .and_then(|v| decode_u64(v, name))
        };

        Ok(Some(PoolTokenExchangeRate {
            pool_token_amount: amount("pool_token_amount")?,
            sui_amount: amount("sui_amount")?,
        }))
    }
}

fn unwrap_envelope(mut envelope: Value) -> Result<Value, RpcError> {
    if let Some(err) = envelope.get("error").filter(|e| !e.is_null()) {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown");
        return Err(RpcError::Protocol(format!("rpc error {}: {}", code, message)));
    }
    match envelope.get_mut("result").map(Value::take) {
        Some(result) if !result.is_null() => Ok(result),
        _ => Err(RpcError::Protocol("response has no result".to_string())),
    }
}
