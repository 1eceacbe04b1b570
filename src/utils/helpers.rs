use crate::errors::RpcError;
use serde_json::Value;

/// Reads a u64 the node may send either as a JSON number or as a decimal string.
pub fn decode_u64(value: &Value, what: &str) -> Result<u64, RpcError> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    parsed.ok_or_else(|| RpcError::Protocol(format!("{} is not a u64: {}", what, value)))
}

/// Rounds to the 15 fractional digits a `DECIMAL(18, 15)` column keeps.
pub fn round_rate(value: f64) -> f64 {
    const SCALE: f64 = 1e15;
    (value * SCALE).round() / SCALE
}
