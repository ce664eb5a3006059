// SPDX-License-Identifier: MIT

//! Wire types for the vendor cloud API and the raw measurement records it
//! returns.
//!
//! Live payloads are loosely typed: numeric fields arrive as JSON numbers
//! or strings, and some fields appear under alternate (even misspelled)
//! keys. Each ambiguous field gets an explicit prioritized-fallback
//! accessor instead of ad hoc branching at the call sites.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope every vendor endpoint wraps its payload in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Payload of `GET /v1.0/token?grant_type=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Token lifetime in seconds
    pub expire_time: i64,
}

/// One page of measurement history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub records: Vec<RawRecord>,
}

/// One historical measurement as the vendor returns it. Transient; never
/// persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub nick_name: Option<String>,
    /// Measurement time, epoch milliseconds
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub weight: Option<Value>,
    /// Misspelled weight key observed in live payloads
    #[serde(default)]
    pub wegith: Option<Value>,
    #[serde(default)]
    pub height: Option<Value>,
    #[serde(default)]
    pub resistance: Option<Value>,
    /// Alternate resistance key observed in live payloads
    #[serde(default)]
    pub body_r: Option<Value>,
}

impl RawRecord {
    /// Weight in kg: `weight`, then `wegith`, then 0.
    pub fn weight_kg(&self) -> f64 {
        first_numeric(&[&self.weight, &self.wegith]).unwrap_or(0.0)
    }

    /// Height in cm: `height`, then the vendor's default of 170.
    pub fn height_cm(&self) -> f64 {
        first_numeric(&[&self.height]).unwrap_or(170.0)
    }

    /// Normalized resistance in ohms: `resistance`, then `body_r`, then 0.
    pub fn resistance_ohms(&self) -> i64 {
        [&self.resistance, &self.body_r]
            .iter()
            .find_map(|field| field.as_ref())
            .map(normalize_resistance)
            .unwrap_or(0)
    }
}

/// First field in priority order that parses as a number.
fn first_numeric(fields: &[&Option<Value>]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|field| field.as_ref())
        .find_map(numeric)
}

/// Parse a JSON number or numeric string.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Normalize a raw resistance value to whole ohms.
///
/// The device reports resistance in two formats: a fractional ohm-scaled
/// number (`"0.756"`, meaning 756 Ω) or raw ohms (`"575"`). Values below 1
/// are scaled by 1000; values at or above 1 pass through truncated.
/// Unparseable values normalize to 0 rather than failing the cycle.
pub fn normalize_resistance(value: &Value) -> i64 {
    let Some(resistance) = numeric(value) else {
        tracing::warn!(value = %value, "Invalid resistance value");
        return 0;
    };
    if resistance < 1.0 {
        (resistance * 1000.0) as i64
    } else {
        resistance as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resistance_normalization() {
        assert_eq!(normalize_resistance(&json!("0.756")), 756);
        assert_eq!(normalize_resistance(&json!("575")), 575);
        assert_eq!(normalize_resistance(&json!("abc")), 0);
        assert_eq!(normalize_resistance(&json!("1")), 1);
        assert_eq!(normalize_resistance(&json!(0.6)), 600);
        assert_eq!(normalize_resistance(&json!(700)), 700);
        assert_eq!(normalize_resistance(&json!(null)), 0);
    }

    #[test]
    fn test_weight_fallback_chain() {
        let record: RawRecord =
            serde_json::from_value(json!({ "wegith": 72.5, "create_time": 1 })).unwrap();
        assert_eq!(record.weight_kg(), 72.5);

        let record: RawRecord =
            serde_json::from_value(json!({ "weight": "80.2", "wegith": 72.5 })).unwrap();
        assert_eq!(record.weight_kg(), 80.2);

        let record = RawRecord::default();
        assert_eq!(record.weight_kg(), 0.0);
    }

    #[test]
    fn test_height_default() {
        let record = RawRecord::default();
        assert_eq!(record.height_cm(), 170.0);

        let record: RawRecord = serde_json::from_value(json!({ "height": 182 })).unwrap();
        assert_eq!(record.height_cm(), 182.0);
    }

    #[test]
    fn test_resistance_fallback_chain() {
        let record: RawRecord = serde_json::from_value(json!({ "body_r": "0.5" })).unwrap();
        assert_eq!(record.resistance_ohms(), 500);

        let record: RawRecord =
            serde_json::from_value(json!({ "resistance": "650", "body_r": "0.5" })).unwrap();
        assert_eq!(record.resistance_ohms(), 650);

        assert_eq!(RawRecord::default().resistance_ohms(), 0);
    }

    #[test]
    fn test_envelope_parsing() {
        let env: ApiEnvelope = serde_json::from_str(
            r#"{"success": true, "result": {"records": []}, "t": 1700000000000}"#,
        )
        .unwrap();
        assert!(env.success);
        assert!(env.result.is_some());
        assert!(env.msg.is_none());

        let env: ApiEnvelope =
            serde_json::from_str(r#"{"success": false, "msg": "token invalid"}"#).unwrap();
        assert!(!env.success);
        assert_eq!(env.msg.as_deref(), Some("token invalid"));
    }
}
