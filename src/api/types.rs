use alloy::primitives::{B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{RiskError, RiskResult};
use crate::oracle::rwa::RwaCategory;
use crate::risk::types::{parse_address, FraudPattern, TransactionRecord};

// ============================================================
// Query params
// ============================================================

#[derive(Debug, Deserialize)]
pub struct BlockRangeParams {
    pub block_range: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AssetsParams {
    /// Comma-separated symbols, e.g. `XAU,XAG`.
    pub assets: String,
}

// ============================================================
// Request bodies
// ============================================================

#[derive(Debug, Deserialize)]
pub struct PatternRequest {
    pub transactions: Vec<TransactionInput>,
}

/// A transaction as submitted over JSON. Numeric fields are decimal strings
/// so 256-bit values survive the round trip.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub hash: Option<String>,
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub gas_price: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub block_number: u64,
}

impl TransactionInput {
    pub fn into_record(self) -> RiskResult<TransactionRecord> {
        let hash = match self.hash.as_deref() {
            Some(h) => B256::from_str(h)
                .map_err(|e| RiskError::invalid(format!("invalid hash '{}': {}", h, e)))?,
            None => B256::ZERO,
        };
        let value = U256::from_str(self.value.trim())
            .map_err(|e| RiskError::invalid(format!("invalid value '{}': {}", self.value, e)))?;
        if !(0..=DateTime::<Utc>::MAX_UTC.timestamp_millis()).contains(&self.timestamp) {
            return Err(RiskError::invalid(format!(
                "timestamp {} out of range",
                self.timestamp
            )));
        }
        let gas_price = match self.gas_price.as_deref() {
            Some(g) => g
                .trim()
                .parse::<u128>()
                .map_err(|e| RiskError::invalid(format!("invalid gas price '{}': {}", g, e)))?,
            None => 0,
        };

        Ok(TransactionRecord {
            hash,
            from: parse_address(&self.from)?,
            to: parse_address(&self.to)?,
            value,
            gas_price,
            timestamp_ms: self.timestamp,
            block_number: self.block_number,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RwaPriceRequest {
    pub category: RwaCategory,
    #[serde(default)]
    pub specifications: serde_json::Value,
    /// Takes precedence over `specifications.location` for real estate.
    #[serde(default)]
    pub location: Option<String>,
}

// ============================================================
// Responses
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub persistence: bool,
}

#[derive(Debug, Serialize)]
pub struct PatternResponse {
    pub patterns: Vec<FraudPattern>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: &str) -> TransactionInput {
        input_at(value, 1_700_000_000_000)
    }

    fn input_at(value: &str, timestamp: i64) -> TransactionInput {
        serde_json::from_value(serde_json::json!({
            "from": "0x0000000000000000000000000000000000000001",
            "to": "0x0000000000000000000000000000000000000002",
            "value": value,
            "gasPrice": "20000000000",
            "timestamp": timestamp
        }))
        .unwrap()
    }

    #[test]
    fn test_transaction_input_conversion() {
        let record = input("1000000000000000000").into_record().unwrap();
        assert_eq!(record.value, U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(record.gas_price, 20_000_000_000);
        assert_eq!(record.hash, B256::ZERO);
        assert_eq!(record.block_number, 0);
    }

    #[test]
    fn test_transaction_input_rejects_bad_value() {
        let err = input("one ether").into_record().unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput(_)));
    }

    #[test]
    fn test_transaction_input_rejects_out_of_range_timestamp() {
        for ts in [-1, i64::MIN, i64::MAX] {
            let err = input_at("1", ts).into_record().unwrap_err();
            assert!(matches!(err, RiskError::InvalidInput(_)), "timestamp {}", ts);
        }
        assert!(input_at("1", 0).into_record().is_ok());
    }

    #[test]
    fn test_rwa_request_defaults_specifications() {
        let req: RwaPriceRequest =
            serde_json::from_value(serde_json::json!({ "category": "commodities" })).unwrap();
        assert_eq!(req.category, RwaCategory::Commodities);
        assert!(req.specifications.is_null());
        assert!(req.location.is_none());
    }

    #[test]
    fn test_rwa_request_top_level_location() {
        let req: RwaPriceRequest = serde_json::from_value(serde_json::json!({
            "category": "real_estate",
            "specifications": { "squareFeet": 1000 },
            "location": "New York"
        }))
        .unwrap();
        assert_eq!(req.location.as_deref(), Some("New York"));
    }
}
