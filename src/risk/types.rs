use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RiskError, RiskResult};

/// One on-chain transaction as seen from the analyzed wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    /// Value in the token's smallest denomination.
    pub value: U256,
    /// Gas price in wei.
    pub gas_price: u128,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub block_number: u64,
}

/// Heuristic fraud patterns the detector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudPattern {
    RapidTransactions,
    WashTrading,
    CircularTransactions,
    SybilAttack,
    FrontRunning,
    SandwichAttack,
}

impl FraudPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RapidTransactions => "rapid_transactions",
            Self::WashTrading => "wash_trading",
            Self::CircularTransactions => "circular_transactions",
            Self::SybilAttack => "sybil_attack",
            Self::FrontRunning => "front_running",
            Self::SandwichAttack => "sandwich_attack",
        }
    }
}

impl fmt::Display for FraudPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-address summary of a transaction window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAnalysis {
    pub address: Address,
    pub transaction_count: usize,
    /// Sum of values, formatted in ether units.
    pub total_volume: String,
    /// Mean gas price, formatted in gwei.
    pub average_gas_price: String,
    pub unique_contracts: usize,
    /// Milliseconds between the first and last transaction.
    pub time_span_ms: i64,
    pub patterns: Vec<FraudPattern>,
}

/// Five independent sub-scores, each in [0, 1000].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub velocity_score: u32,
    pub diversification_score: u32,
    pub behavior_score: u32,
    pub compliance_score: u32,
    pub liquidity_score: u32,
}

/// Sub-scores feeding the asset variant of the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetrics {
    pub liquidity_score: u32,
    pub ownership_score: u32,
    pub compliance_score: u32,
    pub transaction_count: usize,
}

/// Discrete risk band. Ordering follows severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
    Blacklisted,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "VERY_LOW",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
            Self::Blacklisted => "BLACKLISTED",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The externally visible result of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub last_analyzed: DateTime<Utc>,
}

/// A tokenized asset: ERC-721 style contract plus token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId {
    pub contract: Address,
    pub token_id: U256,
}

impl AssetId {
    pub fn parse(contract: &str, token_id: &str) -> RiskResult<Self> {
        let contract = parse_address(contract)?;
        let token_id = token_id.trim();
        if token_id.is_empty() {
            return Err(RiskError::invalid("token id is empty"));
        }
        let token_id = U256::from_str(token_id)
            .map_err(|e| RiskError::invalid(format!("invalid token id '{}': {}", token_id, e)))?;
        Ok(Self { contract, token_id })
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.contract, self.token_id)
    }
}

/// A single change of ownership of an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipTransfer {
    pub from: Address,
    pub to: Address,
    pub block_number: u64,
    pub timestamp_ms: i64,
    pub tx_hash: B256,
}

/// Compliance booleans behind the compliance sub-score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceStatus {
    pub kyc_verified: bool,
    pub sanctioned: bool,
    pub has_flags: bool,
}

/// Strict `0x` + 40 hex character address parsing.
pub fn parse_address(input: &str) -> RiskResult<Address> {
    let trimmed = input.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(RiskError::invalid(format!("invalid address '{}'", input)));
    }
    Address::from_str(trimmed)
        .map_err(|e| RiskError::invalid(format!("invalid address '{}': {}", input, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert!(parse_address("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").is_ok());
        assert!(parse_address("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xZZb86991c6218b36c1d19D4a2e9Eb0cE3606eB48").is_err());
    }

    #[test]
    fn test_asset_id_accepts_decimal_and_hex() {
        let contract = "0x0000000000000000000000000000000000000001";
        let dec = AssetId::parse(contract, "255").unwrap();
        let hex = AssetId::parse(contract, "0xff").unwrap();
        assert_eq!(dec, hex);
        assert!(AssetId::parse(contract, "").is_err());
        assert!(AssetId::parse(contract, "abc").is_err());
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::VeryHigh).unwrap(),
            "\"VERY_HIGH\""
        );
        assert_eq!(
            serde_json::to_string(&FraudPattern::SybilAttack).unwrap(),
            "\"sybil_attack\""
        );
        assert!(RiskLevel::Low < RiskLevel::Blacklisted);
    }

    #[test]
    fn test_transaction_analysis_fields_are_camel_case() {
        let analysis = TransactionAnalysis {
            address: Address::with_last_byte(1),
            transaction_count: 2,
            total_volume: "1".to_string(),
            average_gas_price: "20".to_string(),
            unique_contracts: 1,
            time_span_ms: 500,
            patterns: vec![FraudPattern::RapidTransactions],
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["transactionCount"], 2);
        assert_eq!(json["averageGasPrice"], "20");
        assert_eq!(json["uniqueContracts"], 1);
        assert_eq!(json["timeSpanMs"], 500);
        assert_eq!(json["patterns"][0], "rapid_transactions");
        assert!(json.get("time_span_ms").is_none());
    }
}
