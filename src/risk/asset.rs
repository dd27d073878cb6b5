use chrono::{DateTime, Utc};

use super::metrics::{ownership_score, MAX_SCORE};
use super::recommend::{asset_recommendations, asset_risk_factors};
use super::scoring::{asset_composite_score, determine_risk_level, ASSET_CONFIDENCE};
use super::types::{AssetMetrics, OwnershipTransfer, RiskAnalysis};

/// Collect asset sub-scores from an ownership history and the provider lookups.
pub fn asset_metrics(
    history: &[OwnershipTransfer],
    liquidity_score: u32,
    compliance_score: u32,
) -> AssetMetrics {
    AssetMetrics {
        liquidity_score: liquidity_score.min(MAX_SCORE),
        ownership_score: ownership_score(history.len()),
        compliance_score: compliance_score.min(MAX_SCORE),
        transaction_count: history.len(),
    }
}

/// Score and classify a tokenized asset.
///
/// Confidence is the fixed [`ASSET_CONFIDENCE`], unlike the wallet variant
/// where it tracks data volume.
pub fn assess_asset(metrics: &AssetMetrics, analyzed_at: DateTime<Utc>) -> RiskAnalysis {
    let risk_score = asset_composite_score(metrics);
    let risk_level = determine_risk_level(risk_score);
    let factors = asset_risk_factors(metrics);
    let recommendations = asset_recommendations(risk_level, &factors);

    RiskAnalysis {
        risk_score,
        risk_level,
        confidence: ASSET_CONFIDENCE,
        factors,
        recommendations,
        last_analyzed: analyzed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::types::RiskLevel;
    use alloy::primitives::{Address, B256};

    fn history(n: usize) -> Vec<OwnershipTransfer> {
        (0..n)
            .map(|i| OwnershipTransfer {
                from: Address::with_last_byte(i as u8),
                to: Address::with_last_byte(i as u8 + 1),
                block_number: i as u64,
                timestamp_ms: i as i64 * 1000,
                tx_hash: B256::ZERO,
            })
            .collect()
    }

    #[test]
    fn test_fresh_asset_with_default_lookups() {
        let m = asset_metrics(&history(1), 300, 150);
        assert_eq!(m.ownership_score, 100);
        let result = assess_asset(&m, Utc::now());
        assert_eq!(result.risk_score, 205);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.confidence, 0.85);
        assert!(result.factors.is_empty());
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_churning_illiquid_asset() {
        let m = asset_metrics(&history(12), 900, 400);
        assert_eq!(m.ownership_score, 600);
        let result = assess_asset(&m, Utc::now());
        // 270 + 180 + 120 + 10
        assert_eq!(result.risk_score, 580);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.factors.len(), 3);
        assert_eq!(result.recommendations.len(), 4);
    }

    #[test]
    fn test_lookups_are_clamped() {
        let m = asset_metrics(&[], 5000, 5000);
        assert_eq!(m.liquidity_score, 1000);
        assert_eq!(m.compliance_score, 1000);
    }
}
