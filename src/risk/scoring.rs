use super::metrics::MAX_SCORE;
use super::types::{AssetMetrics, RiskLevel, RiskMetrics, TransactionAnalysis};

/// Composite weights, in percent. Each set sums to 100.
pub struct WalletWeights;

impl WalletWeights {
    pub const VELOCITY: u32 = 25;
    pub const DIVERSIFICATION: u32 = 20;
    pub const BEHAVIOR: u32 = 25;
    pub const COMPLIANCE: u32 = 20;
    pub const LIQUIDITY: u32 = 10;
}

pub struct AssetWeights;

impl AssetWeights {
    pub const LIQUIDITY: u32 = 30;
    pub const OWNERSHIP: u32 = 30;
    pub const COMPLIANCE: u32 = 30;
    pub const ACTIVITY: u32 = 10;
}

/// Asset confidence is not data-driven.
pub const ASSET_CONFIDENCE: f64 = 0.85;

const DAY_MS: i64 = 24 * 3_600_000;

/// round(sum / 100) with halves rounded up, on a sum already scaled by percent weights.
fn round_percent(weighted: u64) -> u32 {
    let score = (weighted + 50) / 100;
    score.min(MAX_SCORE as u64) as u32
}

/// Weighted wallet composite in [0, 1000].
pub fn composite_score(metrics: &RiskMetrics) -> u32 {
    let weighted = WalletWeights::VELOCITY as u64 * metrics.velocity_score as u64
        + WalletWeights::DIVERSIFICATION as u64 * metrics.diversification_score as u64
        + WalletWeights::BEHAVIOR as u64 * metrics.behavior_score as u64
        + WalletWeights::COMPLIANCE as u64 * metrics.compliance_score as u64
        + WalletWeights::LIQUIDITY as u64 * metrics.liquidity_score as u64;
    round_percent(weighted)
}

/// Activity contribution for the asset composite: thinly traded assets score higher.
pub fn activity_score(transaction_count: usize) -> u32 {
    if transaction_count < 5 {
        400
    } else {
        100
    }
}

pub fn asset_composite_score(metrics: &AssetMetrics) -> u32 {
    let weighted = AssetWeights::LIQUIDITY as u64 * metrics.liquidity_score as u64
        + AssetWeights::OWNERSHIP as u64 * metrics.ownership_score as u64
        + AssetWeights::COMPLIANCE as u64 * metrics.compliance_score as u64
        + AssetWeights::ACTIVITY as u64 * activity_score(metrics.transaction_count) as u64;
    round_percent(weighted)
}

/// Map a score to its band. Upper bounds are inclusive.
pub fn determine_risk_level(score: u32) -> RiskLevel {
    match score {
        0..=100 => RiskLevel::VeryLow,
        101..=250 => RiskLevel::Low,
        251..=500 => RiskLevel::Medium,
        501..=750 => RiskLevel::High,
        751..=900 => RiskLevel::VeryHigh,
        _ => RiskLevel::Blacklisted,
    }
}

/// Data-sufficiency proxy in [0.5, 1.0]. Never lowers with more data.
pub fn confidence(analysis: &TransactionAnalysis) -> f64 {
    // tenths, so the sums are exact
    let mut tenths: u32 = 5;

    if analysis.transaction_count > 100 {
        tenths += 2;
    } else if analysis.transaction_count > 50 {
        tenths += 1;
    }

    if analysis.time_span_ms > 30 * DAY_MS {
        tenths += 2;
    } else if analysis.time_span_ms > 7 * DAY_MS {
        tenths += 1;
    }

    if !analysis.patterns.is_empty() {
        tenths += 1;
    }

    f64::from(tenths.min(10)) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::types::FraudPattern;
    use alloy::primitives::Address;

    fn metrics(v: u32, d: u32, b: u32, c: u32, l: u32) -> RiskMetrics {
        RiskMetrics {
            velocity_score: v,
            diversification_score: d,
            behavior_score: b,
            compliance_score: c,
            liquidity_score: l,
        }
    }

    fn analysis(count: usize, span_ms: i64, patterns: Vec<FraudPattern>) -> TransactionAnalysis {
        TransactionAnalysis {
            address: Address::ZERO,
            transaction_count: count,
            total_volume: "0".to_string(),
            average_gas_price: "0".to_string(),
            unique_contracts: 0,
            time_span_ms: span_ms,
            patterns,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert_eq!(
            WalletWeights::VELOCITY
                + WalletWeights::DIVERSIFICATION
                + WalletWeights::BEHAVIOR
                + WalletWeights::COMPLIANCE
                + WalletWeights::LIQUIDITY,
            100
        );
        assert_eq!(
            AssetWeights::LIQUIDITY
                + AssetWeights::OWNERSHIP
                + AssetWeights::COMPLIANCE
                + AssetWeights::ACTIVITY,
            100
        );
    }

    #[test]
    fn test_band_boundaries() {
        let cases = [
            (0, RiskLevel::VeryLow),
            (100, RiskLevel::VeryLow),
            (101, RiskLevel::Low),
            (250, RiskLevel::Low),
            (251, RiskLevel::Medium),
            (500, RiskLevel::Medium),
            (501, RiskLevel::High),
            (750, RiskLevel::High),
            (751, RiskLevel::VeryHigh),
            (900, RiskLevel::VeryHigh),
            (901, RiskLevel::Blacklisted),
            (1000, RiskLevel::Blacklisted),
        ];
        for (score, level) in cases {
            assert_eq!(determine_risk_level(score), level, "score {}", score);
        }
    }

    #[test]
    fn test_levels_are_monotonic() {
        let mut previous = determine_risk_level(0);
        for score in 1..=1000 {
            let level = determine_risk_level(score);
            assert!(level >= previous, "level dropped at {}", score);
            previous = level;
        }
    }

    #[test]
    fn test_composite_formula() {
        // 0.25*800 + 0.20*700 + 0.25*750 + 0.20*300 + 0.10*150 = 602.5
        assert_eq!(composite_score(&metrics(800, 700, 750, 300, 150)), 603);
        // 0.25*100 + 0.20*50 + 0 + 0 + 0.10*150 = 50
        assert_eq!(composite_score(&metrics(100, 50, 0, 0, 150)), 50);
        assert_eq!(composite_score(&metrics(1000, 1000, 1000, 1000, 1000)), 1000);
        assert_eq!(composite_score(&metrics(0, 0, 0, 0, 0)), 0);
        // 0.10 * 1 = 0.1 rounds down
        assert_eq!(composite_score(&metrics(0, 0, 0, 0, 1)), 0);
        // 0.20 * 3 = 0.6 rounds up
        assert_eq!(composite_score(&metrics(0, 3, 0, 0, 0)), 1);
    }

    #[test]
    fn test_asset_composite() {
        let m = AssetMetrics {
            liquidity_score: 300,
            ownership_score: 100,
            compliance_score: 150,
            transaction_count: 1,
        };
        // 90 + 30 + 45 + 40
        assert_eq!(asset_composite_score(&m), 205);

        let busy = AssetMetrics {
            transaction_count: 12,
            ownership_score: 600,
            ..m
        };
        // 90 + 180 + 45 + 10
        assert_eq!(asset_composite_score(&busy), 325);
    }

    #[test]
    fn test_confidence_values() {
        assert_eq!(confidence(&analysis(0, 0, vec![])), 0.5);
        assert_eq!(confidence(&analysis(51, 0, vec![])), 0.6);
        assert_eq!(confidence(&analysis(101, 8 * DAY_MS, vec![])), 0.8);
        assert_eq!(
            confidence(&analysis(101, 31 * DAY_MS, vec![FraudPattern::WashTrading])),
            1.0
        );
    }

    #[test]
    fn test_confidence_is_monotonic() {
        let counts = [0usize, 10, 50, 51, 100, 101, 5000];
        let spans = [0i64, DAY_MS, 7 * DAY_MS, 7 * DAY_MS + 1, 30 * DAY_MS, 31 * DAY_MS];
        for pair in counts.windows(2) {
            for &span in &spans {
                assert!(
                    confidence(&analysis(pair[1], span, vec![]))
                        >= confidence(&analysis(pair[0], span, vec![]))
                );
            }
        }
        for pair in spans.windows(2) {
            for &count in &counts {
                assert!(
                    confidence(&analysis(count, pair[1], vec![]))
                        >= confidence(&analysis(count, pair[0], vec![]))
                );
            }
        }
    }
}
