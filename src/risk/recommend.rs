use super::types::{AssetMetrics, RiskLevel, RiskMetrics, TransactionAnalysis};

pub const HIGH_VELOCITY: &str = "High transaction velocity";
pub const LOW_DIVERSIFICATION: &str = "Low portfolio diversification";
pub const SUSPICIOUS_BEHAVIOR: &str = "Suspicious behavioral patterns";
pub const COMPLIANCE_CONCERNS: &str = "Compliance concerns";
pub const LIMITED_HISTORY: &str = "Limited transaction history";
pub const FRAUD_PATTERN: &str = "Fraud pattern detected";

pub const LOW_LIQUIDITY: &str = "Low liquidity";
pub const FREQUENT_OWNERSHIP_CHANGES: &str = "Frequent ownership changes";
pub const COMPLIANCE_ISSUES: &str = "Compliance issues";

/// Human-readable factors behind a wallet score, in a fixed order.
pub fn wallet_risk_factors(metrics: &RiskMetrics, analysis: &TransactionAnalysis) -> Vec<String> {
    let checks = [
        (metrics.velocity_score > 500, HIGH_VELOCITY),
        (metrics.diversification_score > 400, LOW_DIVERSIFICATION),
        (metrics.behavior_score > 300, SUSPICIOUS_BEHAVIOR),
        (metrics.compliance_score > 200, COMPLIANCE_CONCERNS),
        (analysis.transaction_count < 10, LIMITED_HISTORY),
        (!analysis.patterns.is_empty(), FRAUD_PATTERN),
    ];

    checks
        .into_iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, factor)| factor.to_string())
        .collect()
}

/// Fixed action list per risk band.
pub fn wallet_recommendations(level: RiskLevel) -> Vec<String> {
    let actions: &[&str] = match level {
        RiskLevel::VeryLow => &["Proceed with standard verification"],
        RiskLevel::Low => &["Enhanced due diligence recommended"],
        RiskLevel::Medium => &[
            "Additional verification required",
            "Monitor transaction patterns",
        ],
        RiskLevel::High => &[
            "Comprehensive risk assessment required",
            "Consider transaction limits",
        ],
        RiskLevel::VeryHigh => &["Manual review required", "Implement strict monitoring"],
        RiskLevel::Blacklisted => &["Block all transactions", "Report to authorities if required"],
    };
    actions.iter().map(|s| s.to_string()).collect()
}

pub fn asset_risk_factors(metrics: &AssetMetrics) -> Vec<String> {
    let mut factors = Vec::new();
    if metrics.liquidity_score > 400 {
        factors.push(LOW_LIQUIDITY.to_string());
    }
    if metrics.ownership_score > 400 {
        factors.push(FREQUENT_OWNERSHIP_CHANGES.to_string());
    }
    if metrics.compliance_score > 300 {
        factors.push(COMPLIANCE_ISSUES.to_string());
    }
    factors
}

pub fn asset_recommendations(level: RiskLevel, factors: &[String]) -> Vec<String> {
    let mut recommendations = Vec::new();

    if matches!(level, RiskLevel::High | RiskLevel::VeryHigh) {
        recommendations.push("Require additional asset verification".to_string());
        recommendations.push("Implement enhanced monitoring".to_string());
    }
    if factors.iter().any(|f| f == LOW_LIQUIDITY) {
        recommendations.push("Consider liquidity requirements".to_string());
    }
    if factors.iter().any(|f| f == COMPLIANCE_ISSUES) {
        recommendations.push("Verify regulatory compliance".to_string());
    }

    recommendations
}
