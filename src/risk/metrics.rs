use super::types::{ComplianceStatus, FraudPattern, TransactionAnalysis};

pub const MAX_SCORE: u32 = 1000;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Score transaction velocity (transactions per hour over the sample window).
///
/// A window needs at least two transactions to define a rate. When two or more
/// transactions share a single instant the rate is unbounded and scores as the
/// highest band.
pub fn velocity_score(analysis: &TransactionAnalysis) -> u32 {
    if analysis.transaction_count < 2 {
        return 100;
    }
    if analysis.time_span_ms <= 0 {
        return 800;
    }

    let per_hour = analysis.transaction_count as f64 / (analysis.time_span_ms as f64 / MS_PER_HOUR);
    if per_hour > 10.0 {
        800
    } else if per_hour > 5.0 {
        600
    } else if per_hour > 1.0 {
        300
    } else {
        100
    }
}

/// Score counterparty diversification. Low diversification is risky.
pub fn diversification_score(analysis: &TransactionAnalysis) -> u32 {
    let ratio = analysis.unique_contracts as f64 / analysis.transaction_count.max(1) as f64;
    if ratio < 0.1 {
        700
    } else if ratio < 0.3 {
        400
    } else if ratio < 0.6 {
        200
    } else {
        50
    }
}

/// Points contributed by a detected pattern to the behavior score.
///
/// Front-running and sandwich detections are reported but carry no weight.
pub fn pattern_weight(pattern: FraudPattern) -> u32 {
    match pattern {
        FraudPattern::RapidTransactions => 200,
        FraudPattern::WashTrading => 300,
        FraudPattern::CircularTransactions => 250,
        FraudPattern::SybilAttack => 400,
        FraudPattern::FrontRunning | FraudPattern::SandwichAttack => 0,
    }
}

pub fn behavior_score(analysis: &TransactionAnalysis) -> u32 {
    let total: u32 = analysis.patterns.iter().map(|p| pattern_weight(*p)).sum();
    total.min(MAX_SCORE)
}

pub fn compliance_score(status: &ComplianceStatus) -> u32 {
    let mut score = 0;
    if !status.kyc_verified {
        score += 300;
    }
    if status.sanctioned {
        score += 1000;
    }
    if status.has_flags {
        score += 200;
    }
    score.min(MAX_SCORE)
}

/// Frequent turnover of an asset is treated as a risk signal.
pub fn ownership_score(transfer_count: usize) -> u32 {
    if transfer_count > 10 {
        600
    } else if transfer_count > 5 {
        300
    } else {
        100
    }
}
