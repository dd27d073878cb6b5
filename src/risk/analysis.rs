use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use std::collections::HashSet;

use super::patterns::detect_fraud_patterns;
use super::types::{TransactionAnalysis, TransactionRecord};

/// Summarize a transaction window for one address and run the pattern detector.
pub fn analyze_transactions(address: Address, transactions: &[TransactionRecord]) -> TransactionAnalysis {
    TransactionAnalysis {
        address,
        transaction_count: transactions.len(),
        total_volume: total_volume(transactions),
        average_gas_price: average_gas_price(transactions),
        unique_contracts: unique_contracts(transactions),
        time_span_ms: time_span_ms(transactions),
        patterns: detect_fraud_patterns(transactions),
    }
}

/// Sum of values in ether units.
pub fn total_volume(transactions: &[TransactionRecord]) -> String {
    let total = transactions
        .iter()
        .fold(U256::ZERO, |acc, t| acc.saturating_add(t.value));
    format_units(total, "ether").unwrap_or_else(|_| "0".to_string())
}

/// Mean gas price in gwei, "0" for an empty window.
pub fn average_gas_price(transactions: &[TransactionRecord]) -> String {
    if transactions.is_empty() {
        return "0".to_string();
    }
    let total = transactions
        .iter()
        .fold(U256::ZERO, |acc, t| acc.saturating_add(U256::from(t.gas_price)));
    let average = total / U256::from(transactions.len());
    format_units(average, "gwei").unwrap_or_else(|_| "0".to_string())
}

/// Distinct recipient addresses.
pub fn unique_contracts(transactions: &[TransactionRecord]) -> usize {
    transactions.iter().map(|t| t.to).collect::<HashSet<_>>().len()
}

/// Milliseconds between the earliest and latest transaction, 0 below two samples.
/// Saturates at `i64::MAX`.
pub fn time_span_ms(transactions: &[TransactionRecord]) -> i64 {
    if transactions.len() < 2 {
        return 0;
    }
    let min = transactions.iter().map(|t| t.timestamp_ms).min().unwrap_or(0);
    let max = transactions.iter().map(|t| t.timestamp_ms).max().unwrap_or(0);
    max.saturating_sub(min)
}
