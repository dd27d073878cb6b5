use alloy::primitives::Address;
use std::collections::{HashMap, HashSet};

use super::types::{FraudPattern, TransactionRecord};

/// Gap below which two consecutive transactions count as rapid.
const RAPID_GAP_MS: i64 = 60_000;
/// Minimum sample size for the rapid-succession check.
const RAPID_MIN_TRANSACTIONS: usize = 5;
/// A single address pair seen more often than this is treated as wash trading.
const WASH_PAIR_LIMIT: usize = 5;

/// Run every heuristic check over a transaction list.
///
/// All checks run independently and any subset may fire. The input order is
/// preserved; checks that need a different order sort their own copy.
/// Returned patterns are in vocabulary order.
pub fn detect_fraud_patterns(transactions: &[TransactionRecord]) -> Vec<FraudPattern> {
    let mut patterns = Vec::new();

    if check_rapid_transactions(transactions) {
        patterns.push(FraudPattern::RapidTransactions);
    }
    if check_wash_trading(transactions) {
        patterns.push(FraudPattern::WashTrading);
    }
    if check_circular_transactions(transactions) {
        patterns.push(FraudPattern::CircularTransactions);
    }
    if check_sybil_pattern(transactions) {
        patterns.push(FraudPattern::SybilAttack);
    }
    if check_front_running(transactions) {
        patterns.push(FraudPattern::FrontRunning);
    }
    if check_sandwich_attack(transactions) {
        patterns.push(FraudPattern::SandwichAttack);
    }

    patterns
}

/// More than 30% of timestamp-adjacent gaps are under a minute.
pub fn check_rapid_transactions(transactions: &[TransactionRecord]) -> bool {
    if transactions.len() < RAPID_MIN_TRANSACTIONS {
        return false;
    }

    let mut timestamps: Vec<i64> = transactions.iter().map(|t| t.timestamp_ms).collect();
    timestamps.sort_unstable();

    let rapid = timestamps
        .windows(2)
        .filter(|w| w[1].saturating_sub(w[0]) < RAPID_GAP_MS)
        .count();

    // rapid > 0.3 * len, kept in integers so the boundary is exact
    rapid * 10 > transactions.len() * 3
}

/// Some unordered (from, to) pair appears more than five times.
pub fn check_wash_trading(transactions: &[TransactionRecord]) -> bool {
    let mut pairs: HashMap<(Address, Address), usize> = HashMap::new();
    for tx in transactions {
        let key = if tx.from <= tx.to {
            (tx.from, tx.to)
        } else {
            (tx.to, tx.from)
        };
        *pairs.entry(key).or_insert(0) += 1;
    }
    pairs.values().any(|&count| count > WASH_PAIR_LIMIT)
}

/// Fewer distinct participants than half the transaction count.
pub fn check_circular_transactions(transactions: &[TransactionRecord]) -> bool {
    let participants: HashSet<Address> = transactions
        .iter()
        .flat_map(|t| [t.from, t.to])
        .collect();
    participants.len() * 2 < transactions.len()
}

/// Distinct recipients exceed 80% of the transaction count.
pub fn check_sybil_pattern(transactions: &[TransactionRecord]) -> bool {
    let recipients: HashSet<Address> = transactions.iter().map(|t| t.to).collect();
    recipients.len() * 10 > transactions.len() * 8
}

/// The top-decile gas price is more than double the lowest gas price.
pub fn check_front_running(transactions: &[TransactionRecord]) -> bool {
    let mut gas: Vec<u128> = transactions.iter().map(|t| t.gas_price).collect();
    gas.sort_unstable_by(|a, b| b.cmp(a));

    let top_len = (gas.len() * 10).div_ceil(100);
    let (Some(&highest), Some(&lowest)) = (gas[..top_len].first(), gas.last()) else {
        return false;
    };

    highest > lowest.saturating_mul(2)
}

/// An interior transaction wedged between two identical (from, to) transfers
/// from a different sender.
pub fn check_sandwich_attack(transactions: &[TransactionRecord]) -> bool {
    transactions.windows(3).any(|w| {
        let (prev, tx, next) = (&w[0], &w[1], &w[2]);
        prev.from == next.from && prev.to == next.to && tx.from != prev.from
    })
}
