use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;

use crate::risk::types::TransactionRecord;

use super::TransactionSource;

/// Wallet history served from an indexer's `transfers` table.
///
/// The table records token transfers, not transactions, so gas prices are
/// unknown and reported as zero.
pub struct PgTransactionSource {
    pool: PgPool,
    chain_id: i64,
    max_transactions: i64,
}

type TransferRow = (i64, Vec<u8>, Vec<u8>, Vec<u8>, BigDecimal, DateTime<Utc>);

impl PgTransactionSource {
    pub fn new(pool: PgPool, chain_id: i64, max_transactions: usize) -> Self {
        Self {
            pool,
            chain_id,
            max_transactions: max_transactions as i64,
        }
    }
}

#[async_trait]
impl TransactionSource for PgTransactionSource {
    async fn latest_block(&self) -> eyre::Result<u64> {
        let (tip,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(block_number) FROM transfers WHERE chain_id = $1")
                .bind(self.chain_id)
                .fetch_one(&self.pool)
                .await?;

        tip.map(|b| b.max(0) as u64)
            .ok_or_else(|| eyre::eyre!("No transfers indexed for chain {}", self.chain_id))
    }

    async fn transactions(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> eyre::Result<Vec<TransactionRecord>> {
        // newest rows first so the cap keeps the most recent window
        let rows: Vec<TransferRow> = sqlx::query_as(
            "SELECT block_number, tx_hash, from_address, to_address, amount, block_timestamp
             FROM transfers
             WHERE chain_id = $1
               AND (from_address = $2 OR to_address = $2)
               AND block_number BETWEEN $3 AND $4
             ORDER BY block_number DESC, log_index DESC
             LIMIT $5",
        )
        .bind(self.chain_id)
        .bind(address.as_slice())
        .bind(from_block as i64)
        .bind(to_block.min(i64::MAX as u64) as i64)
        .bind(self.max_transactions)
        .fetch_all(&self.pool)
        .await?;

        let mut records = rows
            .into_iter()
            .map(row_to_record)
            .collect::<eyre::Result<Vec<_>>>()?;
        records.reverse();

        tracing::debug!(
            address = %address,
            chain_id = self.chain_id,
            transactions = records.len(),
            "Loaded transfers from database"
        );
        Ok(records)
    }
}

fn row_to_record(row: TransferRow) -> eyre::Result<TransactionRecord> {
    let (block_number, tx_hash, from, to, amount, timestamp) = row;
    Ok(TransactionRecord {
        hash: bytes_to_b256(&tx_hash)?,
        from: bytes_to_address(&from)?,
        to: bytes_to_address(&to)?,
        value: numeric_to_u256(&amount)?,
        gas_price: 0,
        timestamp_ms: timestamp.timestamp_millis(),
        block_number: block_number.max(0) as u64,
    })
}

fn bytes_to_address(bytes: &[u8]) -> eyre::Result<Address> {
    if bytes.len() != 20 {
        return Err(eyre::eyre!("Stored address has {} bytes, expected 20", bytes.len()));
    }
    Ok(Address::from_slice(bytes))
}

fn bytes_to_b256(bytes: &[u8]) -> eyre::Result<B256> {
    if bytes.len() != 32 {
        return Err(eyre::eyre!("Stored hash has {} bytes, expected 32", bytes.len()));
    }
    Ok(B256::from_slice(bytes))
}

/// Convert a raw integer NUMERIC amount to U256.
fn numeric_to_u256(amount: &BigDecimal) -> eyre::Result<U256> {
    let integer = amount.with_scale(0).to_string();
    U256::from_str(&integer).map_err(|e| eyre::eyre!("Invalid stored amount '{}': {}", integer, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_conversion() {
        let amount = BigDecimal::from_str("1000000000000000000").unwrap();
        assert_eq!(
            numeric_to_u256(&amount).unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert!(numeric_to_u256(&BigDecimal::from(-5)).is_err());
    }

    #[test]
    fn test_row_conversion_rejects_short_address() {
        let row: TransferRow = (
            10,
            vec![0u8; 32],
            vec![1u8; 19],
            vec![2u8; 20],
            BigDecimal::from(5),
            Utc::now(),
        );
        assert!(row_to_record(row).is_err());
    }

    #[test]
    fn test_row_conversion() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let row: TransferRow = (
            10,
            vec![7u8; 32],
            vec![1u8; 20],
            vec![2u8; 20],
            BigDecimal::from(5),
            ts,
        );
        let record = row_to_record(row).unwrap();
        assert_eq!(record.block_number, 10);
        assert_eq!(record.value, U256::from(5u64));
        assert_eq!(record.timestamp_ms, 1_700_000_000_000);
        assert_eq!(record.from, Address::repeat_byte(1));
    }
}
