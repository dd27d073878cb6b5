use alloy::primitives::{Address, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::config::RpcConfig;
use crate::risk::types::{AssetId, OwnershipTransfer, TransactionRecord};

use super::decoder::{
    address_topic, decode_erc20_transfer, decode_erc721_transfer, uint_topic, DecodedTransfer,
};
use super::{OwnershipSource, TransactionSource};

const TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";

/// In-flight block and receipt lookups per history fetch.
const RESOLVE_CONCURRENCY: usize = 16;

/// Build a type-erased HTTP provider shared by every RPC-backed component.
pub fn connect_http(url: &str) -> eyre::Result<DynProvider> {
    let provider = ProviderBuilder::new().connect_http(
        url.parse()
            .map_err(|e| eyre::eyre!("Invalid RPC URL '{}': {}", url, e))?,
    );
    Ok(provider.erased())
}

/// Wallet history built from ERC-20 Transfer logs touching the address.
pub struct RpcTransactionSource {
    provider: DynProvider,
    tokens: Vec<Address>,
    log_batch_size: u64,
    max_transactions: usize,
    max_retries: u32,
}

impl RpcTransactionSource {
    pub fn new(provider: DynProvider, config: &RpcConfig, tokens: Vec<Address>) -> Self {
        Self {
            provider,
            tokens,
            log_batch_size: config.log_batch_size.max(1),
            max_transactions: config.max_transactions,
            max_retries: config.max_retries,
        }
    }

    fn transfer_filter(&self, from_block: u64, to_block: u64) -> Filter {
        let filter = Filter::new()
            .event(TRANSFER_EVENT)
            .from_block(from_block)
            .to_block(to_block);
        if self.tokens.is_empty() {
            filter
        } else {
            filter.address(self.tokens.clone())
        }
    }

    async fn fetch_logs(&self, filter: &Filter) -> eyre::Result<Vec<Log>> {
        retry_rpc(self.max_retries, || self.provider.get_logs(filter)).await
    }

    async fn block_timestamp_ms(&self, block_number: u64) -> eyre::Result<(u64, i64)> {
        let block = retry_rpc(self.max_retries, || async {
            self.provider
                .get_block_by_number(BlockNumberOrTag::Number(block_number))
                .await
        })
        .await?
        .ok_or_else(|| eyre::eyre!("Block {} not found", block_number))?;

        Ok((block_number, block.header.timestamp as i64 * 1000))
    }

    async fn gas_price(&self, tx_hash: B256) -> eyre::Result<(B256, u128)> {
        let receipt =
            retry_rpc(self.max_retries, || self.provider.get_transaction_receipt(tx_hash)).await?;
        Ok((tx_hash, receipt.map(|r| r.effective_gas_price).unwrap_or(0)))
    }

    /// Timestamps for blocks whose logs came without one, and the effective
    /// gas price of every transaction, fetched concurrently.
    async fn resolve_metadata(
        &self,
        transfers: &[DecodedTransfer],
    ) -> eyre::Result<(HashMap<u64, i64>, HashMap<B256, u128>)> {
        let blocks: HashSet<u64> = transfers
            .iter()
            .filter(|t| t.block_timestamp.is_none())
            .map(|t| t.block_number)
            .collect();
        let hashes: HashSet<B256> = transfers.iter().map(|t| t.tx_hash).collect();

        let timestamps = stream::iter(blocks)
            .map(|n| self.block_timestamp_ms(n))
            .buffer_unordered(RESOLVE_CONCURRENCY)
            .try_collect::<HashMap<_, _>>();
        let gas_prices = stream::iter(hashes)
            .map(|h| self.gas_price(h))
            .buffer_unordered(RESOLVE_CONCURRENCY)
            .try_collect::<HashMap<_, _>>();

        tokio::try_join!(timestamps, gas_prices)
    }
}

/// Inclusive block ranges of at most `batch` blocks covering `[from, to]`.
fn chunk_ranges(from: u64, to: u64, batch: u64) -> Vec<(u64, u64)> {
    let batch = batch.max(1);
    let mut ranges = Vec::new();
    let mut current = from;
    while current <= to {
        let end = current.saturating_add(batch - 1).min(to);
        ranges.push((current, end));
        if end == u64::MAX {
            break;
        }
        current = end + 1;
    }
    ranges
}

/// Drop repeated `(tx_hash, log_index)` pairs. A self-transfer matches both
/// the sent and the received filter.
fn dedupe_transfers(transfers: Vec<DecodedTransfer>) -> Vec<DecodedTransfer> {
    let mut seen: HashSet<(B256, u64)> = HashSet::new();
    transfers
        .into_iter()
        .filter(|t| seen.insert((t.tx_hash, t.log_index)))
        .collect()
}

/// Chain order, keeping only the newest `max` transfers.
fn keep_newest(mut transfers: Vec<DecodedTransfer>, max: usize) -> Vec<DecodedTransfer> {
    transfers.sort_by_key(|t| (t.block_number, t.log_index));
    if transfers.len() > max {
        let excess = transfers.len() - max;
        transfers.drain(..excess);
    }
    transfers
}

#[async_trait]
impl TransactionSource for RpcTransactionSource {
    async fn latest_block(&self) -> eyre::Result<u64> {
        retry_rpc(self.max_retries, || self.provider.get_block_number()).await
    }

    async fn transactions(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> eyre::Result<Vec<TransactionRecord>> {
        let topic = address_topic(address);
        let mut decoded: Vec<DecodedTransfer> = Vec::new();

        for (start, end) in chunk_ranges(from_block, to_block, self.log_batch_size) {
            let sent = self.transfer_filter(start, end).topic1(topic);
            let received = self.transfer_filter(start, end).topic2(topic);

            for filter in [sent, received] {
                let logs = self.fetch_logs(&filter).await?;
                decoded.extend(logs.iter().filter_map(decode_erc20_transfer));
            }

            tracing::debug!(
                address = %address,
                from = start,
                to = end,
                collected = decoded.len(),
                "Scanned transfer logs"
            );
        }

        let decoded = keep_newest(dedupe_transfers(decoded), self.max_transactions);
        let (timestamps, gas_prices) = self.resolve_metadata(&decoded).await?;

        let records: Vec<TransactionRecord> = decoded
            .into_iter()
            .map(|transfer| TransactionRecord {
                hash: transfer.tx_hash,
                from: transfer.from,
                to: transfer.to,
                value: transfer.value,
                gas_price: gas_prices.get(&transfer.tx_hash).copied().unwrap_or(0),
                timestamp_ms: match transfer.block_timestamp {
                    Some(ts) => ts as i64 * 1000,
                    None => timestamps.get(&transfer.block_number).copied().unwrap_or(0),
                },
                block_number: transfer.block_number,
            })
            .collect();

        tracing::info!(
            address = %address,
            from_block,
            to_block,
            transactions = records.len(),
            "Fetched transaction history"
        );

        Ok(records)
    }
}

/// Asset history built from ERC-721 Transfer logs for one token id.
pub struct RpcOwnershipSource {
    provider: DynProvider,
    lookback_blocks: Option<u64>,
    max_retries: u32,
}

impl RpcOwnershipSource {
    pub fn new(provider: DynProvider, config: &RpcConfig) -> Self {
        Self {
            provider,
            lookback_blocks: config.ownership_lookback_blocks,
            max_retries: config.max_retries,
        }
    }
}

#[async_trait]
impl OwnershipSource for RpcOwnershipSource {
    async fn ownership_history(&self, asset: &AssetId) -> eyre::Result<Vec<OwnershipTransfer>> {
        let tip = retry_rpc(self.max_retries, || self.provider.get_block_number()).await?;
        let from_block = self
            .lookback_blocks
            .map(|lookback| tip.saturating_sub(lookback))
            .unwrap_or(0);

        let filter = Filter::new()
            .address(asset.contract)
            .event(TRANSFER_EVENT)
            .topic3(uint_topic(asset.token_id))
            .from_block(from_block)
            .to_block(tip);

        let logs = retry_rpc(self.max_retries, || self.provider.get_logs(&filter)).await?;

        let mut transfers: Vec<DecodedTransfer> =
            logs.iter().filter_map(decode_erc721_transfer).collect();
        transfers.sort_by_key(|t| (t.block_number, t.log_index));

        let history = transfers
            .into_iter()
            .map(|t| OwnershipTransfer {
                from: t.from,
                to: t.to,
                block_number: t.block_number,
                timestamp_ms: t.block_timestamp.map(|ts| ts as i64 * 1000).unwrap_or(0),
                tx_hash: t.tx_hash,
            })
            .collect::<Vec<_>>();

        tracing::debug!(asset = %asset, transfers = history.len(), "Fetched ownership history");
        Ok(history)
    }
}

/// Retry an async operation with exponential backoff.
/// Handles transient RPC errors (rate limits, network issues).
pub async fn retry_rpc<F, Fut, T, E>(max_retries: u32, mut f: F) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = Duration::from_millis(250);

    for attempt in 0..max_retries {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "RPC call failed, retrying..."
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(5));
            }
        }
    }

    f().await
        .map_err(|e| eyre::eyre!("RPC call failed after {} retries: {}", max_retries, e))
}
