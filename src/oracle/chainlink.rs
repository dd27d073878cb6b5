use alloy::primitives::{Address, I256, U256};
use alloy::providers::DynProvider;
use alloy::sol;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::config::OracleConfig;
use crate::providers::rpc::retry_rpc;

use super::{PriceFeedData, PriceOracle};

sol! {
    #[sol(rpc)]
    interface AggregatorV3Interface {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
        function decimals() external view returns (uint8);
        function description() external view returns (string);
    }
}

/// Chainlink aggregator feeds keyed by upper-cased asset symbol.
pub struct ChainlinkFeeds {
    provider: DynProvider,
    feeds: HashMap<String, Address>,
    max_staleness_secs: u64,
    max_retries: u32,
}

impl ChainlinkFeeds {
    pub fn from_config(provider: DynProvider, config: &OracleConfig, max_retries: u32) -> eyre::Result<Self> {
        let mut feeds = HashMap::new();
        for feed in &config.price_feeds {
            let address = Address::from_str(feed.address.trim())
                .map_err(|e| eyre::eyre!("Invalid price feed address '{}': {}", feed.address, e))?;
            feeds.insert(feed.asset.trim().to_uppercase(), address);
        }
        tracing::info!(feeds = feeds.len(), "Chainlink price feeds configured");

        Ok(Self {
            provider,
            feeds,
            max_staleness_secs: config.max_staleness_secs,
            max_retries,
        })
    }

    pub fn supported_assets(&self) -> Vec<String> {
        let mut assets: Vec<String> = self.feeds.keys().cloned().collect();
        assets.sort();
        assets
    }

    /// Resolve several symbols concurrently. A failing feed maps to `None`.
    pub async fn batch_prices(&self, assets: &[String]) -> BTreeMap<String, Option<PriceFeedData>> {
        let lookups = assets.iter().map(|asset| async move {
            let price = match self.price(asset).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(asset = %asset, error = %e, "Price feed lookup failed");
                    None
                }
            };
            (asset.clone(), price)
        });

        futures::future::join_all(lookups).await.into_iter().collect()
    }
}

#[async_trait]
impl PriceOracle for ChainlinkFeeds {
    async fn price(&self, asset: &str) -> eyre::Result<Option<PriceFeedData>> {
        let symbol = asset.trim().to_uppercase();
        let Some(address) = self.feeds.get(&symbol).copied() else {
            tracing::debug!(asset = %symbol, "No price feed configured");
            return Ok(None);
        };

        let feed = AggregatorV3Interface::new(address, self.provider.clone());
        let (round, decimals, description) = tokio::try_join!(
            retry_rpc(self.max_retries, || async { feed.latestRoundData().call().await }),
            retry_rpc(self.max_retries, || async { feed.decimals().call().await }),
            retry_rpc(self.max_retries, || async { feed.description().call().await }),
        )?;

        let updated_at = u64::try_from(round.updatedAt).unwrap_or(u64::MAX);
        validate_round(
            &symbol,
            round.answer,
            updated_at,
            chrono::Utc::now().timestamp().max(0) as u64,
            self.max_staleness_secs,
        )?;

        let price = scale_answer(round.answer.into_raw(), decimals)?;
        tracing::debug!(asset = %symbol, price, updated_at, "Resolved Chainlink price");

        Ok(Some(PriceFeedData {
            asset: if description.is_empty() { symbol } else { description },
            price,
            decimals,
            updated_at,
            round_id: round.roundId.to_string(),
            source: "Chainlink".to_string(),
        }))
    }
}

/// Reject non-positive answers and rounds older than the staleness window.
fn validate_round(
    symbol: &str,
    answer: I256,
    updated_at: u64,
    now: u64,
    max_staleness_secs: u64,
) -> eyre::Result<()> {
    if answer <= I256::ZERO {
        return Err(eyre::eyre!("Feed for {} returned non-positive answer {}", symbol, answer));
    }
    let age = now.saturating_sub(updated_at);
    if age > max_staleness_secs {
        return Err(eyre::eyre!(
            "Feed for {} is stale: updated {}s ago (max {}s)",
            symbol,
            age,
            max_staleness_secs
        ));
    }
    Ok(())
}

fn scale_answer(raw: U256, decimals: u8) -> eyre::Result<f64> {
    let value: f64 = raw
        .to_string()
        .parse()
        .map_err(|e| eyre::eyre!("Unrepresentable feed answer {}: {}", raw, e))?;
    Ok(value / 10f64.powi(i32::from(decimals)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_round() {
        let answer = I256::from_dec_str("200000000000").unwrap();
        assert!(validate_round("XAU", answer, 1_000, 1_500, 3600).is_ok());
        assert!(validate_round("XAU", answer, 1_000, 10_000, 3600).is_err());
        assert!(validate_round("XAU", I256::ZERO, 1_000, 1_000, 3600).is_err());
        assert!(validate_round("XAU", I256::MINUS_ONE, 1_000, 1_000, 3600).is_err());
        // clock skew where the round is ahead of local time
        assert!(validate_round("XAU", answer, 2_000, 1_000, 0).is_ok());
    }

    #[test]
    fn test_scale_answer() {
        let raw = U256::from(234_567_000_000u64);
        assert_eq!(scale_answer(raw, 8).unwrap(), 2345.67);
        assert_eq!(scale_answer(U256::from(42u64), 0).unwrap(), 42.0);
    }
}
