pub mod chainlink;
pub mod rwa;

use async_trait::async_trait;
use serde::Serialize;

/// A resolved price, from an on-chain feed or the RWA valuation models.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFeedData {
    pub asset: String,
    pub price: f64,
    pub decimals: u8,
    /// Unix seconds.
    pub updated_at: u64,
    pub round_id: String,
    pub source: String,
}

/// Symbol-keyed spot prices.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// `Ok(None)` when no feed is configured for the symbol.
    async fn price(&self, asset: &str) -> eyre::Result<Option<PriceFeedData>>;
}
