pub mod compliance;
pub mod decoder;
pub mod liquidity;
pub mod pg;
pub mod rpc;

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::risk::types::{AssetId, ComplianceStatus, OwnershipTransfer, TransactionRecord};

/// Source of a wallet's transaction history.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Highest block the source can answer for.
    async fn latest_block(&self) -> eyre::Result<u64>;

    /// Transactions sent or received by `address` in `[from_block, to_block]`.
    async fn transactions(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> eyre::Result<Vec<TransactionRecord>>;
}

/// Source of an asset's transfer history.
#[async_trait]
pub trait OwnershipSource: Send + Sync {
    async fn ownership_history(&self, asset: &AssetId) -> eyre::Result<Vec<OwnershipTransfer>>;
}

#[async_trait]
pub trait ComplianceProvider: Send + Sync {
    async fn wallet_status(&self, address: Address) -> eyre::Result<ComplianceStatus>;

    /// Compliance sub-score for a tokenized asset, in [0, 1000].
    async fn asset_score(&self, asset: &AssetId) -> eyre::Result<u32>;
}

#[async_trait]
pub trait LiquidityProvider: Send + Sync {
    /// Liquidity risk for a wallet's holdings, in [0, 1000].
    async fn wallet_score(&self, address: Address) -> eyre::Result<u32>;

    async fn asset_score(&self, asset: &AssetId) -> eyre::Result<u32>;
}
