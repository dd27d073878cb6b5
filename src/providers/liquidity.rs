use alloy::primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;

use crate::config::LiquidityConfig;
use crate::risk::types::AssetId;

use super::LiquidityProvider;

/// Liquidity risk from configured defaults with per-address overrides.
///
/// Stands in for a market-depth feed; an override keyed by a token contract
/// applies to every token id of that contract.
pub struct StaticLiquidity {
    wallet_default: u32,
    asset_default: u32,
    overrides: HashMap<Address, u32>,
}

impl StaticLiquidity {
    pub fn from_config(config: &LiquidityConfig) -> eyre::Result<Self> {
        let mut overrides = HashMap::new();
        for o in &config.overrides {
            let address = Address::from_str(o.address.trim())
                .map_err(|e| eyre::eyre!("Invalid liquidity override '{}': {}", o.address, e))?;
            overrides.insert(address, o.score);
        }
        Ok(Self {
            wallet_default: config.wallet_default_score,
            asset_default: config.asset_default_score,
            overrides,
        })
    }
}

#[async_trait]
impl LiquidityProvider for StaticLiquidity {
    async fn wallet_score(&self, address: Address) -> eyre::Result<u32> {
        Ok(self.overrides.get(&address).copied().unwrap_or(self.wallet_default))
    }

    async fn asset_score(&self, asset: &AssetId) -> eyre::Result<u32> {
        Ok(self
            .overrides
            .get(&asset.contract)
            .copied()
            .unwrap_or(self.asset_default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreOverride;
    use alloy::primitives::U256;

    #[tokio::test]
    async fn test_defaults_and_overrides() {
        let config = LiquidityConfig {
            overrides: vec![ScoreOverride {
                address: "0x0000000000000000000000000000000000000007".to_string(),
                score: 900,
            }],
            ..Default::default()
        };
        let provider = StaticLiquidity::from_config(&config).unwrap();

        assert_eq!(provider.wallet_score(Address::with_last_byte(1)).await.unwrap(), 150);
        assert_eq!(provider.wallet_score(Address::with_last_byte(7)).await.unwrap(), 900);

        let asset = AssetId {
            contract: Address::with_last_byte(2),
            token_id: U256::from(1u64),
        };
        assert_eq!(provider.asset_score(&asset).await.unwrap(), 300);
    }
}
