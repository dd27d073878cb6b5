use alloy::primitives::Address;
use chrono::Utc;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RiskConfig;
use crate::db::repository::{insert_assessment, AssessmentSubject};
use crate::error::{RiskError, RiskResult};
use crate::providers::{ComplianceProvider, LiquidityProvider, OwnershipSource, TransactionSource};

use super::analysis::analyze_transactions;
use super::asset::{asset_metrics, assess_asset};
use super::metrics::{
    behavior_score, compliance_score, diversification_score, velocity_score, MAX_SCORE,
};
use super::patterns;
use super::recommend::{wallet_recommendations, wallet_risk_factors};
use super::scoring::{composite_score, confidence, determine_risk_level};
use super::types::{
    parse_address, AssetId, FraudPattern, RiskAnalysis, RiskMetrics, TransactionAnalysis,
    TransactionRecord,
};

/// Runtime settings for [`RiskService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_block_range: u64,
    pub fetch_timeout: Duration,
    pub persist_assessments: bool,
}

impl ServiceConfig {
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            default_block_range: config.default_block_range,
            fetch_timeout: config.fetch_timeout(),
            persist_assessments: config.persist_assessments,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_config(&RiskConfig::default())
    }
}

/// The four upstream data sources an assessment depends on.
#[derive(Clone)]
pub struct RiskProviders {
    pub transactions: Arc<dyn TransactionSource>,
    pub ownership: Arc<dyn OwnershipSource>,
    pub compliance: Arc<dyn ComplianceProvider>,
    pub liquidity: Arc<dyn LiquidityProvider>,
}

/// Wallet and asset risk assessment over injected providers.
///
/// Holds no per-request state; every call fetches fresh data. Each upstream
/// call is bounded by `fetch_timeout`, and any failure aborts the assessment
/// with [`RiskError::DataUnavailable`] rather than scoring on partial data.
pub struct RiskService {
    providers: RiskProviders,
    config: ServiceConfig,
    pool: Option<PgPool>,
}

impl RiskService {
    pub fn new(providers: RiskProviders, config: ServiceConfig) -> Self {
        Self {
            providers,
            config,
            pool: None,
        }
    }

    /// Persist every produced assessment to `risk_assessments`.
    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn persistence_enabled(&self) -> bool {
        self.pool.is_some() && self.config.persist_assessments
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Fetch the wallet's recent history and summarize it.
    pub async fn analyze_wallet_transactions(
        &self,
        address: &str,
        block_range: Option<u64>,
    ) -> RiskResult<TransactionAnalysis> {
        let address = parse_address(address)?;
        let block_range = self.resolve_block_range(block_range)?;
        self.fetch_analysis(address, block_range).await
    }

    /// Summary plus the five sub-scores for a wallet.
    pub async fn calculate_risk_metrics(
        &self,
        address: &str,
        block_range: Option<u64>,
    ) -> RiskResult<(TransactionAnalysis, RiskMetrics)> {
        let address = parse_address(address)?;
        let block_range = self.resolve_block_range(block_range)?;
        let analysis = self.fetch_analysis(address, block_range).await?;
        let metrics = self.metrics_for(&analysis).await?;
        Ok((analysis, metrics))
    }

    /// Full wallet assessment: score, band, confidence, factors and recommendations.
    pub async fn generate_risk_assessment(
        &self,
        address: &str,
        block_range: Option<u64>,
    ) -> RiskResult<RiskAnalysis> {
        let (analysis, metrics) = self.calculate_risk_metrics(address, block_range).await?;

        let risk_score = composite_score(&metrics);
        let risk_level = determine_risk_level(risk_score);
        let result = RiskAnalysis {
            risk_score,
            risk_level,
            confidence: confidence(&analysis),
            factors: wallet_risk_factors(&metrics, &analysis),
            recommendations: wallet_recommendations(risk_level),
            last_analyzed: Utc::now(),
        };

        tracing::info!(
            address = %analysis.address,
            risk_score,
            risk_level = %risk_level,
            confidence = result.confidence,
            transactions = analysis.transaction_count,
            patterns = analysis.patterns.len(),
            "Wallet risk assessment complete"
        );

        self.persist(
            AssessmentSubject::Wallet(analysis.address),
            &result,
            &analysis.patterns,
        )
        .await;
        Ok(result)
    }

    /// Assessment for one tokenized asset.
    pub async fn analyze_asset_risk(&self, contract: &str, token_id: &str) -> RiskResult<RiskAnalysis> {
        let asset = AssetId::parse(contract, token_id)?;

        let (history, liquidity, compliance) = tokio::try_join!(
            self.bounded(
                "ownership history",
                self.providers.ownership.ownership_history(&asset)
            ),
            self.bounded("liquidity", self.providers.liquidity.asset_score(&asset)),
            self.bounded("compliance", self.providers.compliance.asset_score(&asset)),
        )?;

        let metrics = asset_metrics(&history, liquidity, compliance);
        let result = assess_asset(&metrics, Utc::now());

        tracing::info!(
            asset = %asset,
            risk_score = result.risk_score,
            risk_level = %result.risk_level,
            transfers = metrics.transaction_count,
            patterns = 0,
            "Asset risk assessment complete"
        );

        self.persist(AssessmentSubject::Asset(&asset), &result, &[]).await;
        Ok(result)
    }

    pub fn detect_fraud_patterns(&self, transactions: &[TransactionRecord]) -> Vec<FraudPattern> {
        patterns::detect_fraud_patterns(transactions)
    }

    fn resolve_block_range(&self, block_range: Option<u64>) -> RiskResult<u64> {
        match block_range {
            Some(0) => Err(RiskError::invalid("block range must be greater than zero")),
            Some(range) => Ok(range),
            None => Ok(self.config.default_block_range),
        }
    }

    async fn fetch_analysis(&self, address: Address, block_range: u64) -> RiskResult<TransactionAnalysis> {
        let source = &self.providers.transactions;
        let tip = self.bounded("transaction history", source.latest_block()).await?;
        let from_block = tip.saturating_sub(block_range);

        let transactions = self
            .bounded(
                "transaction history",
                source.transactions(address, from_block, tip),
            )
            .await?;

        tracing::debug!(
            address = %address,
            from_block,
            to_block = tip,
            transactions = transactions.len(),
            "Analyzing transaction window"
        );

        Ok(analyze_transactions(address, &transactions))
    }

    async fn metrics_for(&self, analysis: &TransactionAnalysis) -> RiskResult<RiskMetrics> {
        let (status, liquidity) = tokio::try_join!(
            self.bounded(
                "compliance",
                self.providers.compliance.wallet_status(analysis.address)
            ),
            self.bounded(
                "liquidity",
                self.providers.liquidity.wallet_score(analysis.address)
            ),
        )?;

        Ok(RiskMetrics {
            velocity_score: velocity_score(analysis),
            diversification_score: diversification_score(analysis),
            behavior_score: behavior_score(analysis),
            compliance_score: compliance_score(&status),
            liquidity_score: liquidity.min(MAX_SCORE),
        })
    }

    /// Run one upstream call under the fetch timeout.
    async fn bounded<T, F>(&self, source_name: &'static str, call: F) -> RiskResult<T>
    where
        F: Future<Output = eyre::Result<T>>,
    {
        match tokio::time::timeout(self.config.fetch_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(source = source_name, error = %e, "Upstream lookup failed");
                Err(RiskError::unavailable(source_name, e))
            }
            Err(_) => {
                tracing::warn!(
                    source = source_name,
                    timeout_ms = self.config.fetch_timeout.as_millis() as u64,
                    "Upstream lookup timed out"
                );
                Err(RiskError::unavailable(
                    source_name,
                    format!("timed out after {}ms", self.config.fetch_timeout.as_millis()),
                ))
            }
        }
    }

    async fn persist(
        &self,
        subject: AssessmentSubject<'_>,
        analysis: &RiskAnalysis,
        patterns: &[FraudPattern],
    ) {
        if !self.config.persist_assessments {
            return;
        }
        let Some(pool) = &self.pool else {
            return;
        };
        if let Err(e) = insert_assessment(pool, subject, analysis, patterns).await {
            tracing::warn!(error = %e, "Failed to persist risk assessment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::types::{ComplianceStatus, OwnershipTransfer, RiskLevel};
    use alloy::primitives::{B256, U256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";

    struct FixedTransactions {
        tip: u64,
        records: Vec<TransactionRecord>,
        calls: AtomicUsize,
        last_window: std::sync::Mutex<Option<(u64, u64)>>,
    }

    impl FixedTransactions {
        fn new(tip: u64, records: Vec<TransactionRecord>) -> Self {
            Self {
                tip,
                records,
                calls: AtomicUsize::new(0),
                last_window: std::sync::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TransactionSource for FixedTransactions {
        async fn latest_block(&self) -> eyre::Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tip)
        }

        async fn transactions(
            &self,
            _address: Address,
            from_block: u64,
            to_block: u64,
        ) -> eyre::Result<Vec<TransactionRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_window.lock().unwrap() = Some((from_block, to_block));
            Ok(self.records.clone())
        }
    }

    struct StalledTransactions;

    #[async_trait]
    impl TransactionSource for StalledTransactions {
        async fn latest_block(&self) -> eyre::Result<u64> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(0)
        }

        async fn transactions(&self, _: Address, _: u64, _: u64) -> eyre::Result<Vec<TransactionRecord>> {
            Ok(Vec::new())
        }
    }

    struct FixedOwnership(usize);

    #[async_trait]
    impl OwnershipSource for FixedOwnership {
        async fn ownership_history(&self, _asset: &AssetId) -> eyre::Result<Vec<OwnershipTransfer>> {
            Ok((0..self.0)
                .map(|i| OwnershipTransfer {
                    from: Address::with_last_byte(i as u8),
                    to: Address::with_last_byte(i as u8 + 1),
                    block_number: i as u64,
                    timestamp_ms: 0,
                    tx_hash: B256::ZERO,
                })
                .collect())
        }
    }

    struct FixedCompliance {
        status: ComplianceStatus,
        fail: bool,
    }

    #[async_trait]
    impl ComplianceProvider for FixedCompliance {
        async fn wallet_status(&self, _address: Address) -> eyre::Result<ComplianceStatus> {
            if self.fail {
                return Err(eyre::eyre!("label store offline"));
            }
            Ok(self.status)
        }

        async fn asset_score(&self, _asset: &AssetId) -> eyre::Result<u32> {
            Ok(150)
        }
    }

    struct FixedLiquidity;

    #[async_trait]
    impl LiquidityProvider for FixedLiquidity {
        async fn wallet_score(&self, _address: Address) -> eyre::Result<u32> {
            Ok(150)
        }

        async fn asset_score(&self, _asset: &AssetId) -> eyre::Result<u32> {
            Ok(300)
        }
    }

    fn service_with(transactions: Arc<dyn TransactionSource>, compliance_fails: bool) -> RiskService {
        let providers = RiskProviders {
            transactions,
            ownership: Arc::new(FixedOwnership(1)),
            compliance: Arc::new(FixedCompliance {
                status: ComplianceStatus::default(),
                fail: compliance_fails,
            }),
            liquidity: Arc::new(FixedLiquidity),
        };
        let config = ServiceConfig {
            default_block_range: 10_000,
            fetch_timeout: Duration::from_millis(50),
            persist_assessments: true,
        };
        RiskService::new(providers, config)
    }

    /// A thousand transfers ping-ponging between two wallets one second apart.
    fn ping_pong(n: usize) -> Vec<TransactionRecord> {
        let a = Address::with_last_byte(0xaa);
        let b = Address::with_last_byte(0xbb);
        (0..n)
            .map(|i| {
                let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
                TransactionRecord {
                    hash: B256::with_last_byte(i as u8),
                    from,
                    to,
                    value: U256::from(1_000_000_000_000_000_000u128),
                    gas_price: 20_000_000_000,
                    timestamp_ms: 1_700_000_000_000 + i as i64 * 1000,
                    block_number: 1000 + i as u64,
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_wallet_assessment_on_ping_pong_history() {
        let source = Arc::new(FixedTransactions::new(50_000, ping_pong(1000)));
        let service = service_with(source.clone(), false);

        let (analysis, metrics) = service.calculate_risk_metrics(WALLET, None).await.unwrap();
        assert_eq!(analysis.transaction_count, 1000);
        assert!(analysis.patterns.contains(&FraudPattern::RapidTransactions));
        assert!(analysis.patterns.contains(&FraudPattern::CircularTransactions));
        assert_eq!(metrics.velocity_score, 800);
        assert_eq!(metrics.diversification_score, 700);
        // rapid + wash + circular
        assert_eq!(metrics.behavior_score, 750);
        assert_eq!(metrics.compliance_score, 300);
        assert_eq!(*source.last_window.lock().unwrap(), Some((40_000, 50_000)));

        let result = service.generate_risk_assessment(WALLET, None).await.unwrap();
        assert_eq!(result.risk_score, 603);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.confidence, 0.8);
        assert!(result.factors.contains(&"Fraud pattern detected".to_string()));
        assert!(!result.factors.contains(&"Limited transaction history".to_string()));
        assert_eq!(
            result.recommendations,
            vec!["Comprehensive risk assessment required", "Consider transaction limits"]
        );
    }

    #[tokio::test]
    async fn test_empty_wallet() {
        let service = service_with(Arc::new(FixedTransactions::new(100, Vec::new())), false);
        let (analysis, metrics) = service.calculate_risk_metrics(WALLET, Some(500)).await.unwrap();
        assert_eq!(analysis.transaction_count, 0);
        assert_eq!(analysis.average_gas_price, "0");
        assert_eq!(metrics.velocity_score, 100);
        assert_eq!(metrics.diversification_score, 700);
        assert_eq!(metrics.behavior_score, 0);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_io() {
        let source = Arc::new(FixedTransactions::new(100, ping_pong(10)));
        let service = service_with(source.clone(), false);

        let err = service.generate_risk_assessment("0x1234", None).await.unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput(_)));

        let err = service.generate_risk_assessment(WALLET, Some(0)).await.unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput(_)));

        let err = service.analyze_asset_risk(WALLET, "not-a-number").await.unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput(_)));

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_data_unavailable() {
        let service = service_with(Arc::new(StalledTransactions), false);
        let err = service.generate_risk_assessment(WALLET, None).await.unwrap_err();
        match err {
            RiskError::DataUnavailable { source_name, reason } => {
                assert_eq!(source_name, "transaction history");
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_yields_no_score() {
        let service = service_with(Arc::new(FixedTransactions::new(100, ping_pong(10))), true);
        let err = service.generate_risk_assessment(WALLET, None).await.unwrap_err();
        assert!(matches!(
            err,
            RiskError::DataUnavailable { source_name: "compliance", .. }
        ));
    }

    #[tokio::test]
    async fn test_asset_assessment() {
        let service = service_with(Arc::new(FixedTransactions::new(100, Vec::new())), false);
        let result = service
            .analyze_asset_risk("0x0000000000000000000000000000000000000001", "42")
            .await
            .unwrap();
        assert_eq!(result.risk_score, 205);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.confidence, 0.85);
    }

    #[tokio::test]
    async fn test_block_range_window_saturates_at_genesis() {
        let source = Arc::new(FixedTransactions::new(300, Vec::new()));
        let service = service_with(source.clone(), false);
        service.analyze_wallet_transactions(WALLET, Some(1000)).await.unwrap();
        assert_eq!(*source.last_window.lock().unwrap(), Some((0, 300)));
    }

    #[test]
    fn test_pattern_passthrough() {
        let service = service_with(Arc::new(FixedTransactions::new(0, Vec::new())), false);
        assert!(service.detect_fraud_patterns(&[]).is_empty());
        assert!(!service.persistence_enabled());
    }
}
