use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub liquidity: LiquidityConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RpcConfig {
    pub url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_log_batch_size")]
    pub log_batch_size: u64,
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
    /// Limit ownership scans to this many blocks behind the tip. Scans from genesis when unset.
    pub ownership_lookback_blocks: Option<u64>,
    /// ERC-20 contracts whose transfers make up wallet history. Empty means any token.
    #[serde(default)]
    pub watch_tokens: Vec<String>,
}

fn default_chain_id() -> u64 {
    1
}

fn default_max_retries() -> u32 {
    3
}

fn default_log_batch_size() -> u64 {
    2000
}

fn default_max_transactions() -> usize {
    1000
}

// ============================================================
// Risk Service Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSourceKind {
    #[default]
    Rpc,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RiskConfig {
    #[serde(default = "default_block_range")]
    pub default_block_range: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default)]
    pub transaction_source: TransactionSourceKind,
    #[serde(default = "default_true")]
    pub persist_assessments: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            default_block_range: default_block_range(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            transaction_source: TransactionSourceKind::default(),
            persist_assessments: true,
        }
    }
}

impl RiskConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

fn default_block_range() -> u64 {
    10_000
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

// ============================================================
// Compliance & Liquidity Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ComplianceConfig {
    pub ofac_sdn_path: Option<String>,
    #[serde(default)]
    pub kyc_verified: Vec<String>,
    #[serde(default)]
    pub sanctioned: Vec<String>,
    #[serde(default)]
    pub flagged: Vec<String>,
    #[serde(default)]
    pub custom_watchlists: Vec<CustomWatchlistConfig>,
    /// `entity_labels.entity_type` values treated as compliance flags.
    #[serde(default = "default_flag_entity_types")]
    pub flag_entity_types: Vec<String>,
    #[serde(default = "default_asset_compliance_score")]
    pub asset_default_score: u32,
    #[serde(default)]
    pub asset_overrides: Vec<AssetScoreOverride>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            ofac_sdn_path: None,
            kyc_verified: Vec::new(),
            sanctioned: Vec::new(),
            flagged: Vec::new(),
            custom_watchlists: Vec::new(),
            flag_entity_types: default_flag_entity_types(),
            asset_default_score: default_asset_compliance_score(),
            asset_overrides: Vec::new(),
        }
    }
}

fn default_flag_entity_types() -> Vec<String> {
    vec!["mixer".to_string(), "scam".to_string(), "darknet".to_string()]
}

fn default_asset_compliance_score() -> u32 {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct CustomWatchlistConfig {
    pub name: String,
    pub file_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetScoreOverride {
    pub contract: String,
    pub score: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiquidityConfig {
    #[serde(default = "default_wallet_liquidity")]
    pub wallet_default_score: u32,
    #[serde(default = "default_asset_liquidity")]
    pub asset_default_score: u32,
    #[serde(default)]
    pub overrides: Vec<ScoreOverride>,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            wallet_default_score: default_wallet_liquidity(),
            asset_default_score: default_asset_liquidity(),
            overrides: Vec::new(),
        }
    }
}

fn default_wallet_liquidity() -> u32 {
    150
}

fn default_asset_liquidity() -> u32 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoreOverride {
    pub address: String,
    pub score: u32,
}

// ============================================================
// Oracle Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_max_staleness_secs")]
    pub max_staleness_secs: u64,
    #[serde(default)]
    pub price_feeds: Vec<PriceFeedConfig>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_staleness_secs: default_max_staleness_secs(),
            price_feeds: Vec::new(),
        }
    }
}

fn default_max_staleness_secs() -> u64 {
    86_400
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceFeedConfig {
    pub asset: String,
    pub address: String,
}

// ============================================================
// API & Logging Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.rpc.url.trim().is_empty() {
            return Err(eyre::eyre!("rpc.url must be set"));
        }
        if self.rpc.log_batch_size == 0 {
            return Err(eyre::eyre!("rpc.log_batch_size must be greater than zero"));
        }
        if self.risk.fetch_timeout_ms == 0 {
            return Err(eyre::eyre!("risk.fetch_timeout_ms must be greater than zero"));
        }
        if self.risk.default_block_range == 0 {
            return Err(eyre::eyre!("risk.default_block_range must be greater than zero"));
        }
        if self.risk.transaction_source == TransactionSourceKind::Postgres && self.database.is_none() {
            return Err(eyre::eyre!(
                "risk.transaction_source = \"postgres\" requires a [database] section"
            ));
        }

        let addresses = self
            .rpc
            .watch_tokens
            .iter()
            .map(|a| ("rpc.watch_tokens", a))
            .chain(self.compliance.kyc_verified.iter().map(|a| ("compliance.kyc_verified", a)))
            .chain(self.compliance.sanctioned.iter().map(|a| ("compliance.sanctioned", a)))
            .chain(self.compliance.flagged.iter().map(|a| ("compliance.flagged", a)))
            .chain(
                self.compliance
                    .asset_overrides
                    .iter()
                    .map(|o| ("compliance.asset_overrides", &o.contract)),
            )
            .chain(
                self.liquidity
                    .overrides
                    .iter()
                    .map(|o| ("liquidity.overrides", &o.address)),
            )
            .chain(
                self.oracle
                    .price_feeds
                    .iter()
                    .map(|f| ("oracle.price_feeds", &f.address)),
            );

        for (field, address) in addresses {
            if !is_address(address) {
                return Err(eyre::eyre!("Invalid address '{}' in {}", address, field));
            }
        }
        Ok(())
    }
}

fn is_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}
