use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::Address;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rwa_risk_engine::api::{self, AppState};
use rwa_risk_engine::config::{Config, DatabaseConfig, LogFormat, LoggingConfig, TransactionSourceKind};
use rwa_risk_engine::oracle::chainlink::ChainlinkFeeds;
use rwa_risk_engine::providers::compliance::WatchlistCompliance;
use rwa_risk_engine::providers::liquidity::StaticLiquidity;
use rwa_risk_engine::providers::pg::PgTransactionSource;
use rwa_risk_engine::providers::rpc::{connect_http, RpcOwnershipSource, RpcTransactionSource};
use rwa_risk_engine::providers::TransactionSource;
use rwa_risk_engine::risk::service::{RiskProviders, RiskService, ServiceConfig};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;

    // Initialize structured logging (set RUST_LOG=debug for provider detail)
    init_logging(&config.logging);

    tracing::info!(
        chain_id = config.rpc.chain_id,
        source = ?config.risk.transaction_source,
        "RWA risk engine starting, configuration loaded from {}",
        config_path
    );

    let provider = connect_http(&config.rpc.url)?;

    let pool = match &config.database {
        Some(db) => Some(connect_database(db).await?),
        None => {
            tracing::info!("No database configured, assessments will not be persisted");
            None
        }
    };

    // Compliance labels: config lists, OFAC/watchlist CSVs, then the label table
    let mut compliance = WatchlistCompliance::from_config(&config.compliance)?;
    if let Some(pool) = &pool {
        if let Err(e) = compliance
            .load_from_db(pool, &config.compliance.flag_entity_types)
            .await
        {
            tracing::warn!(error = %e, "Failed to load compliance labels from database, continuing without");
        }
    }
    if compliance.is_empty() {
        tracing::warn!("Compliance label store is empty, every wallet will score as unverified");
    } else {
        tracing::info!(addresses = compliance.len(), "Compliance label store ready");
    }

    let liquidity = StaticLiquidity::from_config(&config.liquidity)?;

    let transactions: Arc<dyn TransactionSource> = match (config.risk.transaction_source, &pool) {
        (TransactionSourceKind::Postgres, Some(pool)) => Arc::new(PgTransactionSource::new(
            pool.clone(),
            config.rpc.chain_id as i64,
            config.rpc.max_transactions,
        )),
        (TransactionSourceKind::Postgres, None) => {
            return Err(eyre::eyre!("postgres transaction source requires a database"));
        }
        (TransactionSourceKind::Rpc, _) => {
            let tokens = config
                .rpc
                .watch_tokens
                .iter()
                .map(|t| {
                    Address::from_str(t).map_err(|e| eyre::eyre!("Invalid watch token '{}': {}", t, e))
                })
                .collect::<eyre::Result<Vec<_>>>()?;
            Arc::new(RpcTransactionSource::new(provider.clone(), &config.rpc, tokens))
        }
    };

    let providers = RiskProviders {
        transactions,
        ownership: Arc::new(RpcOwnershipSource::new(provider.clone(), &config.rpc)),
        compliance: Arc::new(compliance),
        liquidity: Arc::new(liquidity),
    };

    let mut service = RiskService::new(providers, ServiceConfig::from_config(&config.risk));
    if let Some(pool) = pool {
        service = service.with_pool(pool);
    }

    let feeds = ChainlinkFeeds::from_config(provider, &config.oracle, config.rpc.max_retries)?;

    if !config.api.enabled {
        tracing::warn!("API disabled in configuration, nothing to serve");
        return Ok(());
    }

    let state = Arc::new(AppState {
        service,
        feeds: Arc::new(feeds),
    });

    // Create shutdown signal
    let shutdown = CancellationToken::new();

    let api_shutdown = shutdown.clone();
    let host = config.api.host.clone();
    let port = config.api.port;
    let handle = tokio::spawn(async move {
        if let Err(e) = api::serve(state, &host, port, api_shutdown).await {
            tracing::error!(error = %e, "API server failed");
        }
    });

    tracing::info!("RWA risk engine ready. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping API server...");
    shutdown.cancel();

    let _ = handle.await;

    tracing::info!("RWA risk engine stopped gracefully");
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

async fn connect_database(db: &DatabaseConfig) -> eyre::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .connect(&db.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    tracing::info!("Connected to PostgreSQL");

    rwa_risk_engine::db::migrator()
        .run(&pool)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    tracing::info!("Database migrations complete");
    Ok(pool)
}
