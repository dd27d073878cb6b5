pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::oracle::chainlink::ChainlinkFeeds;
use crate::risk::service::RiskService;

pub struct AppState {
    pub service: RiskService,
    pub feeds: Arc<ChainlinkFeeds>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/risk/wallet/{address}", get(handlers::wallet_risk))
        .route(
            "/api/v1/risk/wallet/{address}/transactions",
            get(handlers::wallet_transactions),
        )
        .route(
            "/api/v1/risk/wallet/{address}/history",
            get(handlers::wallet_history),
        )
        .route(
            "/api/v1/risk/asset/{contract}/{token_id}",
            get(handlers::asset_risk),
        )
        .route("/api/v1/risk/patterns", post(handlers::detect_patterns))
        .route("/api/v1/oracle/feeds", get(handlers::oracle_feeds))
        .route("/api/v1/oracle/prices", get(handlers::oracle_prices))
        .route("/api/v1/oracle/price/{asset}", get(handlers::oracle_price))
        .route("/api/v1/oracle/rwa", post(handlers::oracle_rwa_price))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    state: Arc<AppState>,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("API server stopped");
    Ok(())
}
