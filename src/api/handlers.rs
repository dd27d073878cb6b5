use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::repository::{self, StoredAssessment};
use crate::error::RiskError;
use crate::oracle::rwa::rwa_price;
use crate::oracle::{PriceFeedData, PriceOracle};
use crate::risk::types::{parse_address, RiskAnalysis, TransactionAnalysis};

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

fn risk_error(e: RiskError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        RiskError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RiskError::DataUnavailable { .. } => StatusCode::BAD_GATEWAY,
        RiskError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        persistence: state.service.persistence_enabled(),
    }))
}

// ============================================================
// Wallet
// ============================================================

pub async fn wallet_risk(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<BlockRangeParams>,
) -> ApiResult<RiskAnalysis> {
    state
        .service
        .generate_risk_assessment(&address, params.block_range)
        .await
    .map(Json)
    .map_err(risk_error)
}

pub async fn wallet_transactions(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<BlockRangeParams>,
) -> ApiResult<TransactionAnalysis> {
    state
        .service
        .analyze_wallet_transactions(&address, params.block_range)
        .await
    .map(Json)
    .map_err(risk_error)
}

pub async fn wallet_history(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Vec<StoredAssessment>> {
    let address = parse_address(&address).map_err(risk_error)?;
    let Some(pool) = state.service.pool() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "assessment history requires a database",
        ));
    };
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    repository::get_wallet_history(pool, address, limit)
        .await
        .map(Json)
        .map_err(|e| risk_error(RiskError::Storage(e.to_string())))
}

// ============================================================
// Assets & Patterns
// ============================================================

pub async fn asset_risk(
    State(state): State<Arc<AppState>>,
    Path((contract, token_id)): Path<(String, String)>,
) -> ApiResult<RiskAnalysis> {
    state
        .service
        .analyze_asset_risk(&contract, &token_id)
        .await
    .map(Json)
    .map_err(risk_error)
}

pub async fn detect_patterns(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PatternRequest>,
) -> ApiResult<PatternResponse> {
    let records = body
        .transactions
        .into_iter()
        .map(TransactionInput::into_record)
        .collect::<Result<Vec<_>, _>>()
        .map_err(risk_error)?;

    Ok(Json(PatternResponse {
        patterns: state.service.detect_fraud_patterns(&records),
    }))
}

// ============================================================
// Oracle
// ============================================================

pub async fn oracle_price(
    State(state): State<Arc<AppState>>,
    Path(asset): Path<String>,
) -> ApiResult<PriceFeedData> {
    match state.feeds.price(&asset).await {
        Ok(Some(price)) => Ok(Json(price)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("no price feed configured for {}", asset),
        )),
        Err(e) => Err(api_error(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

pub async fn oracle_prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AssetsParams>,
) -> ApiResult<BTreeMap<String, Option<PriceFeedData>>> {
    let assets: Vec<String> = params
        .assets
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if assets.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "no assets requested"));
    }
    Ok(Json(state.feeds.batch_prices(&assets).await))
}

pub async fn oracle_feeds(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    Ok(Json(state.feeds.supported_assets()))
}

pub async fn oracle_rwa_price(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RwaPriceRequest>,
) -> ApiResult<PriceFeedData> {
    rwa_price(
        state.feeds.as_ref(),
        body.category,
        body.specifications,
        body.location,
        Utc::now(),
    )
    .await
    .map(Json)
    .map_err(risk_error)
}
