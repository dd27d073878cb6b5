use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::risk::types::{AssetId, FraudPattern, RiskAnalysis};

/// What an assessment was computed for.
#[derive(Debug, Clone, Copy)]
pub enum AssessmentSubject<'a> {
    Wallet(Address),
    Asset(&'a AssetId),
}

impl AssessmentSubject<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Wallet(_) => "wallet",
            Self::Asset(_) => "asset",
        }
    }

    fn address(&self) -> &[u8] {
        match self {
            Self::Wallet(address) => address.as_slice(),
            Self::Asset(asset) => asset.contract.as_slice(),
        }
    }

    fn token_id(&self) -> Option<String> {
        match self {
            Self::Wallet(_) => None,
            Self::Asset(asset) => Some(asset.token_id.to_string()),
        }
    }
}

/// A persisted assessment as returned by history queries.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAssessment {
    pub id: i64,
    pub subject_kind: String,
    pub address: String,
    pub token_id: Option<String>,
    pub risk_score: i32,
    pub risk_level: String,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub patterns: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

type AssessmentRow = (
    i64,
    String,
    Vec<u8>,
    Option<String>,
    i32,
    String,
    f64,
    Vec<String>,
    Vec<String>,
    Vec<String>,
    DateTime<Utc>,
);

/// Insert one assessment. Returns the new row id.
pub async fn insert_assessment(
    pool: &PgPool,
    subject: AssessmentSubject<'_>,
    analysis: &RiskAnalysis,
    patterns: &[FraudPattern],
) -> eyre::Result<i64> {
    let patterns: Vec<String> = patterns.iter().map(|p| p.as_str().to_string()).collect();

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO risk_assessments (subject_kind, address, token_id, risk_score, risk_level,
             confidence, factors, recommendations, patterns, analyzed_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING id",
    )
    .bind(subject.kind())
    .bind(subject.address())
    .bind(subject.token_id())
    .bind(analysis.risk_score as i32)
    .bind(analysis.risk_level.as_str())
    .bind(analysis.confidence)
    .bind(&analysis.factors)
    .bind(&analysis.recommendations)
    .bind(&patterns)
    .bind(analysis.last_analyzed)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Most recent wallet assessments for an address, newest first.
pub async fn get_wallet_history(
    pool: &PgPool,
    address: Address,
    limit: i64,
) -> eyre::Result<Vec<StoredAssessment>> {
    let rows: Vec<AssessmentRow> = sqlx::query_as(
        "SELECT id, subject_kind, address, token_id, risk_score, risk_level, confidence,
                factors, recommendations, patterns, analyzed_at
         FROM risk_assessments
         WHERE subject_kind = 'wallet' AND address = $1
         ORDER BY analyzed_at DESC, id DESC
         LIMIT $2",
    )
    .bind(address.as_slice())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_assessment).collect())
}

fn row_to_assessment(row: AssessmentRow) -> StoredAssessment {
    let (
        id,
        subject_kind,
        address,
        token_id,
        risk_score,
        risk_level,
        confidence,
        factors,
        recommendations,
        patterns,
        analyzed_at,
    ) = row;
    StoredAssessment {
        id,
        subject_kind,
        address: bytes_to_hex(&address),
        token_id,
        risk_score,
        risk_level,
        confidence,
        factors,
        recommendations,
        patterns,
        analyzed_at,
    }
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
