use thiserror::Error;

/// Failures surfaced by the risk service to its callers.
///
/// Scoring itself is pure arithmetic over validated inputs, so the only ways
/// an assessment can fail are bad input or a missing upstream dataset.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Malformed address, token id, or request parameter. Raised before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An upstream lookup failed or timed out. No partial score is produced.
    #[error("{source_name} unavailable: {reason}")]
    DataUnavailable {
        source_name: &'static str,
        reason: String,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl RiskError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unavailable(source_name: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::DataUnavailable {
            source_name,
            reason: reason.to_string(),
        }
    }
}

pub type RiskResult<T> = Result<T, RiskError>;
