use serde::Serialize;
use thiserror::Error;

/// Errors related to market data retrieval
#[derive(Debug, Clone, Error)]
pub enum MarketDataError {
    #[error("No data returned for {symbol}")]
    NoData { symbol: String },

    #[error("Invalid market data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Rate limit exceeded: retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Market data provider rejected credentials")]
    Unauthorized,
}

/// Errors related to brokerage calls (account, positions, orders)
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("Order rejected: {reason}")]
    Rejected { reason: String },

    #[error("Brokerage rejected credentials")]
    Unauthorized,

    #[error("Brokerage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Brokerage rate limit exceeded")]
    RateLimited,
}

/// A collaborator call that did not answer within its time budget.
#[derive(Debug, Clone, Error)]
#[error("{label} timed out after {duration_ms}ms")]
pub struct CallTimeout {
    pub label: String,
    pub duration_ms: u64,
}

/// Whether a failed collaborator call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Transient,
    Fatal,
}

impl FailureKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::Transient)
    }
}

/// Classify a collaborator error. Unknown errors (transport, decoding of a
/// truncated body) are treated as transient.
pub fn classify(err: &anyhow::Error) -> FailureKind {
    if err.downcast_ref::<CallTimeout>().is_some() {
        return FailureKind::Transient;
    }

    if let Some(e) = err.downcast_ref::<MarketDataError>() {
        return match e {
            MarketDataError::NoData { .. }
            | MarketDataError::InvalidData { .. }
            | MarketDataError::Unauthorized => FailureKind::Fatal,
            MarketDataError::ConnectionLost { .. }
            | MarketDataError::RateLimitExceeded { .. } => FailureKind::Transient,
        };
    }

    if let Some(e) = err.downcast_ref::<BrokerError>() {
        return match e {
            BrokerError::Rejected { .. } | BrokerError::Unauthorized => FailureKind::Fatal,
            BrokerError::Unavailable { .. } | BrokerError::RateLimited => FailureKind::Transient,
        };
    }

    FailureKind::Transient
}
