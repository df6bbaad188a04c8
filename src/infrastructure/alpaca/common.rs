use crate::domain::errors::BrokerError;
use reqwest::StatusCode;
use serde::Deserialize;

pub const KEY_HEADER: &str = "APCA-API-KEY-ID";
pub const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

/// Body Alpaca sends with most 4xx responses.
#[derive(Debug, Deserialize)]
struct AlpacaErrorBody {
    #[serde(default)]
    message: String,
}

fn reason(body: &str) -> String {
    serde_json::from_str::<AlpacaErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

/// Map a non-success Alpaca response onto the brokerage error taxonomy.
pub fn error_for_status(status: StatusCode, body: &str) -> BrokerError {
    match status.as_u16() {
        401 | 403 => BrokerError::Unauthorized,
        429 => BrokerError::RateLimited,
        500..=599 => BrokerError::Unavailable {
            reason: format!("HTTP {}: {}", status.as_u16(), reason(body)),
        },
        _ => BrokerError::Rejected {
            reason: format!("HTTP {}: {}", status.as_u16(), reason(body)),
        },
    }
}
