//! Collaborator configuration parsing from environment variables.
//!
//! - Alpaca (brokerage: account, positions, orders)
//! - Finnhub (historical candles)

use anyhow::Result;
use std::env;

/// Alpaca API configuration
#[derive(Debug, Clone, Default)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
}

impl AlpacaConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("ALPACA_API_KEY_ID").unwrap_or_default(),
            secret_key: env::var("ALPACA_API_SECRET_KEY").unwrap_or_default(),
            base_url: env::var("ALPACA_BASE_URL")
                .unwrap_or_else(|_| "https://paper-api.alpaca.markets".to_string()),
        }
    }
}

/// Finnhub API configuration
#[derive(Debug, Clone, Default)]
pub struct FinnhubConfig {
    pub api_key: String,
    pub base_url: String,
}

impl FinnhubConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("FINNHUB_API_KEY").unwrap_or_default(),
            base_url: env::var("FINNHUB_BASE_URL")
                .unwrap_or_else(|_| "https://finnhub.io/api/v1".to_string()),
        }
    }
}

/// Aggregated collaborator configuration
#[derive(Debug, Clone, Default)]
pub struct BrokerEnvConfig {
    pub alpaca: AlpacaConfig,
    pub finnhub: FinnhubConfig,
}

impl BrokerEnvConfig {
    pub fn from_env() -> Self {
        Self {
            alpaca: AlpacaConfig::from_env(),
            finnhub: FinnhubConfig::from_env(),
        }
    }

    /// Live mode needs every credential up front.
    pub fn require_credentials(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("ALPACA_API_KEY_ID", &self.alpaca.api_key),
            ("ALPACA_API_SECRET_KEY", &self.alpaca.secret_key),
            ("FINNHUB_API_KEY", &self.finnhub.api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            anyhow::bail!("Missing credentials: {}", missing.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        assert!(AlpacaConfig::from_env().base_url.contains("alpaca.markets"));
        assert!(FinnhubConfig::from_env().base_url.contains("finnhub.io"));
    }

    #[test]
    fn test_missing_credentials_listed() {
        let config = BrokerEnvConfig {
            alpaca: AlpacaConfig {
                api_key: "key".to_string(),
                ..Default::default()
            },
            finnhub: FinnhubConfig::default(),
        };

        let err = config.require_credentials().unwrap_err().to_string();
        assert!(err.contains("ALPACA_API_SECRET_KEY"));
        assert!(err.contains("FINNHUB_API_KEY"));
        assert!(!err.contains("ALPACA_API_KEY_ID"));
    }
}
