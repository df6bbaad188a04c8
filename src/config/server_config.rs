//! Server and scheduling configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Server environment configuration
#[derive(Debug, Clone)]
pub struct ServerEnvConfig {
    pub bind_address: String,
    pub tick_interval_secs: u64,

    // Collaborator call policy
    pub collaborator_timeout_secs: u64,
    pub max_fetch_retries: u32,
    pub retry_backoff_ms: u64,
}

impl ServerEnvConfig {
    pub fn from_env() -> Result<Self> {
        let tick_interval_secs = Self::parse_u64("TICK_INTERVAL_SECS", 60)?;
        if tick_interval_secs == 0 {
            anyhow::bail!("Invalid TICK_INTERVAL_SECS: must be positive");
        }
        let collaborator_timeout_secs = Self::parse_u64("COLLABORATOR_TIMEOUT_SECS", 30)?;
        if collaborator_timeout_secs == 0 {
            anyhow::bail!("Invalid COLLABORATOR_TIMEOUT_SECS: must be positive");
        }

        Ok(Self {
            bind_address: env::var("SERVER_BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            tick_interval_secs,
            collaborator_timeout_secs,
            max_fetch_retries: Self::parse_u32("MAX_FETCH_RETRIES", 2)?,
            retry_backoff_ms: Self::parse_u64("RETRY_BACKOFF_MS", 500)?,
        })
    }

    fn parse_u32(key: &str, default: u32) -> Result<u32> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<u32>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_u64(key: &str, default: u64) -> Result<u64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<u64>()
            .context(format!("Failed to parse {}", key))
    }
}
