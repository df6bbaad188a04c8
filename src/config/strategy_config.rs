//! Strategy configuration parsing from environment variables.
//!
//! Indicator windows and RSI bands of the crossover strategy, plus the
//! history window fetched each tick.

use anyhow::{Context, Result};
use std::env;

/// Strategy environment configuration
#[derive(Debug, Clone)]
pub struct StrategyEnvConfig {
    // SMA crossover
    pub fast_sma_period: usize,
    pub slow_sma_period: usize,

    // RSI filter
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,

    /// Calendar days of daily candles fetched per symbol
    pub lookback_days: i64,
}

impl StrategyEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            fast_sma_period: Self::parse_usize("FAST_SMA_PERIOD", 20)?,
            slow_sma_period: Self::parse_usize("SLOW_SMA_PERIOD", 50)?,
            rsi_period: Self::parse_usize("RSI_PERIOD", 14)?,
            rsi_overbought: Self::parse_f64("RSI_OVERBOUGHT", 70.0)?,
            rsi_oversold: Self::parse_f64("RSI_OVERSOLD", 30.0)?,
            lookback_days: Self::parse_i64("LOOKBACK_DAYS", 30)?,
        })
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_i64(key: &str, default: i64) -> Result<i64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<i64>()
            .context(format!("Failed to parse {}", key))
    }
}
