//! Configuration module for Vanguard.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by domain: Server, Broker, Strategy, and Risk.

mod broker_config;
mod risk_env_config;
mod server_config;
mod strategy_config;

pub use broker_config::{AlpacaConfig, BrokerEnvConfig, FinnhubConfig};
pub use risk_env_config::RiskEnvConfig;
pub use server_config::ServerEnvConfig;
pub use strategy_config::StrategyEnvConfig;

use crate::application::agents::AgentSettings;
use crate::application::strategies::{CrossoverRsiConfig, CrossoverRsiStrategy};
use crate::application::trading::{CallPolicy, TradeSettings};
use crate::domain::ports::Resolution;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// In-memory collaborators, no credentials needed
    Mock,
    /// Alpaca brokerage with Finnhub candles
    Alpaca,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "alpaca" => Ok(Mode::Alpaca),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'alpaca'", s),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub server: ServerEnvConfig,
    pub broker: BrokerEnvConfig,
    pub strategy: StrategyEnvConfig,
    pub risk: RiskEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("MODE").unwrap_or_else(|_| "mock".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let server = ServerEnvConfig::from_env().context("Failed to load server config")?;
        let broker = BrokerEnvConfig::from_env();
        let strategy = StrategyEnvConfig::from_env().context("Failed to load strategy config")?;
        let risk = RiskEnvConfig::from_env().context("Failed to load risk config")?;

        if mode == Mode::Alpaca {
            broker.require_credentials()?;
        }

        let config = Self {
            mode,
            server,
            broker,
            strategy,
            risk,
        };
        // Fail at boot rather than on the first `start`.
        config.build_strategy()?;
        Ok(config)
    }

    pub fn strategy_config(&self) -> CrossoverRsiConfig {
        CrossoverRsiConfig {
            short_window: self.strategy.fast_sma_period,
            long_window: self.strategy.slow_sma_period,
            rsi_window: self.strategy.rsi_period,
            rsi_overbought: self.strategy.rsi_overbought,
            rsi_oversold: self.strategy.rsi_oversold,
        }
    }

    pub fn build_strategy(&self) -> Result<CrossoverRsiStrategy> {
        CrossoverRsiStrategy::new(self.strategy_config()).context("Invalid strategy config")
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(self.server.collaborator_timeout_secs),
            max_retries: self.server.max_fetch_retries,
            base_backoff: Duration::from_millis(self.server.retry_backoff_ms),
        }
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.server.collaborator_timeout_secs)
    }

    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            tick_interval: Duration::from_secs(self.server.tick_interval_secs),
            initial_balance: self.risk.initial_balance,
            daily_risk_limit: self.risk.daily_risk_limit_pct,
            trade: TradeSettings {
                lookback_days: self.strategy.lookback_days,
                resolution: Resolution::Daily,
                stop_loss_pct: self.risk.stop_loss_pct,
                call_policy: self.call_policy(),
            },
        }
    }
}
