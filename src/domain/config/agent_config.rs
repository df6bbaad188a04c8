//! Agent Configuration Domain Value Object
//!
//! The configuration an operator sends with a `start` command. It is
//! validated once when decoded and then bound, immutable, to one agent.
//!
//! # Invariants
//!
//! - At least one symbol, none blank (duplicates are allowed)
//! - `risk_per_trade` is a percentage in (0, 100]
//! - `risk_reward_ratio` is strictly positive
//! - `time_based_exit` is minutes, 0 disables the exit rule

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error type for AgentConfig validation
#[derive(Debug, Error, PartialEq)]
pub enum AgentConfigError {
    #[error("At least one symbol is required")]
    NoSymbols,

    #[error("Symbol at position {index} is blank")]
    BlankSymbol { index: usize },

    #[error("Invalid riskPerTrade: {value}. Must be within (0, 100]")]
    InvalidRiskPerTrade { value: f64 },

    #[error("Invalid riskRewardRatio: {value}. Must be positive")]
    InvalidRiskRewardRatio { value: f64 },

    #[error("Invalid timeBasedExit: {value}. Must be a non-negative number of minutes")]
    InvalidTimeBasedExit { value: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(alias = "Symbols")]
    pub symbols: Vec<String>,

    /// Percent of equity risked per trade (1.0 = 1%)
    #[serde(alias = "RiskPerTrade")]
    pub risk_per_trade: f64,

    #[serde(alias = "RiskRewardRatio")]
    pub risk_reward_ratio: f64,

    /// Minutes after which an entry is closed (0 = never)
    #[serde(default, alias = "TimeBasedExit")]
    pub time_based_exit: i64,
}

impl AgentConfig {
    /// Create a new AgentConfig with validation
    pub fn new(
        symbols: Vec<String>,
        risk_per_trade: f64,
        risk_reward_ratio: f64,
        time_based_exit: i64,
    ) -> Result<Self, AgentConfigError> {
        let config = Self {
            symbols,
            risk_per_trade,
            risk_reward_ratio,
            time_based_exit,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AgentConfigError> {
        if self.symbols.is_empty() {
            return Err(AgentConfigError::NoSymbols);
        }

        if let Some(index) = self.symbols.iter().position(|s| s.trim().is_empty()) {
            return Err(AgentConfigError::BlankSymbol { index });
        }

        // NaN fails both comparisons
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 100.0) {
            return Err(AgentConfigError::InvalidRiskPerTrade {
                value: self.risk_per_trade,
            });
        }

        if !(self.risk_reward_ratio > 0.0 && self.risk_reward_ratio.is_finite()) {
            return Err(AgentConfigError::InvalidRiskRewardRatio {
                value: self.risk_reward_ratio,
            });
        }

        if self.time_based_exit < 0 || self.time_based_exit.checked_mul(60).is_none() {
            return Err(AgentConfigError::InvalidTimeBasedExit {
                value: self.time_based_exit,
            });
        }

        Ok(())
    }

    /// Risk per trade as a fraction of equity, in (0, 1]
    pub fn risk_fraction(&self) -> Decimal {
        Decimal::try_from(self.risk_per_trade / 100.0).unwrap_or(Decimal::ZERO)
    }

    pub fn reward_ratio(&self) -> Decimal {
        Decimal::try_from(self.risk_reward_ratio).unwrap_or(Decimal::ZERO)
    }

    pub fn time_exit(&self) -> Option<Duration> {
        if self.time_based_exit > 0 {
            Some(Duration::from_secs(
                (self.time_based_exit as u64).saturating_mul(60),
            ))
        } else {
            None
        }
    }
}
