//! Risk configuration parsing from environment variables.
//!
//! Stop distance, the equity assumed before the first account refresh, and
//! the daily loss limit. Per-trade risk comes from the operator's `start`
//! command, not from here.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Risk environment configuration
#[derive(Debug, Clone)]
pub struct RiskEnvConfig {
    /// Stop distance as a fraction of the entry price
    pub stop_loss_pct: Decimal,
    pub initial_balance: Decimal,
    /// Fraction of the day's starting equity that may be lost
    pub daily_risk_limit_pct: Decimal,
}

impl RiskEnvConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            stop_loss_pct: Self::parse_decimal("STOP_LOSS_PCT", "0.02")?,
            initial_balance: Self::parse_decimal("INITIAL_BALANCE", "10000")?,
            daily_risk_limit_pct: Self::parse_decimal("DAILY_RISK_LIMIT_PCT", "0.05")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE {
            anyhow::bail!(
                "Invalid STOP_LOSS_PCT: {}. Must be within (0, 1)",
                self.stop_loss_pct
            );
        }
        if self.initial_balance <= Decimal::ZERO {
            anyhow::bail!(
                "Invalid INITIAL_BALANCE: {}. Must be positive",
                self.initial_balance
            );
        }
        if self.daily_risk_limit_pct <= Decimal::ZERO || self.daily_risk_limit_pct > Decimal::ONE {
            anyhow::bail!(
                "Invalid DAILY_RISK_LIMIT_PCT: {}. Must be within (0, 1]",
                self.daily_risk_limit_pct
            );
        }
        Ok(())
    }

    fn parse_decimal(key: &str, default: &str) -> Result<Decimal> {
        let raw = env::var(key).unwrap_or_else(|_| default.to_string());
        Decimal::from_str(raw.trim()).context(format!("Failed to parse {}", key))
    }
}
