use super::indicators::{rsi, sma_tail};
use super::traits::TradingStrategy;
use crate::domain::trading::types::Signal;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum StrategyConfigError {
    #[error("Short window ({short}) must be positive and below long window ({long})")]
    InvalidWindows { short: usize, long: usize },

    #[error("RSI window must be positive")]
    InvalidRsiWindow,

    #[error("RSI oversold ({oversold}) must be below overbought ({overbought})")]
    InvalidRsiBands { overbought: f64, oversold: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossoverRsiConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_window: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for CrossoverRsiConfig {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
            rsi_window: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        }
    }
}

/// Moving-average crossover confirmed by an RSI filter.
///
/// Buy on a bullish crossover (short SMA moves from at-or-below to strictly
/// above the long SMA) while RSI is below the overbought band. Sell on the
/// mirrored bearish crossover while RSI is above the oversold band.
/// Stateless: only the last two points of each average are consulted.
#[derive(Debug, Clone)]
pub struct CrossoverRsiStrategy {
    config: CrossoverRsiConfig,
}

impl CrossoverRsiStrategy {
    pub fn new(config: CrossoverRsiConfig) -> Result<Self, StrategyConfigError> {
        if config.short_window == 0 || config.short_window >= config.long_window {
            return Err(StrategyConfigError::InvalidWindows {
                short: config.short_window,
                long: config.long_window,
            });
        }
        if config.rsi_window == 0 {
            return Err(StrategyConfigError::InvalidRsiWindow);
        }
        if !(config.rsi_oversold < config.rsi_overbought) {
            return Err(StrategyConfigError::InvalidRsiBands {
                overbought: config.rsi_overbought,
                oversold: config.rsi_oversold,
            });
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &CrossoverRsiConfig {
        &self.config
    }
}

impl Default for CrossoverRsiStrategy {
    fn default() -> Self {
        Self {
            config: CrossoverRsiConfig::default(),
        }
    }
}

impl TradingStrategy for CrossoverRsiStrategy {
    fn generate_signal(&self, closes: &[f64]) -> Signal {
        let cfg = &self.config;

        if closes.len() < cfg.long_window {
            debug!(
                "CrossoverRsi: Not enough data to generate a signal ({} < {})",
                closes.len(),
                cfg.long_window
            );
            return Signal::Hold;
        }

        let (Some((prev_short, short)), Some((prev_long, long)), Some(rsi)) = (
            sma_tail(closes, cfg.short_window),
            sma_tail(closes, cfg.long_window),
            rsi(closes, cfg.rsi_window),
        ) else {
            // A crossover needs two full long-window averages
            debug!(
                "CrossoverRsi: {} points cannot cover two long windows",
                closes.len()
            );
            return Signal::Hold;
        };

        let bullish = prev_short <= prev_long && short > long;
        if bullish && rsi < cfg.rsi_overbought {
            info!(
                "CrossoverRsi: BUY signal, bullish crossover and RSI ({:.2}) below {:.2}",
                rsi, cfg.rsi_overbought
            );
            return Signal::Buy;
        }

        let bearish = prev_short >= prev_long && short < long;
        if bearish && rsi > cfg.rsi_oversold {
            info!(
                "CrossoverRsi: SELL signal, bearish crossover and RSI ({:.2}) above {:.2}",
                rsi, cfg.rsi_oversold
            );
            return Signal::Sell;
        }

        Signal::Hold
    }

    fn name(&self) -> &str {
        "CrossoverRsi"
    }
}
