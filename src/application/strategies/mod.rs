mod crossover_rsi;
pub mod indicators;
mod traits;

pub use crossover_rsi::{CrossoverRsiConfig, CrossoverRsiStrategy, StrategyConfigError};
pub use traits::TradingStrategy;
