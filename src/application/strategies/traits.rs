use crate::domain::trading::types::Signal;

/// A stateless signal generator over a close-price series (oldest first).
pub trait TradingStrategy: Send + Sync {
    fn generate_signal(&self, closes: &[f64]) -> Signal;

    fn name(&self) -> &str;
}
