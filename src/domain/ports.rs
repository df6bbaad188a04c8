use crate::domain::trading::types::{AccountSnapshot, Candle, OrderIntent, PositionSnapshot};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Candle resolution understood by market data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Daily,
}

impl Resolution {
    /// Provider code (Finnhub style).
    pub fn as_code(&self) -> &'static str {
        match self {
            Resolution::Daily => "D",
        }
    }
}

#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Historical candles for `symbol` in `[from, to]`, oldest first.
    async fn get_historical_bars(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;
}

#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn get_account(&self) -> Result<AccountSnapshot>;
    async fn list_positions(&self) -> Result<Vec<PositionSnapshot>>;
    /// Submit an order, returning the brokerage order id.
    async fn place_order(&self, order: OrderIntent) -> Result<String>;
}
