use crate::domain::errors::{BrokerError, MarketDataError};
use crate::domain::ports::{ExecutionService, MarketDataService, Resolution};
use crate::domain::trading::types::{
    AccountSnapshot, Candle, OrderIntent, OrderSide, PositionSide, PositionSnapshot,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;

const SECONDS_PER_DAY: i64 = 86_400;

fn to_decimals(closes: &[f64]) -> Vec<Decimal> {
    closes
        .iter()
        .map(|c| Decimal::from_f64(*c).unwrap_or(Decimal::ZERO))
        .collect()
}

/// Scripted market data: a fixed close series per symbol, optional failure
/// injection, and a fetch counter per symbol.
#[derive(Clone, Default)]
pub struct MockMarketDataService {
    series: Arc<RwLock<HashMap<String, Vec<Decimal>>>>,
    failures: Arc<RwLock<HashMap<String, MarketDataError>>>,
    fetches: Arc<RwLock<HashMap<String, usize>>>,
    /// Served for symbols without a scripted series
    fallback: Option<Vec<Decimal>>,
}

impl MockMarketDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unscripted symbol gets `closes` instead of `NoData`.
    pub fn with_fallback(mut self, closes: &[f64]) -> Self {
        self.fallback = Some(to_decimals(closes));
        self
    }

    pub async fn set_closes(&self, symbol: &str, closes: &[f64]) {
        self.series
            .write()
            .await
            .insert(symbol.to_string(), to_decimals(closes));
    }

    /// Every fetch for `symbol` fails with `error` until cleared.
    pub async fn fail_symbol(&self, symbol: &str, error: MarketDataError) {
        self.failures.write().await.insert(symbol.to_string(), error);
    }

    pub async fn clear_failure(&self, symbol: &str) {
        self.failures.write().await.remove(symbol);
    }

    pub async fn fetch_count(&self, symbol: &str) -> usize {
        self.fetches.read().await.get(symbol).copied().unwrap_or(0)
    }
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn get_historical_bars(
        &self,
        symbol: &str,
        _resolution: Resolution,
        _from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        *self
            .fetches
            .write()
            .await
            .entry(symbol.to_string())
            .or_insert(0) += 1;

        if let Some(error) = self.failures.read().await.get(symbol) {
            return Err(error.clone().into());
        }

        let closes = match self.series.read().await.get(symbol) {
            Some(closes) => closes.clone(),
            None => self.fallback.clone().ok_or_else(|| MarketDataError::NoData {
                symbol: symbol.to_string(),
            })?,
        };

        // One candle per day, the last one at `to`
        let last_ts = to.timestamp();
        let count = closes.len() as i64;
        Ok(closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| Candle {
                symbol: symbol.to_string(),
                open: close,
                high: close,
                low: close,
                close,
                volume: Decimal::ONE_THOUSAND,
                timestamp: last_ts - (count - 1 - i as i64) * SECONDS_PER_DAY,
            })
            .collect())
    }
}

#[derive(Default)]
struct InjectedFailures {
    account: Option<BrokerError>,
    positions: Option<BrokerError>,
    orders: Option<BrokerError>,
}

/// In-memory brokerage. Orders fill immediately at the symbol's mark price
/// and are netted into positions.
#[derive(Clone)]
pub struct MockExecutionService {
    equity: Arc<RwLock<Decimal>>,
    positions: Arc<RwLock<Vec<PositionSnapshot>>>,
    marks: Arc<RwLock<HashMap<String, Decimal>>>,
    orders: Arc<RwLock<Vec<OrderIntent>>>,
    order_attempts: Arc<AtomicU64>,
    failures: Arc<RwLock<InjectedFailures>>,
    next_id: Arc<AtomicU64>,
}

impl MockExecutionService {
    pub fn new(equity: Decimal) -> Self {
        Self {
            equity: Arc::new(RwLock::new(equity)),
            positions: Arc::new(RwLock::new(Vec::new())),
            marks: Arc::new(RwLock::new(HashMap::new())),
            orders: Arc::new(RwLock::new(Vec::new())),
            order_attempts: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(RwLock::new(InjectedFailures::default())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn set_equity(&self, equity: Decimal) {
        *self.equity.write().await = equity;
    }

    /// Fill price used for `symbol` (zero when unset).
    pub async fn set_mark(&self, symbol: &str, price: Decimal) {
        self.marks.write().await.insert(symbol.to_string(), price);
    }

    /// Replace the brokerage's view of one symbol.
    pub async fn set_position(&self, position: PositionSnapshot) {
        let mut positions = self.positions.write().await;
        positions.retain(|p| p.symbol != position.symbol);
        positions.push(position);
    }

    pub async fn remove_position(&self, symbol: &str) {
        self.positions.write().await.retain(|p| p.symbol != symbol);
    }

    pub async fn fail_account(&self, error: BrokerError) {
        self.failures.write().await.account = Some(error);
    }

    pub async fn fail_positions(&self, error: BrokerError) {
        self.failures.write().await.positions = Some(error);
    }

    pub async fn fail_orders(&self, error: BrokerError) {
        self.failures.write().await.orders = Some(error);
    }

    /// Clear every injected failure.
    pub async fn recover(&self) {
        *self.failures.write().await = InjectedFailures::default();
    }

    /// Accepted orders, oldest first.
    pub async fn orders(&self) -> Vec<OrderIntent> {
        self.orders.read().await.clone()
    }

    /// Every `place_order` call, accepted or not.
    pub async fn order_attempts(&self) -> u64 {
        self.order_attempts.load(Ordering::SeqCst)
    }

    pub async fn positions(&self) -> Vec<PositionSnapshot> {
        self.positions.read().await.clone()
    }

    async fn apply_fill(&self, order: &OrderIntent) {
        let mark = self
            .marks
            .read()
            .await
            .get(&order.symbol)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let delta = match order.side {
            OrderSide::Buy => order.quantity,
            OrderSide::Sell => -order.quantity,
        };

        let mut positions = self.positions.write().await;
        let existing = positions.iter().position(|p| p.symbol == order.symbol);

        let (current, avg) = match existing.map(|i| &positions[i]) {
            Some(p) => (
                match p.side {
                    PositionSide::Long => p.qty,
                    PositionSide::Short => -p.qty,
                },
                p.avg_entry_price,
            ),
            None => (Decimal::ZERO, Decimal::ZERO),
        };

        let net = current + delta;
        if let Some(i) = existing {
            positions.remove(i);
        }
        if net.is_zero() {
            return;
        }

        let same_direction = current.is_sign_positive() == net.is_sign_positive();
        let avg_entry_price = if current.is_zero() || !same_direction {
            mark
        } else if net.abs() > current.abs() {
            (current.abs() * avg + delta.abs() * mark) / net.abs()
        } else {
            avg
        };

        positions.push(PositionSnapshot {
            symbol: order.symbol.clone(),
            qty: net.abs(),
            side: if net > Decimal::ZERO {
                PositionSide::Long
            } else {
                PositionSide::Short
            },
            avg_entry_price,
        });
    }
}

#[async_trait]
impl ExecutionService for MockExecutionService {
    async fn get_account(&self) -> Result<AccountSnapshot> {
        if let Some(error) = &self.failures.read().await.account {
            return Err(error.clone().into());
        }
        Ok(AccountSnapshot {
            equity: *self.equity.read().await,
        })
    }

    async fn list_positions(&self) -> Result<Vec<PositionSnapshot>> {
        if let Some(error) = &self.failures.read().await.positions {
            return Err(error.clone().into());
        }
        Ok(self.positions.read().await.clone())
    }

    async fn place_order(&self, order: OrderIntent) -> Result<String> {
        self.order_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = &self.failures.read().await.orders {
            return Err(error.clone().into());
        }

        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        info!(
            "MockExecution: {} {} {} accepted as {}",
            order.side, order.quantity, order.symbol, id
        );

        self.apply_fill(&order).await;
        self.orders.write().await.push(order);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_scripted_series_and_failures() {
        let market = MockMarketDataService::new();
        market.set_closes("AAPL", &[1.0, 2.0, 3.0]).await;
        let now = Utc::now();

        let candles = market
            .get_historical_bars("AAPL", Resolution::Daily, now, now)
            .await
            .unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[2].close, dec!(3));
        assert_eq!(candles[2].timestamp, now.timestamp());
        assert_eq!(candles[0].timestamp, now.timestamp() - 2 * SECONDS_PER_DAY);

        let missing = market
            .get_historical_bars("MSFT", Resolution::Daily, now, now)
            .await
            .unwrap_err();
        assert!(missing.downcast_ref::<MarketDataError>().is_some());

        market
            .fail_symbol(
                "AAPL",
                MarketDataError::ConnectionLost {
                    reason: "down".to_string(),
                },
            )
            .await;
        assert!(market
            .get_historical_bars("AAPL", Resolution::Daily, now, now)
            .await
            .is_err());
        assert_eq!(market.fetch_count("AAPL").await, 2);
    }

    #[tokio::test]
    async fn test_fallback_series() {
        let market = MockMarketDataService::new().with_fallback(&[5.0, 6.0]);
        let now = Utc::now();
        let candles = market
            .get_historical_bars("ANY", Resolution::Daily, now, now)
            .await
            .unwrap();
        assert_eq!(candles.len(), 2);
    }

    #[tokio::test]
    async fn test_orders_net_into_positions() {
        let broker = MockExecutionService::new(dec!(10000));
        broker.set_mark("AAPL", dec!(100)).await;

        broker
            .place_order(OrderIntent::market("AAPL", OrderSide::Buy, dec!(10)))
            .await
            .unwrap();
        broker.set_mark("AAPL", dec!(110)).await;
        broker
            .place_order(OrderIntent::market("AAPL", OrderSide::Buy, dec!(10)))
            .await
            .unwrap();

        let positions = broker.list_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].qty, dec!(20));
        assert_eq!(positions[0].side, PositionSide::Long);
        assert_eq!(positions[0].avg_entry_price, dec!(105));

        broker
            .place_order(OrderIntent::market("AAPL", OrderSide::Sell, dec!(20)))
            .await
            .unwrap();
        assert!(broker.list_positions().await.unwrap().is_empty());
        assert_eq!(broker.orders().await.len(), 3);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let broker = MockExecutionService::new(dec!(10000));
        broker.fail_account(BrokerError::Unauthorized).await;
        broker.fail_orders(BrokerError::RateLimited).await;

        assert!(broker.get_account().await.is_err());
        assert!(broker
            .place_order(OrderIntent::market("AAPL", OrderSide::Buy, dec!(1)))
            .await
            .is_err());
        assert_eq!(broker.order_attempts().await, 1);
        assert!(broker.orders().await.is_empty());

        broker.recover().await;
        assert_eq!(broker.get_account().await.unwrap().equity, dec!(10000));
    }
}
