use crate::config::{Config, Mode};
use crate::domain::ports::{ExecutionService, MarketDataService};
use crate::infrastructure::alpaca::AlpacaExecutionService;
use crate::infrastructure::finnhub::FinnhubMarketDataService;
use crate::infrastructure::mock::{MockExecutionService, MockMarketDataService};
use std::sync::Arc;
use tracing::info;

pub struct ServiceFactory;

impl ServiceFactory {
    pub fn create_services(
        config: &Config,
    ) -> (Arc<dyn MarketDataService>, Arc<dyn ExecutionService>) {
        match config.mode {
            Mode::Mock => {
                info!("ServiceFactory: using in-memory market data and execution");
                (
                    Arc::new(MockMarketDataService::new().with_fallback(&demo_closes())),
                    Arc::new(MockExecutionService::new(config.risk.initial_balance)),
                )
            }
            Mode::Alpaca => {
                info!(
                    "ServiceFactory: using Finnhub candles ({}) and Alpaca execution ({})",
                    config.broker.finnhub.base_url, config.broker.alpaca.base_url
                );
                let timeout = config.collaborator_timeout();

                let market_service = FinnhubMarketDataService::new(
                    config.broker.finnhub.api_key.clone(),
                    config.broker.finnhub.base_url.clone(),
                    timeout,
                );
                let execution_service = AlpacaExecutionService::new(
                    config.broker.alpaca.api_key.clone(),
                    config.broker.alpaca.secret_key.clone(),
                    config.broker.alpaca.base_url.clone(),
                    timeout,
                );

                (Arc::new(market_service), Arc::new(execution_service))
            }
        }
    }
}

/// Flat, a decline, then a saw-tooth recovery that ends on a bullish
/// SMA(20)/SMA(50) crossover with a moderate RSI(14).
fn demo_closes() -> Vec<f64> {
    let mut closes = vec![100.0; 30];
    closes.extend((1..=20).map(|i| 100.0 - i as f64));
    let mut last = 80.0;
    for k in 0..27 {
        last += if k % 2 == 0 { 3.0 } else { -2.0 };
        closes.push(last);
    }
    closes
}
