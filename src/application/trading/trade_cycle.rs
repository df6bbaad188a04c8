use crate::application::agents::event_sink::EventSink;
use crate::application::risk_management::SizingEngine;
use crate::application::strategies::TradingStrategy;
use crate::application::trading::guarded_call::{CallPolicy, guarded};
use crate::domain::events::{ErrorCategory, ErrorReport};
use crate::domain::ports::{ExecutionService, MarketDataService, Resolution};
use crate::domain::risk::state::AccountState;
use crate::domain::trading::types::OrderIntent;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::debug;

/// Knobs of the per-symbol cycle that are not part of the operator config.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSettings {
    /// Calendar days of history fetched each tick
    pub lookback_days: i64,
    pub resolution: Resolution,
    /// Stop distance as a fraction of the entry price
    pub stop_loss_pct: Decimal,
    pub call_policy: CallPolicy,
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            resolution: Resolution::Daily,
            stop_loss_pct: dec!(0.02),
            call_policy: CallPolicy::default(),
        }
    }
}

/// What happened to one symbol in one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    /// Price history could not be fetched
    Skipped,
    Hold,
    /// Signal fired but sizing produced zero
    NoSize,
    Ordered { order_id: String, intent: OrderIntent },
    OrderFailed,
}

impl SymbolOutcome {
    pub fn is_ordered(&self) -> bool {
        matches!(self, SymbolOutcome::Ordered { .. })
    }
}

/// Fetch, evaluate, size and submit for a single symbol.
pub struct TradeCycle {
    market_data: Arc<dyn MarketDataService>,
    execution: Arc<dyn ExecutionService>,
    strategy: Arc<dyn TradingStrategy>,
    settings: TradeSettings,
    reward_ratio: Decimal,
    events: EventSink,
}

impl TradeCycle {
    pub fn new(
        market_data: Arc<dyn MarketDataService>,
        execution: Arc<dyn ExecutionService>,
        strategy: Arc<dyn TradingStrategy>,
        settings: TradeSettings,
        reward_ratio: Decimal,
        events: EventSink,
    ) -> Self {
        Self {
            market_data,
            execution,
            strategy,
            settings,
            reward_ratio,
            events,
        }
    }

    pub fn settings(&self) -> &TradeSettings {
        &self.settings
    }

    /// Every failure is reported and absorbed; the caller moves on to the
    /// next symbol whatever the outcome.
    pub async fn process_symbol(&self, symbol: &str, account: &AccountState) -> SymbolOutcome {
        let to = Utc::now();
        let from = to - chrono::Duration::days(self.settings.lookback_days);
        let label = format!("TradeCycle: fetch {}", symbol);

        let candles = match guarded(&self.settings.call_policy, &label, || {
            self.market_data
                .get_historical_bars(symbol, self.settings.resolution, from, to)
        })
        .await
        {
            Ok(candles) => candles,
            Err(failure) => {
                self.events.report(
                    ErrorReport::new(ErrorCategory::DataFetch, failure.kind, failure.to_string())
                        .for_symbol(symbol),
                );
                return SymbolOutcome::Skipped;
            }
        };

        let closes: Vec<f64> = candles.iter().filter_map(|c| c.close.to_f64()).collect();
        let signal = self.strategy.generate_signal(&closes);

        let (Some(side), Some(last)) = (signal.side(), candles.last()) else {
            debug!(
                "TradeCycle: {} -> {} over {} closes ({})",
                symbol,
                signal,
                closes.len(),
                self.strategy.name()
            );
            return SymbolOutcome::Hold;
        };

        let entry_price = last.close;
        let stop_loss = SizingEngine::determine_stop_loss(entry_price, side, self.settings.stop_loss_pct);
        let quantity = SizingEngine::calculate_position_size(
            entry_price,
            stop_loss,
            account.equity,
            account.risk_per_trade,
        );

        if quantity <= Decimal::ZERO {
            self.events.info(format!(
                "{} signal for {} at {} sized to zero, not trading",
                signal, symbol, entry_price
            ));
            return SymbolOutcome::NoSize;
        }

        let take_profit = SizingEngine::determine_take_profit(entry_price, stop_loss, self.reward_ratio);
        let intent = OrderIntent::market(symbol, side, quantity).with_exits(stop_loss, take_profit);

        self.events.info(format!(
            "{} signal for {} at {}: {} units, stop {}, target {}",
            signal,
            symbol,
            entry_price,
            quantity,
            stop_loss,
            take_profit.map_or_else(|| "none".to_string(), |tp| tp.to_string())
        ));

        let policy = self.settings.call_policy.single_attempt();
        let label = format!("TradeCycle: order {}", symbol);
        match guarded(&policy, &label, || self.execution.place_order(intent.clone())).await {
            Ok(order_id) => {
                self.events.info(format!(
                    "Placed {} order for {} of {}. Order ID: {}",
                    side, quantity, symbol, order_id
                ));
                SymbolOutcome::Ordered { order_id, intent }
            }
            Err(failure) => {
                self.events.report(
                    ErrorReport::new(ErrorCategory::OrderPlacement, failure.kind, failure.to_string())
                        .for_symbol(symbol),
                );
                SymbolOutcome::OrderFailed
            }
        }
    }
}
