use super::event_sink::EventSink;
use super::position_tracker::{ExitAction, PositionTracker};
use crate::application::strategies::TradingStrategy;
use crate::application::trading::guarded_call::{CallPolicy, guarded};
use crate::application::trading::trade_cycle::{SymbolOutcome, TradeCycle, TradeSettings};
use crate::domain::config::AgentConfig;
use crate::domain::events::{AgentState, ErrorCategory, ErrorReport};
use crate::domain::ports::{ExecutionService, MarketDataService};
use crate::domain::risk::state::{AccountState, BalanceUpdate};
use crate::domain::trading::types::OrderIntent;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Server-side agent settings, shared by every agent the server builds.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub tick_interval: Duration,
    /// Equity assumed until the first account refresh lands
    pub initial_balance: Decimal,
    /// Fraction of the day's starting equity that may be lost, in (0, 1]
    pub daily_risk_limit: Decimal,
    pub trade: TradeSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            initial_balance: dec!(10000),
            daily_risk_limit: dec!(0.05),
            trade: TradeSettings::default(),
        }
    }
}

enum Lifecycle {
    /// Built, loop not launched yet
    Idle(Box<TradingLoop>),
    Running { cancel: oneshot::Sender<()> },
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> AgentState {
        match self {
            Lifecycle::Idle(_) => AgentState::Idle,
            Lifecycle::Running { .. } => AgentState::Running,
            Lifecycle::Stopped => AgentState::Stopped,
        }
    }
}

/// Owns the lifecycle of one scheduling loop.
///
/// `start` launches the loop once; `stop` signals it and returns without
/// waiting. A stopped agent cannot be restarted. Misuse is reported as a
/// single diagnostic and changes nothing. Dropping the agent cancels the
/// loop.
pub struct TradingAgent {
    config: AgentConfig,
    lifecycle: Mutex<Lifecycle>,
    stopped: watch::Receiver<bool>,
    events: EventSink,
}

impl TradingAgent {
    pub fn new(
        config: AgentConfig,
        market_data: Arc<dyn MarketDataService>,
        execution: Arc<dyn ExecutionService>,
        strategy: Arc<dyn TradingStrategy>,
        settings: AgentSettings,
        events: EventSink,
    ) -> Self {
        let account = AccountState::new(
            settings.initial_balance,
            config.risk_fraction(),
            settings.daily_risk_limit,
        );

        let call_policy = settings.trade.call_policy;
        let cycle = TradeCycle::new(
            market_data,
            execution.clone(),
            strategy,
            settings.trade,
            config.reward_ratio(),
            events.clone(),
        );

        let (stopped_tx, stopped) = watch::channel(false);

        let trading_loop = TradingLoop {
            cycle,
            execution,
            symbols: config.symbols.clone(),
            account,
            tracker: PositionTracker::new(config.time_exit()),
            tick_interval: settings.tick_interval,
            call_policy,
            events: events.clone(),
            stopped: stopped_tx,
        };

        Self {
            config,
            lifecycle: Mutex::new(Lifecycle::Idle(Box::new(trading_loop))),
            stopped,
            events,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> AgentState {
        self.lock().state()
    }

    /// Launch the scheduling loop. Returns false (after one diagnostic) when
    /// the agent is already running or was stopped.
    pub fn start(&self) -> bool {
        let mut lifecycle = self.lock();

        let trading_loop = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(trading_loop) => trading_loop,
            other => {
                let message = match &other {
                    Lifecycle::Running { .. } => "Agent is already running.",
                    _ => "Agent was stopped and cannot be restarted.",
                };
                *lifecycle = other;
                drop(lifecycle);
                self.events.warn(message);
                return false;
            }
        };

        let (cancel, cancelled) = oneshot::channel();
        *lifecycle = Lifecycle::Running { cancel };
        drop(lifecycle);

        self.events.status(AgentState::Running);
        self.events.info(format!(
            "Agent started for {:?} (risk {}% per trade, reward ratio {}, every {:?})",
            self.config.symbols,
            self.config.risk_per_trade,
            self.config.risk_reward_ratio,
            trading_loop.tick_interval
        ));

        tokio::spawn(trading_loop.run(cancelled));
        true
    }

    /// Signal the loop to exit after its current tick. Does not wait; see
    /// [`TradingAgent::wait_stopped`].
    pub fn stop(&self) -> bool {
        let mut lifecycle = self.lock();

        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running { cancel } => {
                drop(lifecycle);
                // The loop may already be gone; either way it is stopping
                let _ = cancel.send(());
                self.events.info("Agent stop requested.");
                true
            }
            other => {
                *lifecycle = other;
                drop(lifecycle);
                self.events.warn("Agent is not running.");
                false
            }
        }
    }

    /// Wait until the loop has exited. False on timeout or if the loop was
    /// never launched.
    pub async fn wait_stopped(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.clone();
        matches!(
            tokio::time::timeout(timeout, stopped.wait_for(|done| *done)).await,
            Ok(Ok(_))
        )
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// State owned by the running loop and nothing else.
struct TradingLoop {
    cycle: TradeCycle,
    execution: Arc<dyn ExecutionService>,
    symbols: Vec<String>,
    account: AccountState,
    tracker: PositionTracker,
    tick_interval: Duration,
    call_policy: CallPolicy,
    events: EventSink,
    /// Flipped to true once the loop has exited
    stopped: watch::Sender<bool>,
}

impl TradingLoop {
    async fn run(mut self, mut cancelled: oneshot::Receiver<()>) {
        info!("TradingAgent: Trading loop started.");

        let period = self.tick_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                // A dropped sender (agent gone) also ends the loop
                _ = &mut cancelled => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        self.events.info("Trading loop stopped.");
        self.events.status(AgentState::Stopped);
        self.stopped.send_replace(true);
    }

    async fn tick(&mut self) {
        debug!("TradingAgent: Tick for {} symbols", self.symbols.len());

        match guarded(&self.call_policy, "TradingAgent: account", || {
            self.execution.get_account()
        })
        .await
        {
            Ok(snapshot) => {
                match self
                    .account
                    .update_account_balance(snapshot.equity, Utc::now().date_naive())
                {
                    BalanceUpdate::Applied => {
                        debug!("TradingAgent: Account balance updated to {}", snapshot.equity)
                    }
                    BalanceUpdate::DailyReset => self.events.info(format!(
                        "Daily reference equity set to {}",
                        snapshot.equity
                    )),
                    BalanceUpdate::Rejected => self.events.warn(format!(
                        "Ignoring non-positive account equity {}, keeping {}",
                        snapshot.equity, self.account.equity
                    )),
                }
            }
            Err(failure) => {
                self.events.report(ErrorReport::new(
                    ErrorCategory::AccountFetch,
                    failure.kind,
                    failure.to_string(),
                ));
                return;
            }
        }

        let mut orders_accepted = self.run_time_exits().await;

        if self.account.daily_limit_reached() {
            self.events.warn(format!(
                "Daily risk limit reached (loss {} of allowed {}), no new entries this tick",
                self.account.daily_loss_incurred,
                self.account.daily_loss_limit()
            ));
        } else {
            for symbol in &self.symbols {
                let outcome = self.cycle.process_symbol(symbol, &self.account).await;
                if let SymbolOutcome::Ordered { intent, .. } = &outcome {
                    self.tracker.record(intent, Instant::now());
                    orders_accepted = true;
                }
            }
        }

        if orders_accepted {
            self.publish_positions().await;
        }
    }

    /// Close entries older than the configured age. True when a closing
    /// order was accepted.
    async fn run_time_exits(&mut self) -> bool {
        let now = Instant::now();
        if self.tracker.due_symbols(now).is_empty() {
            return false;
        }

        let positions = match guarded(&self.call_policy, "TradingAgent: positions", || {
            self.execution.list_positions()
        })
        .await
        {
            Ok(positions) => positions,
            Err(failure) => {
                self.events.report(ErrorReport::new(
                    ErrorCategory::PositionFetch,
                    failure.kind,
                    failure.to_string(),
                ));
                return false;
            }
        };

        let order_policy = self.call_policy.single_attempt();
        let mut accepted = false;

        for action in self.tracker.plan_exits(now, &positions) {
            match action {
                ExitAction::AlreadyFlat { symbol } => {
                    self.events.info(format!(
                        "Time-based exit: {} is no longer open, forgetting entry",
                        symbol
                    ));
                    self.tracker.forget_due(&symbol, now);
                }
                ExitAction::Close {
                    symbol,
                    side,
                    quantity,
                } => {
                    let intent = OrderIntent::market(&symbol, side, quantity);
                    let label = format!("TradingAgent: exit {}", symbol);
                    match guarded(&order_policy, &label, || {
                        self.execution.place_order(intent.clone())
                    })
                    .await
                    {
                        Ok(order_id) => {
                            self.events.info(format!(
                                "Time-based exit: placed {} order for {} of {}. Order ID: {}",
                                side, quantity, symbol, order_id
                            ));
                            self.tracker.forget_due(&symbol, now);
                            accepted = true;
                        }
                        Err(failure) => {
                            self.events.report(
                                ErrorReport::new(
                                    ErrorCategory::OrderPlacement,
                                    failure.kind,
                                    failure.to_string(),
                                )
                                .for_symbol(symbol),
                            );
                        }
                    }
                }
            }
        }

        accepted
    }

    async fn publish_positions(&self) {
        match guarded(&self.call_policy, "TradingAgent: positions", || {
            self.execution.list_positions()
        })
        .await
        {
            Ok(positions) => self.events.positions(positions),
            Err(failure) => self.events.report(ErrorReport::new(
                ErrorCategory::PositionFetch,
                failure.kind,
                failure.to_string(),
            )),
        }
    }
}
