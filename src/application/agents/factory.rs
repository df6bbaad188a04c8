use super::event_sink::EventSink;
use super::trading_agent::{AgentSettings, TradingAgent};
use crate::application::strategies::TradingStrategy;
use crate::domain::config::AgentConfig;
use crate::domain::ports::{ExecutionService, MarketDataService};
use std::sync::Arc;

/// Builds trading agents over one shared collaborator pair.
///
/// Sessions hold a factory and ask it for a fresh agent on every `start`.
#[derive(Clone)]
pub struct AgentFactory {
    market_data: Arc<dyn MarketDataService>,
    execution: Arc<dyn ExecutionService>,
    strategy: Arc<dyn TradingStrategy>,
    settings: AgentSettings,
}

impl AgentFactory {
    pub fn new(
        market_data: Arc<dyn MarketDataService>,
        execution: Arc<dyn ExecutionService>,
        strategy: Arc<dyn TradingStrategy>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            market_data,
            execution,
            strategy,
            settings,
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn build(&self, config: AgentConfig, events: EventSink) -> TradingAgent {
        TradingAgent::new(
            config,
            self.market_data.clone(),
            self.execution.clone(),
            self.strategy.clone(),
            self.settings.clone(),
            events,
        )
    }
}
