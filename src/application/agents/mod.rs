pub mod event_sink;
pub mod factory;
pub mod position_tracker;
pub mod trading_agent;

pub use event_sink::EventSink;
pub use factory::AgentFactory;
pub use trading_agent::{AgentSettings, TradingAgent};
