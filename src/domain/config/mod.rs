//! Configuration domain module
//!
//! Value objects for the configuration an operator binds to a trading agent.

pub mod agent_config;

pub use agent_config::{AgentConfig, AgentConfigError};
