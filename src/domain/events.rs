use crate::domain::errors::FailureKind;
use crate::domain::trading::types::PositionSnapshot;
use serde::Serialize;

/// Where a reported failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    AccountFetch,
    DataFetch,
    OrderPlacement,
    PositionFetch,
    InvalidCommand,
    InvalidConfig,
}

/// Structured failure report sent to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub message: String,
    pub transient: bool,
}

impl ErrorReport {
    pub fn new(category: ErrorCategory, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            category,
            symbol: None,
            message: message.into(),
            transient: kind.is_transient(),
        }
    }

    pub fn for_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Idle,
    Running,
    Stopped,
}

/// Everything a trading agent pushes toward its operator session.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Log(String),
    PositionUpdate(Vec<PositionSnapshot>),
    Error(ErrorReport),
    Status(AgentState),
}
