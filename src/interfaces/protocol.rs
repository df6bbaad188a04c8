//! Operator wire protocol.
//!
//! Every frame is a JSON envelope `{ "type": ..., "payload": ... }`.
//!
//! Inbound: `start` (payload is an [`AgentConfig`]) and `stop`.
//! Outbound: `log`, `position_update`, `error` and `status`.

use crate::domain::config::{AgentConfig, AgentConfigError};
use crate::domain::errors::FailureKind;
use crate::domain::events::{AgentEvent, AgentState, ErrorCategory, ErrorReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(kind: &str, payload: impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            kind: kind.to_string(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// Decoded inbound command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(AgentConfig),
    Stop,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Unknown message type '{0}'")]
    UnknownType(String),

    #[error("Invalid start payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] AgentConfigError),
}

impl ProtocolError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProtocolError::Malformed(_) | ProtocolError::UnknownType(_) => {
                ErrorCategory::InvalidCommand
            }
            ProtocolError::InvalidPayload(_) | ProtocolError::InvalidConfig(_) => {
                ErrorCategory::InvalidConfig
            }
        }
    }

    /// Operator input errors never go away on their own.
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport::new(self.category(), FailureKind::Fatal, self.to_string())
    }
}

#[derive(Serialize)]
struct StatusPayload {
    state: AgentState,
}

pub fn decode_command(text: &str) -> Result<Command, ProtocolError> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    match envelope.kind.as_str() {
        "start" => {
            let config: AgentConfig = serde_json::from_value(envelope.payload)
                .map_err(|e| ProtocolError::InvalidPayload(e.to_string()))?;
            config.validate()?;
            Ok(Command::Start(config))
        }
        "stop" => Ok(Command::Stop),
        other => Err(ProtocolError::UnknownType(other.to_string())),
    }
}

pub fn encode_event(event: &AgentEvent) -> serde_json::Result<String> {
    let envelope = match event {
        AgentEvent::Log(line) => Envelope::new("log", line)?,
        AgentEvent::PositionUpdate(positions) => Envelope::new("position_update", positions)?,
        AgentEvent::Error(report) => Envelope::new("error", report)?,
        AgentEvent::Status(state) => Envelope::new("status", StatusPayload { state: *state })?,
    };
    serde_json::to_string(&envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::{PositionSide, PositionSnapshot};
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_start_camel_case() {
        let command = decode_command(
            r#"{"type":"start","payload":{"symbols":["AAPL","MSFT"],"riskPerTrade":1.0,"riskRewardRatio":3.0,"timeBasedExit":15}}"#,
        )
        .unwrap();

        let Command::Start(config) = command else {
            panic!("expected start, got {:?}", command);
        };
        assert_eq!(config.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(config.time_based_exit, 15);
    }

    #[test]
    fn test_decode_start_pascal_case_without_exit() {
        let command = decode_command(
            r#"{"type":"start","payload":{"Symbols":["AAPL"],"RiskPerTrade":2,"RiskRewardRatio":1.5}}"#,
        )
        .unwrap();

        assert!(matches!(command, Command::Start(ref c) if c.time_based_exit == 0));
    }

    #[test]
    fn test_decode_stop_without_payload() {
        assert_eq!(decode_command(r#"{"type":"stop"}"#).unwrap(), Command::Stop);
    }

    #[test]
    fn test_rejections_carry_categories() {
        let unknown = decode_command(r#"{"type":"pause","payload":null}"#).unwrap_err();
        assert!(matches!(unknown, ProtocolError::UnknownType(_)));
        assert_eq!(unknown.category(), ErrorCategory::InvalidCommand);

        let malformed = decode_command("not json").unwrap_err();
        assert_eq!(malformed.category(), ErrorCategory::InvalidCommand);

        let missing = decode_command(r#"{"type":"start","payload":{"symbols":["AAPL"]}}"#)
            .unwrap_err();
        assert!(matches!(missing, ProtocolError::InvalidPayload(_)));

        let invalid = decode_command(
            r#"{"type":"start","payload":{"symbols":[],"riskPerTrade":1,"riskRewardRatio":2}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            invalid,
            ProtocolError::InvalidConfig(AgentConfigError::NoSymbols)
        ));

        let report = invalid.to_report();
        assert_eq!(report.category, ErrorCategory::InvalidConfig);
        assert!(!report.transient);
    }

    #[test]
    fn test_encode_outbound_events() {
        let log: Value =
            serde_json::from_str(&encode_event(&AgentEvent::Log("hello".into())).unwrap()).unwrap();
        assert_eq!(log["type"], "log");
        assert_eq!(log["payload"], "hello");

        let status: Value =
            serde_json::from_str(&encode_event(&AgentEvent::Status(AgentState::Running)).unwrap())
                .unwrap();
        assert_eq!(status["type"], "status");
        assert_eq!(status["payload"]["state"], "running");

        let positions = vec![PositionSnapshot {
            symbol: "AAPL".to_string(),
            qty: dec!(5),
            side: PositionSide::Short,
            avg_entry_price: dec!(101.5),
        }];
        let update: Value = serde_json::from_str(
            &encode_event(&AgentEvent::PositionUpdate(positions)).unwrap(),
        )
        .unwrap();
        assert_eq!(update["type"], "position_update");
        assert_eq!(update["payload"][0]["side"], "short");
        assert_eq!(update["payload"][0]["avg_entry_price"], "101.5");

        let report = ErrorReport::new(ErrorCategory::DataFetch, FailureKind::Transient, "timeout")
            .for_symbol("MSFT");
        let error: Value =
            serde_json::from_str(&encode_event(&AgentEvent::Error(report)).unwrap()).unwrap();
        assert_eq!(error["type"], "error");
        assert_eq!(error["payload"]["category"], "data_fetch");
        assert_eq!(error["payload"]["symbol"], "MSFT");
        assert_eq!(error["payload"]["transient"], true);
    }
}
