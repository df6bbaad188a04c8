use crate::domain::events::{AgentEvent, AgentState, ErrorReport};
use crate::domain::trading::types::PositionSnapshot;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{error, info, warn};

/// Outbound side of a trading agent.
///
/// Every diagnostic goes to `tracing` and, when a session is attached, is
/// also pushed to it as it happens. Unbounded: the agent never waits on the
/// operator.
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<AgentEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<AgentEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink with its receiving end, for a session or a test.
    pub fn channel() -> (Self, UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Sink that only logs.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.emit(AgentEvent::Log(message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.emit(AgentEvent::Log(message));
    }

    /// Report a failure as a log line followed by its structured form.
    pub fn report(&self, report: ErrorReport) {
        let line = match &report.symbol {
            Some(symbol) => format!("{:?} failed for {}: {}", report.category, symbol, report.message),
            None => format!("{:?} failed: {}", report.category, report.message),
        };
        error!("{}", line);
        self.emit(AgentEvent::Log(line));
        self.emit(AgentEvent::Error(report));
    }

    pub fn positions(&self, positions: Vec<PositionSnapshot>) {
        info!("Position snapshot: {} open positions", positions.len());
        self.emit(AgentEvent::PositionUpdate(positions));
    }

    pub fn status(&self, state: AgentState) {
        self.emit(AgentEvent::Status(state));
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver means the session is gone; tracing still has it
            let _ = tx.send(event);
        }
    }
}
