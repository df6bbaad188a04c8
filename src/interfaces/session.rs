//! Operator sessions over WebSocket.
//!
//! One [`Session`] per connection. It holds at most one trading agent,
//! stops the previous agent before installing a new one, and stops its
//! agent when the operator disconnects. Agent events are forwarded to the
//! socket as they arrive.

use crate::application::agents::{AgentFactory, EventSink, TradingAgent};
use crate::domain::config::AgentConfig;
use crate::domain::events::AgentState;
use crate::interfaces::protocol::{Command, decode_command, encode_event};
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{error, info, warn};
use uuid::Uuid;

/// How long a replaced or abandoned agent gets to finish its current tick.
const STOP_ACK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Session {
    id: Uuid,
    factory: AgentFactory,
    events: EventSink,
    agent: Option<TradingAgent>,
}

impl Session {
    pub fn new(factory: AgentFactory, events: EventSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            factory,
            events,
            agent: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn agent(&self) -> Option<&TradingAgent> {
        self.agent.as_ref()
    }

    /// Handle one inbound text frame. Bad input is reported, never fatal.
    pub async fn handle_text(&mut self, text: &str) {
        match decode_command(text) {
            Ok(Command::Start(config)) => self.start(config).await,
            Ok(Command::Stop) => self.stop(),
            Err(e) => {
                warn!("Session[{}]: Rejected message: {}", self.id, e);
                self.events.report(e.to_report());
            }
        }
    }

    async fn start(&mut self, config: AgentConfig) {
        if self.agent.is_some() {
            info!("Session[{}]: Replacing the current agent", self.id);
            self.retire_agent().await;
        }

        let agent = self.factory.build(config, self.events.clone());
        agent.start();
        self.agent = Some(agent);
    }

    fn stop(&mut self) {
        match &self.agent {
            Some(agent) => {
                agent.stop();
            }
            None => self.events.warn("Agent is not running."),
        }
    }

    /// Stop and drop the held agent, if any.
    pub async fn close(&mut self) {
        self.retire_agent().await;
    }

    async fn retire_agent(&mut self) {
        let Some(agent) = self.agent.take() else {
            return;
        };
        if agent.state() != AgentState::Running {
            return;
        }

        agent.stop();
        if !agent.wait_stopped(STOP_ACK_TIMEOUT).await {
            // Dropping the agent still cancels the loop once the tick ends
            warn!(
                "Session[{}]: Agent did not stop within {:?}",
                self.id, STOP_ACK_TIMEOUT
            );
        }
    }
}

/// Run one operator session over an accepted byte stream.
pub async fn handle_connection<S>(stream: S, factory: AgentFactory) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ws_stream = accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    let (mut write, mut read) = ws_stream.split();

    let (events, mut rx) = EventSink::channel();
    let mut session = Session::new(factory, events);
    let id = session.id();
    info!("Session[{}]: Operator connected", id);

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                // Binary frames are ignored, pings are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Session[{}]: Read failed: {}", id, e);
                    break;
                }
            },
            Some(event) = rx.recv() => {
                let frame = match encode_event(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!("Session[{}]: Failed to encode event: {}", id, e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::text(frame)).await {
                    warn!("Session[{}]: Write failed: {}", id, e);
                    break;
                }
            }
        }
    }

    session.close().await;
    info!("Session[{}]: Operator disconnected", id);
    Ok(())
}

/// Accept connections until `shutdown` resolves, one task per session.
pub async fn serve<F>(listener: TcpListener, factory: AgentFactory, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let local = listener.local_addr().context("Listener has no local address")?;
    info!("Server: Listening on ws://{}", local);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Server: Shutdown requested, no longer accepting sessions");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let factory = factory.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, factory).await {
                            warn!("Server: Session from {} ended with error: {:#}", peer, e);
                        }
                    });
                }
                Err(e) => warn!("Server: Accept failed: {}", e),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::AgentSettings;
    use crate::application::strategies::CrossoverRsiStrategy;
    use crate::domain::events::{AgentEvent, ErrorCategory};
    use crate::infrastructure::mock::{MockExecutionService, MockMarketDataService};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn session() -> (Session, UnboundedReceiver<AgentEvent>) {
        let factory = AgentFactory::new(
            Arc::new(MockMarketDataService::new()),
            Arc::new(MockExecutionService::new(dec!(10000))),
            Arc::new(CrossoverRsiStrategy::default()),
            AgentSettings::default(),
        );
        let (events, rx) = EventSink::channel();
        (Session::new(factory, events), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    const START: &str = r#"{"type":"start","payload":{"symbols":["AAPL"],"riskPerTrade":1,"riskRewardRatio":2}}"#;

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_agent_reports_not_running() {
        let (mut session, mut rx) = session();
        session.handle_text(r#"{"type":"stop"}"#).await;

        assert_eq!(
            drain(&mut rx),
            vec![AgentEvent::Log("Agent is not running.".to_string())]
        );
        assert!(session.agent().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_messages_reported_and_session_continues() {
        let (mut session, mut rx) = session();
        session.handle_text(r#"{"type":"launch"}"#).await;
        session
            .handle_text(r#"{"type":"start","payload":{"symbols":[" "],"riskPerTrade":1,"riskRewardRatio":2}}"#)
            .await;

        let categories: Vec<ErrorCategory> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                AgentEvent::Error(report) => Some(report.category),
                _ => None,
            })
            .collect();
        assert_eq!(
            categories,
            vec![ErrorCategory::InvalidCommand, ErrorCategory::InvalidConfig]
        );

        session.handle_text(START).await;
        assert_eq!(
            session.agent().map(|agent| agent.state()),
            Some(AgentState::Running)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_stops_first_agent_first() {
        let (mut session, mut rx) = session();
        session.handle_text(START).await;
        session
            .handle_text(r#"{"type":"start","payload":{"symbols":["MSFT"],"riskPerTrade":2,"riskRewardRatio":3}}"#)
            .await;

        let statuses: Vec<AgentState> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                AgentEvent::Status(state) => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![AgentState::Running, AgentState::Stopped, AgentState::Running]
        );

        let agent = session.agent().unwrap();
        assert_eq!(agent.config().symbols, vec!["MSFT"]);
        assert_eq!(agent.state(), AgentState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_running_agent() {
        let (mut session, mut rx) = session();
        session.handle_text(START).await;
        session.close().await;

        assert!(session.agent().is_none());
        assert!(
            drain(&mut rx)
                .iter()
                .any(|event| *event == AgentEvent::Status(AgentState::Stopped))
        );
    }
}
