//! Operator-facing surface: the wire protocol and WebSocket sessions.

pub mod protocol;
pub mod session;

pub use session::{Session, handle_connection, serve};
