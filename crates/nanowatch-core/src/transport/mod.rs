//! Transport abstraction layer.
//!
//! Defines the [`Transport`] trait the session layer drives, and provides a
//! websocket implementation ([`WsTransport`]) plus a test mock
//! (`mock::MockTransport`).

#[cfg(test)]
pub mod mock;
mod ws_adapter;

pub use ws_adapter::{WsTransport, DEFAULT_URL};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Everything a transport reports after `open`. Text frames are delivered
/// in the same stream as lifecycle events, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Closed(Option<String>),
    Failure(String),
}

/// Minimal persistent text-message connection.
///
/// Implementations own framing, TLS and reconnection; the session layer
/// only opens, sends, listens and closes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start connecting. Events arrive on the returned receiver; the stream
    /// ends when the connection is gone.
    async fn open(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError>;

    /// Send one text frame.
    async fn send_text(&self, payload: String) -> Result<(), TransportError>;

    /// Close the connection. Closing an idle transport succeeds.
    async fn close(&self) -> Result<(), TransportError>;
}
