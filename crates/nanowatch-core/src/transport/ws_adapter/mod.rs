//! Websocket implementation of [`Transport`](super::Transport) using
//! `tokio-tungstenite`, with one socket task per open connection and
//! per-send acknowledgements.

mod client;
mod connection;

pub use client::WsTransport;

/// Endpoint used when no URL is configured.
pub const DEFAULT_URL: &str = "wss://raicast.lightrai.com:443";
