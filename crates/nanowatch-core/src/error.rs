/// Failures reported by a [`Transport`](crate::transport::Transport)
/// implementation. The transport owns framing, TLS and reconnection, so
/// these only describe what the session layer needs to log.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("connection closed: {0}")]
    Closed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("failed to send {action} request: {source}")]
    SendFailure {
        action: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    #[error("no account address is set")]
    AddressUnset,

    #[error("connection is closing")]
    Closing,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
