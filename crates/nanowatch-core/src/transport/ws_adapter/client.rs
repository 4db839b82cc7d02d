use std::sync::Once;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, trace, warn};

use crate::error::{CoreError, TransportError};

use super::super::{Transport, TransportEvent};
use super::connection::parse_connection;

enum Outbound {
    Text(String, oneshot::Sender<Result<(), TransportError>>),
    Close(oneshot::Sender<()>),
}

/// Websocket transport over `ws://` or `wss://`.
///
/// Each `open` spawns a socket task that owns the stream. Sends and close
/// requests reach it through a command channel; the sender half is dropped
/// on close so later sends fail with [`TransportError::NotConnected`].
pub struct WsTransport {
    url: String,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
}

impl WsTransport {
    pub fn new(connection: &str) -> Result<Self, CoreError> {
        let url = parse_connection(connection)?;
        install_crypto_provider();
        Ok(Self {
            url,
            outbound: Mutex::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// `wss://` handshakes need a process-wide rustls provider. An
/// already-installed provider (possibly the embedding application's) wins.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            trace!("rustls crypto provider already installed");
        }
    });
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        // Replacing the sender ends any previous socket task.
        *self.outbound.lock().await = Some(out_tx);

        debug!(url = %self.url, "opening websocket");
        tokio::spawn(run_socket(self.url.clone(), out_rx, event_tx));
        Ok(event_rx)
    }

    async fn send_text(&self, payload: String) -> Result<(), TransportError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let outbound = self.outbound.lock().await;
            let tx = outbound.as_ref().ok_or(TransportError::NotConnected)?;
            tx.send(Outbound::Text(payload, ack_tx))
                .map_err(|_| TransportError::NotConnected)?;
        }
        ack_rx.await.map_err(|_| TransportError::NotConnected)?
    }

    async fn close(&self) -> Result<(), TransportError> {
        let Some(tx) = self.outbound.lock().await.take() else {
            return Ok(());
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if tx.send(Outbound::Close(ack_tx)).is_ok() {
            // The socket task may already be gone; either way it is closed.
            let _ = ack_rx.await;
        }
        Ok(())
    }
}

async fn run_socket(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            warn!(%url, error = %err, "websocket connect failed");
            let _ = events.send(TransportEvent::Failure(format!("connect {url}: {err}")));
            return;
        }
    };
    let (mut write, mut read) = stream.split();
    let _ = events.send(TransportEvent::Opened);

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Text(payload, ack)) => {
                    trace!(len = payload.len(), "websocket send");
                    let result = write
                        .send(WsMessage::Text(payload.into()))
                        .await
                        .map_err(|e| TransportError::Send(e.to_string()));
                    let _ = ack.send(result);
                }
                Some(Outbound::Close(ack)) => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    let _ = write.close().await;
                    let _ = events.send(TransportEvent::Closed(Some("closed by client".to_owned())));
                    let _ = ack.send(());
                    break;
                }
                None => {
                    let _ = write.close().await;
                    let _ = events.send(TransportEvent::Closed(None));
                    break;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = events.send(TransportEvent::Frame(text.as_str().to_owned()));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.as_str().to_owned());
                    debug!(?reason, "websocket closed by server");
                    let _ = events.send(TransportEvent::Closed(reason));
                    break;
                }
                // Ping/pong are answered by tungstenite; binary frames are
                // not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "websocket read failed");
                    let _ = events.send(TransportEvent::Failure(err.to_string()));
                    break;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed(None));
                    break;
                }
            },
        }
    }
}
