//! `AccountService` — the connection manager for one tracked account.
//!
//! Owns the transport lifecycle and a dispatch task per open connection.
//! The dispatch task is the only writer of [`SessionState`]: it classifies
//! each inbound frame, records the block count from subscribe messages and
//! hands the message to the [`Publisher`]. Errors never escalate; they are
//! logged and broadcast as [`ServiceEvent`]s for whoever is watching.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::classify::decode_frame;
use crate::error::CoreError;
use crate::providers::{AccountProvider, CurrencyProvider, StaticAccount, StaticCurrency};
use crate::publisher::{Publisher, Subscription};
use crate::request::build_startup_requests;
use crate::session::{SessionState, DEFAULT_BLOCK_COUNT};
use crate::transport::{Transport, TransportEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

// ==============================================================================
// Lifecycle Types
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Closed,
    Opening,
    Open,
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Opening => write!(f, "opening"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

/// Lifecycle changes and reported errors, broadcast to every receiver
/// obtained from [`AccountService::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    StateChanged(ConnectionState),
    TransportFailure(String),
    MalformedMessage(String),
    SendFailure { action: &'static str, error: String },
}

struct Connection {
    state: ConnectionState,
    dispatch: Option<JoinHandle<()>>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    accounts: Arc<dyn AccountProvider>,
    currency: Arc<dyn CurrencyProvider>,
    session: Arc<SessionState>,
    publisher: Arc<Publisher>,
    connection: Mutex<Connection>,
    events: broadcast::Sender<ServiceEvent>,
}

// ==============================================================================
// Builder
// ==============================================================================

pub struct AccountServiceBuilder {
    transport: Arc<dyn Transport>,
    accounts: Arc<dyn AccountProvider>,
    currency: Arc<dyn CurrencyProvider>,
    publisher: Arc<Publisher>,
    fallback_block_count: u64,
}

impl AccountServiceBuilder {
    pub fn accounts(mut self, accounts: Arc<dyn AccountProvider>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn currency(mut self, currency: Arc<dyn CurrencyProvider>) -> Self {
        self.currency = currency;
        self
    }

    /// Share an existing publisher instead of creating a private one.
    pub fn publisher(mut self, publisher: Arc<Publisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn fallback_block_count(mut self, count: u64) -> Self {
        self.fallback_block_count = count;
        self
    }

    pub fn build(self) -> AccountService {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        AccountService {
            inner: Arc::new(Inner {
                transport: self.transport,
                accounts: self.accounts,
                currency: self.currency,
                session: Arc::new(SessionState::with_fallback(self.fallback_block_count)),
                publisher: self.publisher,
                connection: Mutex::new(Connection {
                    state: ConnectionState::Closed,
                    dispatch: None,
                }),
                events,
            }),
        }
    }
}

// ==============================================================================
// Service
// ==============================================================================

pub struct AccountService {
    inner: Arc<Inner>,
}

impl AccountService {
    pub fn builder(transport: Arc<dyn Transport>) -> AccountServiceBuilder {
        AccountServiceBuilder {
            transport,
            accounts: Arc::new(StaticAccount::default()),
            currency: Arc::new(StaticCurrency::default()),
            publisher: Arc::new(Publisher::new()),
            fallback_block_count: DEFAULT_BLOCK_COUNT,
        }
    }

    /// Prime the session address and open the transport.
    ///
    /// The address is re-read on every call. Calling while opening or open
    /// does nothing else. Without a stored address the transport still
    /// opens, but no requests are sent.
    pub async fn open(&self) -> Result<(), CoreError> {
        match self.inner.accounts.address() {
            Some(address) => self.inner.session.set_address(address).await,
            None => {
                warn!("no stored account address; requests will be skipped");
                self.inner.session.clear_address().await;
            }
        }

        let mut conn = self.inner.connection.lock().await;
        match conn.state {
            ConnectionState::Opening | ConnectionState::Open => {
                debug!(state = %conn.state, "open ignored; connection already active");
                return Ok(());
            }
            ConnectionState::Closing => return Err(CoreError::Closing),
            ConnectionState::Closed => {}
        }

        self.inner.transition(&mut conn, ConnectionState::Opening);
        let events = match self.inner.transport.open().await {
            Ok(events) => events,
            Err(err) => {
                error!(error = %err, "transport open failed");
                self.inner.report(ServiceEvent::TransportFailure(err.to_string()));
                self.inner.transition(&mut conn, ConnectionState::Closed);
                return Err(CoreError::TransportFailure(err));
            }
        };

        if let Some(stale) = conn.dispatch.take() {
            stale.abort();
        }
        conn.dispatch = Some(tokio::spawn(dispatch(Arc::clone(&self.inner), events)));
        Ok(())
    }

    /// Tear down the connection. No further frames are dispatched once this
    /// starts; events racing with it are dropped.
    pub async fn close(&self) -> Result<(), CoreError> {
        {
            let mut conn = self.inner.connection.lock().await;
            if matches!(
                conn.state,
                ConnectionState::Closed | ConnectionState::Closing
            ) {
                return Ok(());
            }
            self.inner.transition(&mut conn, ConnectionState::Closing);
            if let Some(task) = conn.dispatch.take() {
                task.abort();
            }
        }

        let result = self.inner.transport.close().await;

        let mut conn = self.inner.connection.lock().await;
        self.inner.transition(&mut conn, ConnectionState::Closed);

        result.map_err(|err| {
            error!(error = %err, "transport close failed");
            self.inner.report(ServiceEvent::TransportFailure(err.to_string()));
            CoreError::TransportFailure(err)
        })
    }

    /// Re-send the subscribe, price and history requests.
    ///
    /// Returns the number of requests the transport accepted, or
    /// [`CoreError::AddressUnset`] when there is nothing to request for.
    pub async fn request_update(&self) -> Result<usize, CoreError> {
        self.inner.request_update().await
    }

    pub fn local_currency(&self) -> String {
        self.inner.currency.local_currency()
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.connection.lock().await.state
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.inner.session
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.inner.publisher
    }

    pub fn subscribe(&self) -> Subscription {
        self.inner.publisher.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<ServiceEvent> {
        self.inner.events.subscribe()
    }
}

impl Inner {
    fn transition(&self, conn: &mut Connection, next: ConnectionState) {
        if conn.state == next {
            return;
        }
        debug!(from = %conn.state, to = %next, "connection state");
        conn.state = next;
        self.report(ServiceEvent::StateChanged(next));
    }

    fn report(&self, event: ServiceEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Handles `text` unless the connection has left Opening/Open. The
    /// connection lock is held until the frame is published, so a `close()`
    /// either waits for it or wins and the frame is dropped.
    async fn dispatch_frame(&self, text: &str) -> bool {
        let conn = self.connection.lock().await;
        if !matches!(
            conn.state,
            ConnectionState::Opening | ConnectionState::Open
        ) {
            debug!(state = %conn.state, "dropping frame; connection is not open");
            return false;
        }
        self.handle_frame(text).await;
        true
    }

    async fn request_update(&self) -> Result<usize, CoreError> {
        let snapshot = self.session.snapshot().await;
        let currency = self.currency.local_currency();
        let requests = build_startup_requests(&snapshot, &currency).inspect_err(|_| {
            debug!("no account address; skipping requests");
        })?;

        let mut sent = 0;
        for request in requests {
            let action = request.action();
            match self.transport.send_text(request.to_json()).await {
                Ok(()) => {
                    debug!(action, "request sent");
                    sent += 1;
                }
                Err(source) => {
                    let err = CoreError::SendFailure { action, source };
                    error!(action, error = %err, "request failed");
                    self.report(ServiceEvent::SendFailure {
                        action,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(sent)
    }

    async fn handle_frame(&self, text: &str) {
        match decode_frame(text) {
            Ok(message) => {
                debug!(kind = %message.kind(), "frame classified");
                self.session.observe(&message).await;
                self.publisher.publish(message);
            }
            Err(err) => {
                warn!(error = %err, len = text.len(), "dropping malformed frame");
                self.report(ServiceEvent::MalformedMessage(err.to_string()));
            }
        }
    }
}

async fn dispatch(inner: Arc<Inner>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Opened => {
                info!("connection opened");
                {
                    let mut conn = inner.connection.lock().await;
                    if conn.state != ConnectionState::Opening {
                        continue;
                    }
                    inner.transition(&mut conn, ConnectionState::Open);
                }
                // Failures are already logged and reported per request.
                let _ = inner.request_update().await;
            }
            TransportEvent::Frame(text) => {
                inner.dispatch_frame(&text).await;
            }
            TransportEvent::Closed(reason) => {
                info!(reason = reason.as_deref().unwrap_or(""), "connection closed");
                let mut conn = inner.connection.lock().await;
                inner.transition(&mut conn, ConnectionState::Closed);
                return;
            }
            TransportEvent::Failure(error) => {
                error!(%error, "transport failure");
                inner.report(ServiceEvent::TransportFailure(error));
            }
        }
    }

    // The transport dropped its event stream without a close event.
    let mut conn = inner.connection.lock().await;
    if matches!(
        conn.state,
        ConnectionState::Opening | ConnectionState::Open
    ) {
        inner.transition(&mut conn, ConnectionState::Closed);
    }
}
