use tokio::sync::RwLock;

use crate::types::{Address, Message};

/// Block count used for history requests until the server reports one.
pub const DEFAULT_BLOCK_COUNT: u64 = 10;

#[derive(Debug, Default)]
struct Inner {
    address: Option<Address>,
    block_count: Option<u64>,
}

/// A consistent view of the session taken under a single lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub address: Option<Address>,
    pub block_count: u64,
}

/// Tracked address and last known block count.
///
/// Written from the receive path, read from the request path; both go
/// through the same `RwLock`.
#[derive(Debug)]
pub struct SessionState {
    inner: RwLock<Inner>,
    fallback_block_count: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_fallback(DEFAULT_BLOCK_COUNT)
    }

    pub fn with_fallback(fallback_block_count: u64) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            fallback_block_count,
        }
    }

    pub async fn set_address(&self, address: Address) {
        self.inner.write().await.address = Some(address);
    }

    pub async fn clear_address(&self) {
        self.inner.write().await.address = None;
    }

    pub async fn address(&self) -> Option<Address> {
        self.inner.read().await.address.clone()
    }

    pub async fn current_block_count(&self) -> u64 {
        self.inner
            .read()
            .await
            .block_count
            .unwrap_or(self.fallback_block_count)
    }

    /// Record the block count carried by a subscribe message, verbatim.
    /// A subscribe message without a count resets to the fallback; other
    /// kinds are ignored.
    pub async fn observe(&self, message: &Message) {
        if let Message::Subscribe(sub) = message {
            self.inner.write().await.block_count = sub.block_count;
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read().await;
        SessionSnapshot {
            address: inner.address.clone(),
            block_count: inner.block_count.unwrap_or(self.fallback_block_count),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
