//! Domain types shared by the session layer.
//!
//! Contains the tracked account [`Address`], the classified [`Message`]
//! variants with their payloads, and the fieldless [`MessageKind`] used for
//! filtering and logging.

use serde::{Deserialize, Serialize};

// ==============================================================================
// Address
// ==============================================================================

/// An account identifier as supplied by the account collaborator.
///
/// The format is not validated here. `#[serde(transparent)]` keeps the JSON
/// representation a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ==============================================================================
// Message Kind
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Subscribe,
    History,
    Price,
    Work,
    Unknown,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribe => write!(f, "subscribe"),
            Self::History => write!(f, "history"),
            Self::Price => write!(f, "price"),
            Self::Work => write!(f, "work"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ==============================================================================
// Response Payloads
// ==============================================================================

/// Account subscription state pushed by the server after a `subscribe`
/// request and on every new block for the account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribeResponse {
    pub frontier: String,
    pub block_count: Option<u64>,
    pub account: Option<String>,
    pub balance: Option<String>,
    pub pending: Option<String>,
    pub representative: Option<String>,
    pub open_block: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub account: Option<String>,
    pub amount: Option<String>,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceResponse {
    pub currency: String,
    pub price: Option<f64>,
}

/// Proof-of-work result. Server-pushed only; no request produces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkResponse {
    pub work: String,
}

// ==============================================================================
// Message
// ==============================================================================

/// A classified inbound frame.
///
/// `Unknown` carries the decoded document untouched; no further typing is
/// attempted for it. Serialized adjacently tagged (`{"kind": ..., "message": ...}`)
/// so a document's own `kind` key never collides with the tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Message {
    Subscribe(SubscribeResponse),
    History(HistoryResponse),
    Price(PriceResponse),
    Work(WorkResponse),
    Unknown(serde_json::Map<String, serde_json::Value>),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Subscribe(_) => MessageKind::Subscribe,
            Self::History(_) => MessageKind::History,
            Self::Price(_) => MessageKind::Price,
            Self::Work(_) => MessageKind::Work,
            Self::Unknown(_) => MessageKind::Unknown,
        }
    }
}
