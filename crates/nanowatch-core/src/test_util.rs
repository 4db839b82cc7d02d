//! Shared test helpers for `nanowatch-core` unit tests.
//!
//! Builders for raw documents and server frames so tests across modules
//! share one source of truth for dummy protocol data.

use serde_json::{json, Map, Value};

use crate::types::{Address, Message, SubscribeResponse};

pub const TEST_ADDRESS: &str =
    "nano_1abcdefghijkmnopqrstuwxyz13456789abcdefghijkmnopqrstuwxyz1";

pub fn test_address() -> Address {
    Address::new(TEST_ADDRESS)
}

/// Unwrap a `json!` object literal into a document.
pub fn doc(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("test document must be an object, got {other}"),
    }
}

// ==============================================================================
// Frames
// ==============================================================================

pub fn subscribe_frame(block_count: u64) -> String {
    json!({
        "account": TEST_ADDRESS,
        "frontier": "8F3A0C5B",
        "balance": "1000000000000000000000000000000",
        "block_count": block_count.to_string(),
    })
    .to_string()
}

pub fn price_frame(currency: &str, price: f64) -> String {
    json!({ "currency": currency, "price": price }).to_string()
}

pub fn subscribe_message(block_count: Option<u64>) -> Message {
    Message::Subscribe(SubscribeResponse {
        frontier: "8F3A0C5B".into(),
        block_count,
        account: Some(TEST_ADDRESS.into()),
        balance: None,
        pending: None,
        representative: None,
        open_block: None,
    })
}
