//! Frame classification.
//!
//! The server does not tag its responses, so the message kind is inferred
//! from which keys are present. Checks run in a fixed order and the first
//! match wins: `frontier` → `history` → `currency` → `work` → unknown.

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::{
    HistoryEntry, HistoryResponse, Message, PriceResponse, SubscribeResponse, WorkResponse,
};

type Document = Map<String, Value>;

/// Decode one text frame and classify it.
///
/// Only syntax errors and non-object documents fail; anything that parses
/// as an object is classified.
pub fn decode_frame(text: &str) -> Result<Message, CoreError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| CoreError::MalformedMessage(format!("invalid JSON: {e}")))?;
    match value {
        Value::Object(doc) => Ok(classify(doc)),
        other => Err(CoreError::MalformedMessage(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Classify a decoded document. Total: unrecognized documents become
/// [`Message::Unknown`].
pub fn classify(doc: Document) -> Message {
    // A key counts as present even when its value is null.
    if doc.contains_key("frontier") {
        Message::Subscribe(parse_subscribe(&doc))
    } else if doc.contains_key("history") {
        Message::History(parse_history(&doc))
    } else if doc.contains_key("currency") {
        Message::Price(PriceResponse {
            currency: string_field(&doc, "currency").unwrap_or_default(),
            price: float_field(&doc, "price"),
        })
    } else if doc.contains_key("work") {
        Message::Work(WorkResponse {
            work: string_field(&doc, "work").unwrap_or_default(),
        })
    } else {
        Message::Unknown(doc)
    }
}

fn parse_subscribe(doc: &Document) -> SubscribeResponse {
    SubscribeResponse {
        frontier: string_field(doc, "frontier").unwrap_or_default(),
        block_count: integer_field(doc, "block_count"),
        account: string_field(doc, "account"),
        balance: string_field(doc, "balance"),
        pending: string_field(doc, "pending"),
        representative: string_field(doc, "representative"),
        open_block: string_field(doc, "open_block"),
    }
}

// The node sends `"history": ""` for an account without blocks.
fn parse_history(doc: &Document) -> HistoryResponse {
    let history = match doc.get("history") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_object)
            .map(|entry| HistoryEntry {
                kind: string_field(entry, "type"),
                account: string_field(entry, "account"),
                amount: string_field(entry, "amount"),
                hash: string_field(entry, "hash"),
            })
            .collect(),
        _ => Vec::new(),
    };
    HistoryResponse { history }
}

// ==============================================================================
// Lenient field extraction
// ==============================================================================

fn string_field(doc: &Document, key: &str) -> Option<String> {
    match doc.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// Counts arrive as numbers or as numeric strings depending on the node.
fn integer_field(doc: &Document, key: &str) -> Option<u64> {
    match doc.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_field(doc: &Document, key: &str) -> Option<f64> {
    match doc.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
