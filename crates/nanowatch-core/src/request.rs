//! Outgoing request documents.
//!
//! Requests are serialized with an `action` tag matching the remote
//! protocol: `subscribe`, `price` and `history`.

use serde::Serialize;

use crate::error::CoreError;
use crate::session::SessionSnapshot;
use crate::types::Address;

/// Second price quote requested on every update, next to the local one.
pub const BTC_CURRENCY: &str = "BTC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    Subscribe { account: Address, currency: String },
    Price { currency: String },
    History { account: Address, count: u64 },
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::Price { .. } => "price",
            Self::History { .. } => "history",
        }
    }

    pub fn to_json(&self) -> String {
        // Plain strings and integers only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Build the four startup requests in send order: subscribe, local price,
/// BTC price, history.
///
/// Fails without building anything when the session has no address.
pub fn build_startup_requests(
    snapshot: &SessionSnapshot,
    local_currency: &str,
) -> Result<[Request; 4], CoreError> {
    let account = snapshot.address.clone().ok_or(CoreError::AddressUnset)?;

    Ok([
        Request::Subscribe {
            account: account.clone(),
            currency: local_currency.to_owned(),
        },
        Request::Price {
            currency: local_currency.to_owned(),
        },
        Request::Price {
            currency: BTC_CURRENCY.to_owned(),
        },
        Request::History {
            account,
            count: snapshot.block_count,
        },
    ])
}
