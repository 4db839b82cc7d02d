//! Read-only collaborators the session depends on: where the tracked
//! address comes from and which local currency to quote.

use crate::types::Address;

/// Source of the single stored account address.
pub trait AccountProvider: Send + Sync {
    /// `None` when no credentials are stored.
    fn address(&self) -> Option<Address>;
}

/// Source of the user's local currency code, e.g. `"USD"`.
pub trait CurrencyProvider: Send + Sync {
    fn local_currency(&self) -> String;
}

/// Fixed account supplied at construction, e.g. from the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticAccount(pub Option<Address>);

impl AccountProvider for StaticAccount {
    fn address(&self) -> Option<Address> {
        self.0.clone()
    }
}

#[derive(Debug, Clone)]
pub struct StaticCurrency(pub String);

impl CurrencyProvider for StaticCurrency {
    fn local_currency(&self) -> String {
        self.0.clone()
    }
}

impl Default for StaticCurrency {
    fn default() -> Self {
        Self("USD".to_owned())
    }
}
