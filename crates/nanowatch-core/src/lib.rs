pub mod classify;
pub mod error;
pub mod providers;
pub mod publisher;
pub mod request;
pub mod service;
pub mod session;
#[cfg(test)]
mod test_util;
pub mod transport;
pub mod types;

pub use error::{CoreError, TransportError};
pub use service::{AccountService, ConnectionState, ServiceEvent};
pub use types::{Address, Message, MessageKind};
