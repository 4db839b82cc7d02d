use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

use super::{Transport, TransportEvent};

/// A scripted transport for tests. Records every payload sent and lets the
/// test inject events into the most recently opened connection.
pub struct MockTransport {
    sent: Mutex<Vec<String>>,
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    fail_open: bool,
    fail_sends_containing: Vec<String>,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MockTransport {
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder {
            fail_open: false,
            fail_sends_containing: Vec::new(),
        }
    }

    /// Push an event as if the remote end produced it. Returns false when
    /// no connection is listening.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.events
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|s| serde_json::from_str(s).expect("sent payload must be JSON"))
            .collect()
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` payloads were sent (including failed
    /// attempts, which are recorded too).
    pub async fn wait_for_sent(&self, count: usize) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let sent = self.sent();
                if sent.len() >= count {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for sends")
    }
}

pub struct MockTransportBuilder {
    fail_open: bool,
    fail_sends_containing: Vec<String>,
}

impl MockTransportBuilder {
    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Fail every send whose payload contains `needle`.
    pub fn fail_sends_containing(mut self, needle: &str) -> Self {
        self.fail_sends_containing.push(needle.to_owned());
        self
    }

    pub fn build(self) -> MockTransport {
        MockTransport {
            sent: Mutex::new(Vec::new()),
            events: Mutex::new(None),
            fail_open: self.fail_open,
            fail_sends_containing: self.fail_sends_containing,
            open_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(TransportError::Connect("mock refused connection".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn send_text(&self, payload: String) -> Result<(), TransportError> {
        let fail = self
            .fail_sends_containing
            .iter()
            .any(|needle| payload.contains(needle.as_str()));
        self.sent.lock().unwrap().push(payload);
        if fail {
            Err(TransportError::Send("mock send failure".into()))
        } else {
            Ok(())
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_opened_receiver() {
        let transport = MockTransport::builder().build();
        assert!(!transport.emit(TransportEvent::Opened));

        let mut events = transport.open().await.unwrap();
        assert!(transport.emit(TransportEvent::Frame("{}".into())));
        assert_eq!(events.recv().await, Some(TransportEvent::Frame("{}".into())));
    }

    #[tokio::test]
    async fn failing_sends_are_still_recorded() {
        let transport = MockTransport::builder()
            .fail_sends_containing("BTC")
            .build();
        assert!(transport.send_text("USD".into()).await.is_ok());
        assert!(transport.send_text("BTC".into()).await.is_err());
        assert_eq!(transport.sent(), vec!["USD".to_owned(), "BTC".to_owned()]);
    }
}
