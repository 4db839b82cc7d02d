use std::sync::{Arc, Once};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use nanowatch_core::providers::{StaticAccount, StaticCurrency};
use nanowatch_core::transport::WsTransport;
use nanowatch_core::{AccountService, Address, ConnectionState, Message, MessageKind};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nanowatch_core=debug")),
            )
            .with_target(true)
            .try_init();
    });
}

const ACCOUNT: &str = "nano_3t6k35gi95xu6tergt6p69ck76ogmitsa8mnijtpxm9fkcm736xtoncuohr3";
const WAIT: Duration = Duration::from_secs(5);

/// Accept one websocket client, collect its first four requests, answer
/// with canned frames and hold the socket until the client closes.
async fn spawn_fake_server(responses: Vec<String>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener must bind");
    let addr = listener.local_addr().expect("listener has an address");

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("client must connect");
        let mut ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("websocket handshake must succeed");

        let mut requests = Vec::new();
        while requests.len() < 4 {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => requests.push(text.as_str().to_owned()),
                Some(Ok(_)) => {}
                other => panic!("connection ended before all requests arrived: {other:?}"),
            }
        }

        for frame in responses {
            ws.send(WsMessage::Text(frame.into()))
                .await
                .expect("server send must succeed");
        }

        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
        requests
    });

    (format!("ws://{addr}"), handle)
}

async fn next_message(sub: &mut nanowatch_core::publisher::Subscription) -> Message {
    tokio::time::timeout(WAIT, sub.recv())
        .await
        .expect("timed out waiting for message")
        .expect("publisher must be alive")
}

#[tokio::test(flavor = "multi_thread")]
async fn websocket_session_sends_startup_requests_and_publishes_responses() {
    init_tracing();

    let responses = vec![
        json!({"account": ACCOUNT, "frontier": "F00D", "block_count": "7"}).to_string(),
        "{broken".to_owned(),
        json!({"currency": "usd", "price": 0.85}).to_string(),
        json!({"history": [{"type": "receive", "account": ACCOUNT, "amount": "1", "hash": "H"}]})
            .to_string(),
    ];
    let (url, server) = spawn_fake_server(responses).await;

    let transport = Arc::new(WsTransport::new(&url).expect("url must be valid"));
    let service = AccountService::builder(transport)
        .accounts(Arc::new(StaticAccount(Some(Address::new(ACCOUNT)))))
        .currency(Arc::new(StaticCurrency("USD".into())))
        .build();
    let mut sub = service.subscribe();

    service.open().await.expect("open must succeed");

    let first = next_message(&mut sub).await;
    let Message::Subscribe(subscribe) = first else {
        panic!("expected subscribe first, got {first:?}");
    };
    assert_eq!(subscribe.frontier, "F00D");
    assert_eq!(subscribe.block_count, Some(7));

    assert_eq!(next_message(&mut sub).await.kind(), MessageKind::Price);
    let history = next_message(&mut sub).await;
    let Message::History(history) = history else {
        panic!("expected history, got {history:?}");
    };
    assert_eq!(history.history.len(), 1);

    assert_eq!(service.state().await, ConnectionState::Open);
    assert_eq!(service.session().current_block_count().await, 7);

    service.close().await.expect("close must succeed");
    assert_eq!(service.state().await, ConnectionState::Closed);

    let requests: Vec<serde_json::Value> = tokio::time::timeout(WAIT, server)
        .await
        .expect("server must finish")
        .expect("server task must not panic")
        .iter()
        .map(|r| serde_json::from_str(r).expect("request must be JSON"))
        .collect();

    assert_eq!(
        requests,
        vec![
            json!({"action": "subscribe", "account": ACCOUNT, "currency": "USD"}),
            json!({"action": "price", "currency": "USD"}),
            json!({"action": "price", "currency": "BTC"}),
            json!({"action": "history", "account": ACCOUNT, "count": 10}),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_endpoint_reports_failure_and_closes() {
    init_tracing();

    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = Arc::new(WsTransport::new(&format!("ws://{addr}")).unwrap());
    let service = AccountService::builder(transport).build();
    let mut events = service.events();

    service.open().await.expect("open only starts connecting");

    let saw_failure = tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(nanowatch_core::ServiceEvent::TransportFailure(_)) => return true,
                Ok(_) => {}
                Err(_) => return false,
            }
        }
    })
    .await
    .expect("timed out waiting for failure");
    assert!(saw_failure);

    tokio::time::timeout(WAIT, async {
        while service.state().await != ConnectionState::Closed {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connection must end up closed");
}

#[tokio::test(flavor = "multi_thread")]
async fn tls_handshake_failure_is_reported_as_transport_failure() {
    init_tracing();

    // A plain TCP peer that hangs up on the TLS client hello.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener must bind");
    let port = listener.local_addr().expect("listener has an address").port();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("client must connect");
        drop(stream);
    });

    let transport = Arc::new(WsTransport::new(&format!("wss://localhost:{port}")).unwrap());
    let service = AccountService::builder(transport).build();
    let mut events = service.events();

    service.open().await.expect("open only starts connecting");

    let failure = tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(nanowatch_core::ServiceEvent::TransportFailure(error)) => return Some(error),
                Ok(_) => {}
                Err(_) => return None,
            }
        }
    })
    .await
    .expect("timed out waiting for failure");
    let failure = failure.expect("handshake failure must be reported, not a silent close");
    assert!(failure.contains("wss://localhost"), "unexpected failure: {failure}");

    tokio::time::timeout(WAIT, async {
        while service.state().await != ConnectionState::Closed {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connection must end up closed");
    server.await.expect("server task must not panic");
}
