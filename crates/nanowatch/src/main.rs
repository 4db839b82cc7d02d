mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;

use nanowatch_core::providers::{StaticAccount, StaticCurrency};
use nanowatch_core::transport::WsTransport;
use nanowatch_core::{AccountService, Address, ServiceEvent};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let transport = Arc::new(WsTransport::new(&args.url).wrap_err("configure websocket transport")?);
    let address = args.address.as_deref().map(Address::new);
    if address.is_none() {
        tracing::warn!("no --address given; the session will only listen");
    }

    let service = Arc::new(
        AccountService::builder(transport)
            .accounts(Arc::new(StaticAccount(address)))
            .currency(Arc::new(StaticCurrency(args.currency.clone())))
            .fallback_block_count(args.fallback_block_count)
            .build(),
    );

    // Subscribe before opening so no response is missed.
    let mut messages = service.subscribe();
    let mut events = service.events();

    service
        .open()
        .await
        .wrap_err_with(|| format!("open connection to {}", args.url))?;
    tracing::info!(url = %args.url, currency = %service.local_currency(), "session started");

    if args.refresh_secs > 0 {
        spawn_refresh(Arc::clone(&service), Duration::from_secs(args.refresh_secs));
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received; closing session");
                break;
            }
            message = messages.recv() => {
                let Some(message) = message else { break };
                println!("{}", serde_json::to_string(&message).wrap_err("encode message")?);
            }
            event = events.recv() => match event {
                Ok(ServiceEvent::StateChanged(state)) => {
                    tracing::info!(%state, "connection state");
                    if state == nanowatch_core::ConnectionState::Closed {
                        break;
                    }
                }
                Ok(ServiceEvent::TransportFailure(error)) => {
                    tracing::error!(%error, "transport failure");
                }
                // Already logged by the service.
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "service events lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    service.close().await.wrap_err("close connection")?;
    Ok(())
}

fn spawn_refresh(service: Arc<AccountService>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately; startup requests already cover it.
        interval.tick().await;
        loop {
            interval.tick().await;
            match service.request_update().await {
                Ok(sent) => tracing::debug!(sent, "periodic refresh"),
                Err(err) => tracing::debug!(error = %err, "periodic refresh skipped"),
            }
        }
    });
}
