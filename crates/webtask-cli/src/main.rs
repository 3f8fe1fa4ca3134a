//! The webtask binary: agent-facing HTTP server, expiry loop and
//! operator console wired over the shared session state.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webtask_console::ConsoleController;
use webtask_core::{FsStore, SessionRegistry, WaitGate};
use webtask_server::{CommandRouter, ExpiryLoop, ServerConfig};

const BANNER: &str = r"
             _     _            _
 __ __ _____| |__ | |_ __ _ ___| |__
 \ V  V / -_) '_ \|  _/ _` (_-< / /
  \_/\_/\___|_.__/ \__\__,_/__/_\_\
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Operator output owns stdout; diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    println!("{BANNER}");
    tracing::info!(bind = %config.bind, ttl = config.ttl, "starting");

    let registry = Arc::new(SessionRegistry::new(
        config.ttl,
        Arc::new(FsStore::new(&config.sessions_dir)),
    ));
    let gate = Arc::new(WaitGate::new());
    let (router, events) = CommandRouter::new(Arc::clone(&registry), Arc::clone(&gate));
    let router = Arc::new(router);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let expiry = tokio::spawn(
        ExpiryLoop::new(Arc::clone(&registry), Arc::clone(&gate), shutdown_rx.clone()).run(),
    );
    let console = tokio::spawn(
        ConsoleController::new(Arc::clone(&router), events, shutdown_tx.clone()).run(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("listening on http://{}", config.bind);

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, webtask_server::http::app(router))
        .with_graceful_shutdown(async move {
            // Already-flipped flags and dropped senders both stop the server.
            if !*server_shutdown.borrow_and_update() {
                let _ = server_shutdown.changed().await;
            }
        })
        .await
        .context("HTTP server failed")?;

    expiry.await.context("expiry loop panicked")?;
    console.abort();

    tracing::info!("bye");
    Ok(())
}
