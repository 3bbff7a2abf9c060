//! Relay server - Entry Point
//!
//! Binds the listening socket, relays until interrupted, then performs
//! the coordinated shutdown.

use std::env;

use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::RelayServer;

/// Default listening address (the relay's traditional port)
const DEFAULT_ADDR: &str = "0.0.0.0:5555";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    // Get bind address from command line or use default
    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let server = RelayServer::new();
    server.start(&addr).await?;

    info!("Waiting for connections... press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    server.stop().await;
    Ok(())
}
