//! Multi-Client TCP Broadcast Relay Library
//!
//! A chat relay server built on tokio: every client's message is fanned
//! out to every other connected client, with no history kept.
//!
//! # Features
//! - Plain-TCP transport with a colon-separated text protocol
//! - Name handshake on connect
//! - Join/leave notices broadcast as `SYSTEM:` frames
//! - Per-recipient failure isolation during broadcast
//! - Coordinated shutdown that notifies every client
//! - A headless client that classifies frames for a display surface
//!
//! # Architecture
//! One spawned task per accepted connection plus one for the accept
//! loop. Shared state is the `ClientRegistry`, a single-lock map from
//! connection handle to display name and outbound channel; the
//! `Broadcaster` iterates point-in-time snapshots of it, so a slow peer
//! never stalls registration or delivery to other peers.
//!
//! # Example
//! ```ignore
//! use chat_relay::RelayServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = RelayServer::new();
//!     server.start("0.0.0.0:5555").await.unwrap();
//!     tokio::signal::ctrl_c().await.unwrap();
//!     server.stop().await;
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use broadcast::Broadcaster;
pub use client::{ClientEvent, ConnectionStatus, DisplayTag, RelayClient};
pub use error::{FrameError, RelayError};
pub use handler::handle_connection;
pub use message::{Message, CLIENT_DISCONNECT, SERVER_SHUTDOWN, SYSTEM_PREFIX};
pub use registry::{ClientRegistry, RegistryEntry};
pub use server::RelayServer;
pub use types::ConnectionId;
