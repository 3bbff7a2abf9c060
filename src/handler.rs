//! Per-connection handler
//!
//! Owns one accepted TCP connection: reads the handshake name, registers
//! the client, relays decoded chat frames through the broadcaster, and
//! tears the connection down on disconnect or server shutdown.
//!
//! Reads and writes are split across tasks: this handler owns the read
//! half, and a writer task owns the write half, fed by the mpsc sender
//! stored in the registry.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::broadcast::Broadcaster;
use crate::message::Message;
use crate::registry::ClientRegistry;
use crate::types::ConnectionId;

/// Read buffer size; one read is expected to carry one frame
const READ_BUFFER_SIZE: usize = 1024;

/// Capacity of the channel feeding the writer task
const WRITE_CHANNEL_SIZE: usize = 32;

/// Handle one accepted connection until it closes
///
/// Lifecycle: handshake (first frame is the raw display name), register
/// and announce the join, relay chat frames, then unregister and announce
/// the leave. Any transport error is treated the same as a peer-initiated
/// disconnect; nothing here is retried.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Arc<ClientRegistry>,
    broadcaster: Broadcaster,
    mut shutdown: watch::Receiver<bool>,
) {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let conn_id = ConnectionId::new();

    let (mut read_half, write_half) = stream.into_split();

    // Handshake: the first read carries the display name, unframed
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let name = tokio::select! {
        res = read_half.read(&mut buf) => match res {
            Ok(0) => {
                debug!("Peer {} closed before sending a name", peer_addr);
                return;
            }
            Ok(n) => String::from_utf8_lossy(&buf[..n]).trim().to_string(),
            Err(e) => {
                debug!("Handshake read from {} failed: {}", peer_addr, e);
                return;
            }
        },
        _ = shutdown.changed() => return,
    };
    if name.is_empty() {
        debug!("Peer {} sent an empty name, closing", peer_addr);
        return;
    }

    let (msg_tx, msg_rx) = mpsc::channel(WRITE_CHANNEL_SIZE);
    let mut writer = tokio::spawn(write_loop(write_half, msg_rx));

    if let Err(e) = registry.register(conn_id, name.clone(), msg_tx) {
        // Fresh UUID per accept, so this is a handler-flow bug
        error!("Failed to register {} from {}: {}", name, peer_addr, e);
        return;
    }
    info!("{} has joined the chat from {}", name, peer_addr);
    broadcaster
        .broadcast(&Message::Join { name: name.clone() }, Some(conn_id))
        .await;

    // Relay loop
    let mut writer_done = false;
    let mut announce_leave = true;
    loop {
        tokio::select! {
            res = read_half.read(&mut buf) => match res {
                Ok(0) => {
                    debug!("{} closed the connection", name);
                    break;
                }
                Ok(n) => {
                    let raw = String::from_utf8_lossy(&buf[..n]).into_owned();
                    match Message::decode(&raw) {
                        Ok(Message::Chat { sender, body }) => {
                            broadcaster
                                .broadcast(&Message::Chat { sender, body }, Some(conn_id))
                                .await;
                        }
                        Ok(Message::Disconnect) => {
                            debug!("{} sent disconnect notice", name);
                            break;
                        }
                        Ok(other) => {
                            // Server-originated kinds have no business arriving here
                            debug!("Ignoring unexpected frame from {}: {:?}", name, other);
                        }
                        Err(e) => {
                            warn!("Dropping frame from {}: {}", name, e);
                        }
                    }
                }
                Err(e) => {
                    debug!("Read from {} failed, treating as disconnect: {}", name, e);
                    break;
                }
            },
            _ = shutdown.changed() => {
                debug!("Shutdown signalled, closing connection for {}", name);
                announce_leave = false;
                break;
            }
            _ = &mut writer => {
                writer_done = true;
                debug!("Writer for {} ended, closing connection", name);
                break;
            }
        }
    }

    // Teardown: announce the leave only if we were still registered.
    // NotFound means the broadcaster or server stop removed us already.
    if let Ok(name) = registry.unregister(conn_id) {
        info!("{} has left the chat", name);
        if announce_leave {
            broadcaster
                .broadcast(&Message::Leave { name }, Some(conn_id))
                .await;
        }
    }

    if !writer_done {
        // The registry entry held the only sender; dropping it lets the
        // writer drain any queued frames and exit on its own.
        drop(read_half);
        let _ = writer.await;
    }
}

/// Writer task: drains the outbound channel onto the socket
///
/// Ends when all senders are dropped, on a write error, or after writing
/// the shutdown token (the connection is being torn down either way).
async fn write_loop(mut write_half: OwnedWriteHalf, mut msg_rx: mpsc::Receiver<Message>) {
    while let Some(msg) = msg_rx.recv().await {
        let closing = matches!(msg, Message::Shutdown);
        if let Err(e) = write_half.write_all(msg.encode().as_bytes()).await {
            debug!("Socket write failed, ending writer: {}", e);
            break;
        }
        if closing {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
