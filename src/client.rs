//! Headless relay client
//!
//! Connects to a relay server, performs the name handshake, and turns
//! inbound frames into display events. The actual display surface and
//! the name prompt stay outside this crate: the embedding process drains
//! the event channel and renders lines however it likes.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::RelayError;
use crate::message::Message;

/// Read buffer size, mirroring the server side
const READ_BUFFER_SIZE: usize = 1024;

/// Capacity of the event channel handed to the display surface
const EVENT_CHANNEL_SIZE: usize = 64;

/// Rendering hint attached to a display line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTag {
    System,
    Join,
    Leave,
    Error,
    You,
    None,
}

/// Connection status shown as a label by the display surface
///
/// `Connected`/`Disconnected` describe a client's link; `Online`/`Offline`
/// are the labels an operator surface shows for the server itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Online,
    Offline,
}

/// Event delivered to the display surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A formatted line to append to the scrollback
    Line { text: String, tag: DisplayTag },
    /// A status transition to show as a label
    Status(ConnectionStatus),
}

/// A connected relay client
///
/// Holds the write half of the connection; a spawned receive task owns
/// the read half and feeds the event channel until the stream ends.
/// There is no automatic reconnect: once disconnected, the embedding
/// process must create a fresh client.
#[derive(Debug)]
pub struct RelayClient {
    name: String,
    write_half: OwnedWriteHalf,
    events_tx: mpsc::Sender<ClientEvent>,
}

impl RelayClient {
    /// Connect and perform the name handshake
    ///
    /// `name` must be non-empty; prompting for it is the caller's job.
    /// Returns the client handle plus the receiver the display surface
    /// drains.
    pub async fn connect(
        addr: &str,
        name: &str,
    ) -> Result<(Self, mpsc::Receiver<ClientEvent>), RelayError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, mut write_half) = stream.into_split();

        // Handshake: the raw name, unframed
        write_half.write_all(name.as_bytes()).await?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let _ = events_tx.send(ClientEvent::Status(ConnectionStatus::Connected)).await;
        let _ = events_tx
            .send(ClientEvent::Line {
                text: "Connected to server".to_string(),
                tag: DisplayTag::System,
            })
            .await;

        tokio::spawn(receive_loop(read_half, events_tx.clone()));

        Ok((
            Self {
                name: name.to_string(),
                write_half,
                events_tx,
            },
            events_rx,
        ))
    }

    /// Display name supplied at handshake
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send a chat message and echo it locally with the `You` tag
    pub async fn send_chat(&mut self, body: &str) -> Result<(), RelayError> {
        let frame = Message::Chat {
            sender: self.name.clone(),
            body: body.to_string(),
        }
        .encode();
        self.write_half.write_all(frame.as_bytes()).await?;

        let _ = self.events_tx
            .send(ClientEvent::Line {
                text: format!("You: {}", body),
                tag: DisplayTag::You,
            })
            .await;
        Ok(())
    }

    /// Leave gracefully: best-effort disconnect notice, then close
    ///
    /// The receive task reports the resulting `Disconnected` status once
    /// the server closes its side.
    pub async fn disconnect(mut self) {
        let _ = self.write_half
            .write_all(Message::Disconnect.encode().as_bytes())
            .await;
        let _ = self.write_half.shutdown().await;
    }
}

/// Receive task: classifies inbound frames into display events
///
/// Emits `Disconnected` exactly once, however the stream ends.
async fn receive_loop(mut read_half: OwnedReadHalf, events_tx: mpsc::Sender<ClientEvent>) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("Read failed, treating as disconnect: {}", e);
                break;
            }
        };
        let raw = String::from_utf8_lossy(&buf[..n]).into_owned();
        match Message::decode(&raw) {
            Ok(Message::Shutdown) => {
                let _ = events_tx
                    .send(ClientEvent::Line {
                        text: "Server has been shut down".to_string(),
                        tag: DisplayTag::System,
                    })
                    .await;
                break;
            }
            Ok(Message::System(text)) => {
                let _ = events_tx
                    .send(ClientEvent::Line {
                        text,
                        tag: DisplayTag::System,
                    })
                    .await;
            }
            Ok(Message::Chat { sender, body }) => {
                let _ = events_tx
                    .send(ClientEvent::Line {
                        text: format!("{}: {}", sender, body),
                        tag: DisplayTag::None,
                    })
                    .await;
            }
            Ok(other) => {
                debug!("Ignoring unexpected frame: {:?}", other);
            }
            Err(e) => {
                debug!("Dropping frame: {}", e);
            }
        }
    }
    let _ = events_tx
        .send(ClientEvent::Line {
            text: "Disconnected from server".to_string(),
            tag: DisplayTag::System,
        })
        .await;
    let _ = events_tx
        .send(ClientEvent::Status(ConnectionStatus::Disconnected))
        .await;
}
