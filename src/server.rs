//! Server lifecycle controller
//!
//! Owns the listening socket, the accept loop, and the running/stopped
//! state. `start` binds and spawns the accept loop; `stop` notifies every
//! client with the shutdown token, cancels the accept loop and all
//! handlers, and clears the registry.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::error::RelayError;
use crate::handler::handle_connection;
use crate::message::Message;
use crate::registry::ClientRegistry;

/// The relay server
///
/// `start` and `stop` may be called from any task; the lifecycle state
/// sits behind its own lock while the registry is shared with handlers.
#[derive(Debug)]
pub struct RelayServer {
    registry: Arc<ClientRegistry>,
    broadcaster: Broadcaster,
    state: Mutex<ServerState>,
}

/// Lifecycle state: `Stopping` exists only transiently inside `stop`
#[derive(Debug)]
enum ServerState {
    Stopped,
    Listening(Listening),
}

#[derive(Debug)]
struct Listening {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl RelayServer {
    pub fn new() -> Self {
        let registry = Arc::new(ClientRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());
        Self {
            registry,
            broadcaster,
            state: Mutex::new(ServerState::Stopped),
        }
    }

    /// Shared registry handle, for inspection by the embedding process
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Whether the server currently accepts connections
    pub async fn is_listening(&self) -> bool {
        matches!(*self.state.lock().await, ServerState::Listening(_))
    }

    /// Bind the listening socket and begin accepting connections
    ///
    /// Returns the bound local address (useful when binding port 0).
    /// Fails with `BindError` if the address is unavailable, leaving the
    /// server stopped. Calling while already listening is a logged no-op
    /// that returns the existing address.
    pub async fn start(&self, addr: &str) -> Result<SocketAddr, RelayError> {
        let mut state = self.state.lock().await;
        if let ServerState::Listening(listening) = &*state {
            debug!("start() called while already listening on {}", listening.local_addr);
            return Ok(listening.local_addr);
        }

        let listener = TcpListener::bind(addr).await.map_err(|source| RelayError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            self.registry.clone(),
            self.broadcaster.clone(),
            shutdown_rx,
        ));

        info!("Server started on {}", local_addr);
        *state = ServerState::Listening(Listening {
            local_addr,
            shutdown: shutdown_tx,
            accept_task,
        });
        Ok(local_addr)
    }

    /// Shut the server down
    ///
    /// Best-effort sends the shutdown token to every registered client,
    /// then cancels the accept loop and all handlers and clears the
    /// registry. Idempotent: a no-op when already stopped.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let ServerState::Listening(listening) =
            std::mem::replace(&mut *state, ServerState::Stopped)
        else {
            return;
        };
        info!("Stopping server on {}", listening.local_addr);

        // Queue the shutdown token to every client before anything closes;
        // failures are ignored, the connection is being torn down anyway
        for (_id, entry) in self.registry.snapshot() {
            let _ = entry.sender.send(Message::Shutdown).await;
        }

        // Cancels the accept loop and every handler's blocking read
        let _ = listening.shutdown.send(true);
        let _ = listening.accept_task.await;

        self.registry.clear();
        info!("Server has been stopped");
    }
}

impl Default for RelayServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept loop: one handler task per accepted connection
///
/// Accept errors are reported and the loop keeps waiting; the shutdown
/// signal exits it cleanly.
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    broadcaster: Broadcaster,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            res = listener.accept() => match res {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    tokio::spawn(handle_connection(
                        stream,
                        registry.clone(),
                        broadcaster.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                }
            },
            _ = shutdown.changed() => {
                debug!("Accept loop exiting");
                break;
            }
        }
    }
}
