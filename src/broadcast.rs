//! Message fan-out
//!
//! Sends a message to every registered connection, optionally excluding
//! the sender. Works from a registry snapshot so the lock is never held
//! during sends and a slow peer cannot stall registration or delivery to
//! other peers.

use std::sync::Arc;

use tracing::warn;

use crate::message::Message;
use crate::registry::ClientRegistry;
use crate::types::ConnectionId;

/// Fans messages out to all registered connections
///
/// Cheap to clone; every handler and the server lifecycle hold one.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Send `message` to every registered connection except `exclude`
    ///
    /// Best-effort, at-most-once: recipients are fixed by a snapshot, so
    /// clients registering afterwards are not guaranteed this message.
    /// A failed send means the target's writer task is gone; the target
    /// is unregistered as a side effect and the drop is logged. Failures
    /// never propagate to the caller.
    pub async fn broadcast(&self, message: &Message, exclude: Option<ConnectionId>) {
        for (id, entry) in self.registry.snapshot() {
            if Some(id) == exclude {
                continue;
            }
            if entry.sender.send(message.clone()).await.is_err() {
                // Unregister the dead peer unless its handler beat us to it
                if self.registry.unregister(id).is_ok() {
                    warn!("Lost connection with {} ({}), removed from registry", entry.name, id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::mpsc;

    fn setup() -> (Arc<ClientRegistry>, Broadcaster) {
        let registry = Arc::new(ClientRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());
        (registry, broadcaster)
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let (registry, broadcaster) = setup();

        let alice = ConnectionId::new();
        let (alice_tx, mut alice_rx) = mpsc::channel(8);
        registry.register(alice, "Alice".to_string(), alice_tx).unwrap();

        let bob = ConnectionId::new();
        let (bob_tx, mut bob_rx) = mpsc::channel(8);
        registry.register(bob, "Bob".to_string(), bob_tx).unwrap();

        let msg = Message::Chat {
            sender: "Bob".to_string(),
            body: "hello".to_string(),
        };
        broadcaster.broadcast(&msg, Some(bob)).await;

        assert_eq!(alice_rx.recv().await.unwrap(), msg);
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_everyone() {
        let (registry, broadcaster) = setup();

        let mut receivers = Vec::new();
        for name in ["Alice", "Bob", "Carol"] {
            let (tx, rx) = mpsc::channel(8);
            registry.register(ConnectionId::new(), name.to_string(), tx).unwrap();
            receivers.push(rx);
        }

        broadcaster.broadcast(&Message::Shutdown, None).await;

        for rx in &mut receivers {
            assert_eq!(rx.recv().await.unwrap(), Message::Shutdown);
        }
    }

    #[tokio::test]
    async fn test_dead_peer_is_removed_and_others_still_receive() {
        let (registry, broadcaster) = setup();

        let dead = ConnectionId::new();
        let (dead_tx, dead_rx) = mpsc::channel(8);
        drop(dead_rx); // writer task gone
        registry.register(dead, "Ghost".to_string(), dead_tx).unwrap();

        let alive = ConnectionId::new();
        let (alive_tx, mut alive_rx) = mpsc::channel(8);
        registry.register(alive, "Alice".to_string(), alive_tx).unwrap();

        let msg = Message::System("still here".to_string());
        broadcaster.broadcast(&msg, None).await;

        assert_eq!(alive_rx.recv().await.unwrap(), msg);
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(dead).is_err());
    }
}
