//! Client registry
//!
//! Thread-safe mapping from an active connection to its display name and
//! outbound channel; the single source of truth for "who is connected."
//!
//! All access goes through one mutex, held only for the duration of the
//! map operation and never across an await. Broadcast callers take a
//! `snapshot()` and iterate a private copy, so concurrent registration or
//! removal never touches a collection being iterated.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::RelayError;
use crate::message::Message;
use crate::types::ConnectionId;

/// One registered connection: display name plus its outbound channel
///
/// The sender feeds the connection's writer task. Cloning is cheap; the
/// socket itself stays owned by the connection's tasks.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Display name supplied at handshake, immutable after registration
    pub name: String,
    /// Channel into the connection's writer task
    pub sender: mpsc::Sender<Message>,
}

/// Thread-safe registry of connected clients
#[derive(Debug, Default)]
pub struct ClientRegistry {
    inner: Mutex<HashMap<ConnectionId, RegistryEntry>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection under its display name
    ///
    /// Fails if the connection is already present. IDs are freshly
    /// generated per accept, so a collision indicates a bug in the
    /// handler flow rather than a runtime condition.
    pub fn register(
        &self,
        id: ConnectionId,
        name: String,
        sender: mpsc::Sender<Message>,
    ) -> Result<(), RelayError> {
        let mut clients = self.inner.lock();
        if clients.contains_key(&id) {
            return Err(RelayError::AlreadyRegistered(id));
        }
        clients.insert(id, RegistryEntry { name, sender });
        Ok(())
    }

    /// Remove a connection, returning its display name
    ///
    /// `NotFound` is expected when the broadcaster or server shutdown
    /// already removed the entry; callers treat it as "nothing to do."
    pub fn unregister(&self, id: ConnectionId) -> Result<String, RelayError> {
        self.inner
            .lock()
            .remove(&id)
            .map(|entry| entry.name)
            .ok_or(RelayError::NotFound(id))
    }

    /// Point-in-time copy of all registered connections
    ///
    /// Copied under the lock, then returned; the caller iterates its own
    /// copy while registrations and removals proceed concurrently.
    pub fn snapshot(&self) -> Vec<(ConnectionId, RegistryEntry)> {
        self.inner
            .lock()
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }

    /// Remove every entry (server shutdown)
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_channel() -> mpsc::Sender<Message> {
        let (tx, _rx) = mpsc::channel(8);
        tx
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = ClientRegistry::new();
        let id = ConnectionId::new();

        registry.register(id, "Alice".to_string(), entry_channel()).unwrap();
        assert_eq!(registry.len(), 1);

        let name = registry.unregister(id).unwrap();
        assert_eq!(name, "Alice");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_register_fails() {
        let registry = ClientRegistry::new();
        let id = ConnectionId::new();

        registry.register(id, "Alice".to_string(), entry_channel()).unwrap();
        let err = registry.register(id, "Alice2".to_string(), entry_channel());
        assert!(matches!(err, Err(RelayError::AlreadyRegistered(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_missing_is_not_found() {
        let registry = ClientRegistry::new();
        let err = registry.unregister(ConnectionId::new());
        assert!(matches!(err, Err(RelayError::NotFound(_))));
    }

    #[test]
    fn test_snapshot_is_stable_under_mutation() {
        let registry = ClientRegistry::new();
        let alice = ConnectionId::new();
        registry.register(alice, "Alice".to_string(), entry_channel()).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);

        // Registrations after the snapshot do not appear in it
        let bob = ConnectionId::new();
        registry.register(bob, "Bob".to_string(), entry_channel()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1.name, "Alice");

        // Removing an entry mid-iteration leaves the snapshot intact
        for (id, entry) in &snapshot {
            registry.unregister(*id).unwrap();
            assert_eq!(entry.name, "Alice");
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear() {
        let registry = ClientRegistry::new();
        registry
            .register(ConnectionId::new(), "Alice".to_string(), entry_channel())
            .unwrap();
        registry
            .register(ConnectionId::new(), "Bob".to_string(), entry_channel())
            .unwrap();

        registry.clear();
        assert!(registry.is_empty());
    }
}
