//! Registry of in-flight connections.
//!
//! # Responsibilities
//! - Map each live connection to its cancellation token
//! - Cancel every registered connection on shutdown
//!
//! # Design Decisions
//! - `register` and `deregister` are the only per-connection mutations;
//!   deregistration runs from the entry guard's `Drop`, so a panicking
//!   connection task still leaves the registry
//! - Once `cancel_all` has run the registry is closed: late registrations are
//!   cancelled on arrival instead of leaking past shutdown

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::net::connection::ConnectionId;

#[derive(Debug, Default)]
struct Inner {
    connections: HashMap<ConnectionId, CancellationToken>,
    closed: bool,
}

/// Shared set of in-flight connections, keyed by connection ID.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Entries stay consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a connection. Dropping the returned entry deregisters it.
    pub fn register(&self, id: ConnectionId, token: CancellationToken) -> RegistryEntry {
        let mut inner = self.lock();
        if inner.closed {
            token.cancel();
        } else {
            inner.connections.insert(id, token);
        }
        RegistryEntry {
            registry: self.clone(),
            id,
        }
    }

    /// Remove a connection. Returns false if it was not registered.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        self.lock().connections.remove(&id).is_some()
    }

    /// Cancel every registered connection, clear the set and close the
    /// registry. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;
        let drained: Vec<_> = inner.connections.drain().collect();
        drop(inner);

        for (id, token) in &drained {
            tracing::debug!(connection_id = %id, "Cancelling connection");
            token.cancel();
        }
        drained.len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration of one connection; deregisters on drop.
#[derive(Debug)]
pub struct RegistryEntry {
    registry: ConnectionRegistry,
    id: ConnectionId,
}

impl RegistryEntry {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for RegistryEntry {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
        tracing::trace!(connection_id = %self.id, "Connection deregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_deregister_on_drop() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());

        let first = registry.register(ConnectionId::new(), CancellationToken::new());
        let second = registry.register(ConnectionId::new(), CancellationToken::new());
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(first.id()));

        drop(first);
        assert_eq!(registry.len(), 1);
        drop(second);
        assert!(registry.is_empty());
    }

    #[test]
    fn cancel_all_cancels_and_clears() {
        let registry = ConnectionRegistry::new();
        let tokens: Vec<_> = (0..3).map(|_| CancellationToken::new()).collect();
        let entries: Vec<_> = tokens
            .iter()
            .map(|token| registry.register(ConnectionId::new(), token.clone()))
            .collect();

        assert_eq!(registry.cancel_all(), 3);
        assert!(registry.is_empty());
        assert!(tokens.iter().all(CancellationToken::is_cancelled));

        // Dropping after the clear is harmless.
        drop(entries);
        assert!(registry.is_empty());
    }

    #[test]
    fn late_registration_is_cancelled() {
        let registry = ConnectionRegistry::new();
        registry.cancel_all();

        let token = CancellationToken::new();
        let entry = registry.register(ConnectionId::new(), token.clone());
        assert!(token.is_cancelled());
        assert!(!registry.contains(entry.id()));
    }
}
