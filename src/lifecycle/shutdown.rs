//! Shutdown coordination for the server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::net::registry::ConnectionRegistry;

/// One-shot shutdown trigger.
///
/// Cloning shares the same trigger. The first `trigger` stops the accept loop.
/// The loop drops the listening socket and only then calls
/// `cancel_connections`, which cancels every registered connection and
/// closes the registry. Later triggers do nothing.
#[derive(Debug, Clone)]
pub struct Shutdown {
    fired: Arc<AtomicBool>,
    accept: CancellationToken,
    connections: ConnectionRegistry,
}

impl Shutdown {
    /// Create a shutdown coordinator for `connections`.
    pub fn new(connections: ConnectionRegistry) -> Self {
        Self {
            fired: Arc::new(AtomicBool::new(false)),
            accept: CancellationToken::new(),
            connections,
        }
    }

    /// Trigger the shutdown. Returns false if it had already fired.
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::info!(in_flight = self.connections.len(), "Shutting down");
        self.accept.cancel();
        true
    }

    /// Cancel every in-flight connection and refuse late registrations.
    /// Returns how many were cancelled.
    pub fn cancel_connections(&self) -> usize {
        let cancelled = self.connections.cancel_all();
        if cancelled > 0 {
            tracing::info!(cancelled, "In-flight connections cancelled");
        }
        cancelled
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves once the shutdown has been triggered.
    pub async fn triggered(&self) {
        self.accept.cancelled().await
    }
}
