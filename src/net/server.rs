//! Accept loop.
//!
//! # Responsibilities
//! - Own the listener, TLS acceptor, router and connection registry
//! - Spawn one task per accepted connection
//! - Reap finished tasks and surface panics
//! - On shutdown: stop accepting, cancel in-flight connections, drain tasks

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tokio_rustls::TlsAcceptor;

use crate::config::ServerConfig;
use crate::lifecycle::Shutdown;
use crate::net::connection::Connection;
use crate::net::listener::{Listener, ListenerError};
use crate::net::registry::ConnectionRegistry;
use crate::routing::Router;

/// Error type for the server as a whole.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A bound Gemini server.
pub struct Server {
    listener: Listener,
    acceptor: TlsAcceptor,
    router: Arc<Router>,
    registry: ConnectionRegistry,
    shutdown: Shutdown,
    deadline: Duration,
}

impl Server {
    /// Bind the listener described by `config`.
    pub async fn bind(
        config: &ServerConfig,
        tls: Arc<rustls::ServerConfig>,
        router: Router,
    ) -> Result<Self, ServerError> {
        let listener = Listener::bind(&config.listener).await?;
        let registry = ConnectionRegistry::new();
        let shutdown = Shutdown::new(registry.clone());

        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(tls),
            router: Arc::new(router),
            registry,
            shutdown,
            deadline: Duration::from_secs(config.timeouts.request_secs),
        })
    }

    /// Override the per-connection deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::LocalAddr)
    }

    /// A handle that stops `run` when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Connections currently in flight.
    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    /// Accept connections until shutdown or a fatal accept error.
    pub async fn run(self) -> Result<(), ServerError> {
        let Server {
            listener,
            acceptor,
            router,
            registry,
            shutdown,
            deadline,
        } = self;

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, routes = router.len(), "Server accepting connections");
        }

        let mut tasks = JoinSet::new();
        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.triggered() => break Ok(()),

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => reap(joined),

                accepted = listener.accept() => match accepted {
                    Ok((tcp, peer_addr, permit)) => {
                        let connection = Connection::new(Arc::clone(&router), deadline)
                            .with_peer_addr(peer_addr);
                        let entry = registry.register(connection.id(), connection.token().clone());
                        let acceptor = acceptor.clone();
                        tasks.spawn(async move {
                            let _entry = entry;
                            let _permit = permit;
                            connection.serve(tcp, acceptor).await;
                        });
                    }
                    Err(e) if e.is_transient() => {
                        tracing::debug!(error = %e, "Accept failed for one connection");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept failed, stopping server");
                        break Err(ServerError::from(e));
                    }
                },
            }
        };

        drop(listener);
        shutdown.trigger();
        shutdown.cancel_connections();

        let in_flight = tasks.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Draining connections");
        }
        while let Some(joined) = tasks.join_next().await {
            reap(joined);
        }

        tracing::info!("Server stopped");
        result
    }
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Connection task panicked");
        } else {
            tracing::debug!(error = %e, "Connection task aborted");
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("router", &self.router)
            .field("in_flight", &self.registry.len())
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
