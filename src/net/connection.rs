//! Connection state machine.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Drive one connection: handshake, read, parse, route, handle, commit
//! - Bound the whole exchange by a deadline and a cancellation token
//! - Log every state transition and the final outcome

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::net::tls::TlsDetails;
use crate::protocol::request::{parse_request_line, read_request_line};
use crate::protocol::{
    HandlerError, Request, RequestError, Response, Status, Transport, MAX_REQUEST_BYTES,
};
use crate::resilience::{race, Outcome};
use crate::routing::Router;

/// Relaxed ordering is enough: IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a connection is in its single request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    Handshaking,
    ReadingRequest,
    Parsing,
    Routing,
    Handling,
    Committing,
    /// Deadline or shutdown won the race; the exchange is being dropped.
    Cancelling,
    Closed,
}

/// Why an exchange ended without a committed response.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),
    #[error("failed to read request: {0}")]
    Read(#[source] RequestError),
    #[error("failed to send response: {0}")]
    Write(#[source] std::io::Error),
    #[error("handler failed: {0}")]
    Handler(HandlerError),
}

/// What `serve` reports back to the accept loop.
pub type ServeOutcome = Outcome<Result<Status, ConnectionError>>;

/// One accepted client.
pub struct Connection {
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    state: ConnectionState,
    deadline: Duration,
    token: CancellationToken,
    router: Arc<Router>,
}

impl Connection {
    pub fn new(router: Arc<Router>, deadline: Duration) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr: None,
            state: ConnectionState::Accepted,
            deadline,
            token: CancellationToken::new(),
            router,
        }
    }

    pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Cancelling this token abandons the exchange at its next await point.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn transition(&mut self, next: ConnectionState) {
        tracing::trace!(
            connection_id = %self.id,
            from = ?self.state,
            to = ?next,
            "Connection state changed"
        );
        self.state = next;
    }

    /// Handshake and serve a freshly accepted TCP stream.
    pub async fn serve(mut self, tcp: TcpStream, acceptor: TlsAcceptor) -> ServeOutcome {
        let token = self.token.clone();
        let deadline = self.deadline;
        let outcome = race(self.drive(tcp, &acceptor), deadline, &token).await;
        self.finish(outcome)
    }

    /// Serve a transport that is already past its handshake.
    pub async fn serve_stream<S: Transport>(mut self, stream: S, tls: TlsDetails) -> ServeOutcome {
        let token = self.token.clone();
        let deadline = self.deadline;
        let outcome = race(self.respond(stream, &tls), deadline, &token).await;
        self.finish(outcome)
    }

    async fn drive(&mut self, tcp: TcpStream, acceptor: &TlsAcceptor) -> Result<Status, ConnectionError> {
        self.transition(ConnectionState::Handshaking);
        let stream = acceptor.accept(tcp).await.map_err(ConnectionError::Handshake)?;
        let tls = TlsDetails::from_session(stream.get_ref().1);
        tracing::debug!(
            connection_id = %self.id,
            server_name = ?tls.server_name,
            "TLS handshake complete"
        );
        self.respond(stream, &tls).await
    }

    async fn respond<S: Transport>(&mut self, mut stream: S, tls: &TlsDetails) -> Result<Status, ConnectionError> {
        let result = self.exchange(&mut stream, tls).await;
        if let Err(e) = stream.shutdown().await {
            tracing::debug!(connection_id = %self.id, error = %e, "Close failed");
        }
        result
    }

    /// Run one request/response exchange over `stream`.
    ///
    /// Protocol errors are answered with `59`; an unrouted path with `51`.
    /// Transport errors while reading and handler errors return `Err` with
    /// nothing committed.
    pub async fn exchange<S: Transport>(
        &mut self,
        stream: &mut S,
        tls: &TlsDetails,
    ) -> Result<Status, ConnectionError> {
        self.transition(ConnectionState::ReadingRequest);
        let line = match read_request_line(stream, MAX_REQUEST_BYTES).await {
            Ok(line) => line,
            Err(e) if e.is_transport() => return Err(ConnectionError::Read(e)),
            Err(e) => return self.reject(stream, e).await,
        };

        self.transition(ConnectionState::Parsing);
        let uri = match parse_request_line(&line) {
            Ok(uri) => uri,
            Err(e) => return self.reject(stream, e).await,
        };

        self.transition(ConnectionState::Routing);
        let router = Arc::clone(&self.router);
        let mut response = Response::new(stream);
        match router.lookup(uri.path()) {
            Some(matched) => {
                self.transition(ConnectionState::Handling);
                let request = Request::new(&uri, &matched.path_info)
                    .with_server_name(tls.server_name.as_deref())
                    .with_peer_addr(self.peer_addr);
                matched
                    .handler
                    .handle(&request, &mut response)
                    .await
                    .map_err(ConnectionError::Handler)?;
            }
            None => {
                response.header(Status::NotFound, "Not found.");
            }
        }

        self.transition(ConnectionState::Committing);
        response.flush().await.map_err(ConnectionError::Write)?;

        tracing::info!(
            connection_id = %self.id,
            peer_addr = ?self.peer_addr,
            uri = %uri,
            status = %response.status(),
            meta = response.meta(),
            "Request served"
        );
        Ok(response.status())
    }

    async fn reject<S: Transport>(&mut self, stream: &mut S, error: RequestError) -> Result<Status, ConnectionError> {
        tracing::debug!(connection_id = %self.id, error = %error, "Rejecting request");
        self.transition(ConnectionState::Committing);
        let mut response = Response::new(stream);
        response.header(Status::BadRequest, error.meta());
        response.flush().await.map_err(ConnectionError::Write)?;
        Ok(Status::BadRequest)
    }

    fn finish(mut self, outcome: ServeOutcome) -> ServeOutcome {
        match &outcome {
            Outcome::Completed(Ok(_)) => {}
            Outcome::Completed(Err(ConnectionError::Handler(e))) => {
                tracing::error!(connection_id = %self.id, error = %e, "Handler failed");
            }
            Outcome::Completed(Err(e)) => {
                tracing::debug!(connection_id = %self.id, error = %e, "Connection ended without response");
            }
            Outcome::TimedOut => {
                self.transition(ConnectionState::Cancelling);
                tracing::warn!(
                    connection_id = %self.id,
                    peer_addr = ?self.peer_addr,
                    deadline = ?self.deadline,
                    "Connection deadline exceeded"
                );
            }
            Outcome::Cancelled => {
                self.transition(ConnectionState::Cancelling);
                tracing::debug!(connection_id = %self.id, "Connection cancelled");
            }
        }
        self.transition(ConnectionState::Closed);
        outcome
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
