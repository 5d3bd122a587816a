//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limit)
//!     → server.rs (spawn task, register for cancellation)
//!     → connection.rs (TLS handshake, then one request/response)
//!     → Router → Handler
//!
//! Connection States:
//!     Accepted → Handshaking → ReadingRequest → Parsing → Routing
//!         → Handling → Committing → Closed
//!     (any state) → Cancelling → Closed   on deadline or shutdown
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Every connection carries its own cancellation token, held in the registry
//! - One deadline covers handshake, request and response together

pub mod connection;
pub mod listener;
pub mod registry;
pub mod server;
pub mod tls;

pub use connection::{Connection, ConnectionError, ConnectionId, ConnectionState};
pub use listener::{Listener, ListenerError};
pub use registry::ConnectionRegistry;
pub use server::{Server, ServerError};
pub use tls::{load_tls_config, TlsDetails, TlsError, TlsIntrospect};
