//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → accept loop stops, listener dropped
//!             → cancel_connections: cancel every in-flight connection,
//!               close the registry
//!
//! Fatal accept error → Shutdown::trigger → error propagated to main
//! ```
//!
//! # Design Decisions
//! - Shutdown is one-shot; repeated triggers are no-ops
//! - Connections are cancelled, not drained: each is already bounded by its
//!   deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
