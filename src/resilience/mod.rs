//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connection task:
//!     → timeouts.rs race(drive connection, deadline, cancel token)
//!     → Completed | TimedOut | Cancelled
//!     → loser dropped (transport closed)
//! ```
//!
//! # Design Decisions
//! - Every connection is bounded by one deadline covering all its I/O
//! - Cancellation and deadline share one combinator

pub mod timeouts;

pub use timeouts::{race, Outcome};
