//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (normalised UriPath)
//!     → router.rs (exact lookup, then predecessor walk)
//!     → matcher.rs (segment-wise containment, path_info)
//!     → Return: RouteMatch { prefix, handler, path_info } or None
//!
//! Route table (at startup):
//!     RouteConfig[] → normalise prefixes → BTreeMap (segment order) → Arc<Router>
//! ```
//!
//! # Design Decisions
//! - Routes built at startup, immutable at runtime
//! - Longest containing prefix wins
//! - Deterministic: same path always matches same route

pub mod matcher;
pub mod router;

pub use router::{RouteMatch, Router};
