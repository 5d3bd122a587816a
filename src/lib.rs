//! Gemini protocol server library.
//!
//! A request is a single absolute `gemini://` URI terminated by CRLF; the
//! response is a two-digit status, a meta line and, for `2x`, a body. Each
//! TLS connection carries exactly one exchange.

pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod resilience;
pub mod routing;
pub mod uri;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use net::Server;
pub use protocol::{Handler, Request, Response, Status};
pub use routing::Router;
pub use uri::Uri;
