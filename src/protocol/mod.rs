//! Protocol subsystem: one request line in, one status line (plus an
//! optional body) out.
//!
//! # Data Flow
//! ```text
//! TLS stream
//!     → request.rs (read ≤1024 bytes + CRLF, parse, validate scheme/path)
//!     → [router picks handler, computes path_info]
//!     → handler.rs (Handler::handle(Request, Response))
//!     → response.rs (commit "<code> <meta>\r\n" once, then body)
//! ```
//!
//! # Design Decisions
//! - Parse and validation failures answer `59`; they never abort the connection
//! - Only transport errors end an exchange without a response
//! - Handlers see the raw transport through the response for body bytes

pub mod handler;
pub mod request;
pub mod response;
pub mod status;

pub use handler::{Handler, HandlerError, HandlerResult};
pub use request::{Request, RequestError, MAX_REQUEST_BYTES, SCHEME};
pub use response::{Response, Transport};
pub use status::{Category, Status};
