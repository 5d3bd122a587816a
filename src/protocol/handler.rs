//! The contract between the server and request handlers.

use async_trait::async_trait;

use crate::protocol::request::Request;
use crate::protocol::response::Response;

/// Error a handler may raise. The connection logs it and closes.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), HandlerError>;

/// Serves requests routed to a prefix.
///
/// A handler sets the status with [`Response::header`] and must commit it
/// (`flush`, or implicitly through `write_body`) before writing body bytes.
/// Anything left uncommitted is committed by the connection after `handle`
/// returns `Ok`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &Request<'_>, response: &mut Response<'_>) -> HandlerResult;
}
