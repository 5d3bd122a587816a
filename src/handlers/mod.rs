//! Bundled request handlers.
//!
//! Handlers plug into the router through the
//! [`Handler`](crate::protocol::Handler) contract; nothing here is known to
//! the connection state machine.

pub mod static_files;

pub use static_files::StaticFiles;
