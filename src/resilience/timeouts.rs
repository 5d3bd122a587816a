//! Deadline enforcement.
//!
//! # Responsibilities
//! - Race an operation against a deadline and a cancellation token
//! - Drop the losing operation, which closes whatever it owns
//!
//! # Design Decisions
//! - Uses Tokio's timer and `select!`; no per-platform cancellation wiring
//! - Cancellation is checked first, then the operation, then the deadline,
//!   so an already-cancelled connection never starts work

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// How a raced operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation finished first.
    Completed(T),
    /// The deadline fired first.
    TimedOut,
    /// The token was cancelled first.
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// Run `operation` until it completes, `deadline` elapses, or `token` is
/// cancelled, whichever happens first. The loser is dropped.
pub async fn race<F>(operation: F, deadline: Duration, token: &CancellationToken) -> Outcome<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Outcome::Cancelled,
        output = operation => Outcome::Completed(output),
        _ = tokio::time::sleep(deadline) => Outcome::TimedOut,
    }
}
