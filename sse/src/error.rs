//! Error types for the `sse` crate.
use std::error::Error as StdError;
use std::fmt;

/// Reasons a publish can be refused by the broadcaster.
///
/// Both variants are reported synchronously to the caller and neither is retried.
/// A refused message never reaches any subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The intake queue is at capacity; the message was rejected.
    IntakeFull,
    /// The broadcaster has been shut down and no longer accepts messages.
    Closed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IntakeFull => write!(f, "broadcast intake queue is full"),
            Error::Closed => write!(f, "broadcaster is shut down"),
        }
    }
}

impl StdError for Error {}
