//! Error types for Candela dispatch.

use std::fmt;

/// Errors raised while dispatching a signal.
///
/// Both variants are recoverable: they propagate out of the dispatch call
/// that hit them (`emit`, `flush`, `accumulate`), aborting the remainder of
/// that fan-out. There is no silent-skip mode - a dangling subscription is a
/// lifecycle bug upstream and should surface, not be masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalError {
    /// A slot was invoked but one of its tracked owners has been destroyed.
    ///
    /// The subscription should have been disconnected before its owner was
    /// dropped. Callers typically log this and remove the subscription.
    ExpiredSlot,
    /// An empty (unbound) thunk was invoked.
    ///
    /// Indicates a construction-order bug: a handle escaped before binding.
    BadThunk,
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpiredSlot => write!(f, "slot invoked after a tracked owner was destroyed"),
            Self::BadThunk => write!(f, "empty thunk invoked"),
        }
    }
}

impl std::error::Error for SignalError {}

/// A specialized Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, SignalError>;
