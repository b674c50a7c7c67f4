//! # Monitor Error Types
//!
//! All errors that can occur while entering or leaving the monitor.
//! Both variants leave the monitor's counters exactly as they were.

use thiserror::Error;

use crate::actor::{ActorId, ActorKind};

/// Why a waiting request was abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// The request's [`CancellationToken`](crate::CancellationToken) fired.
    Token,
    /// The request's deadline passed before admission.
    TimedOut,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token => f.write_str("cancelled by token"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Errors that can occur in the monitor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// Stop without a matching start, a repeated stop, or a start for an id
    /// that is already waiting or active.
    #[error("invalid state for {kind} {id}: {reason}")]
    InvalidState {
        /// Kind of the offending actor.
        kind: ActorKind,
        /// Id of the offending actor.
        id: ActorId,
        /// What was wrong.
        reason: &'static str,
    },

    /// A waiting request was abandoned before it was admitted.
    #[error("{kind} {id} {reason} before admission")]
    Cancelled {
        /// Kind of the abandoned request.
        kind: ActorKind,
        /// Id of the abandoned request.
        id: ActorId,
        /// What abandoned it.
        reason: CancelReason,
    },
}

impl MonitorError {
    /// Returns true if this error is a cancellation (token or deadline).
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MonitorError::InvalidState {
            kind: ActorKind::Reader,
            id: ActorId(3),
            reason: "not an active reader",
        };
        assert_eq!(err.to_string(), "invalid state for Reader 3: not an active reader");

        let err = MonitorError::Cancelled {
            kind: ActorKind::Writer,
            id: ActorId(7),
            reason: CancelReason::TimedOut,
        };
        assert_eq!(err.to_string(), "Writer 7 timed out before admission");
        assert!(err.is_cancelled());
    }
}
