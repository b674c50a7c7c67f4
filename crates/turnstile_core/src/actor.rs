//! # Actors
//!
//! Readers and writers are identified by an [`ActorKind`] plus an
//! [`ActorId`]. Ids are used for reporting and for detecting misuse
//! (double stops, stopping a session that never started); they play no part
//! in mutual exclusion.
//!
//! ```text
//!   Idle ──start──> Waiting ──admitted──> Active ──stop──> Idle
//!                      │
//!                      └──cancelled / timed out──> Idle
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Kind of access an actor requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActorKind {
    /// Shared, non-exclusive access.
    Reader,
    /// Exclusive access.
    Writer,
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reader => f.write_str("Reader"),
            Self::Writer => f.write_str("Writer"),
        }
    }
}

/// Identifier of a reader or writer session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ActorId {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Status reported to observers for a single actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorStatus {
    /// Queued, not yet admitted.
    Waiting,
    /// Admitted as a reader.
    Reading,
    /// Admitted as the writer.
    Writing,
    /// Left the critical section.
    Stopped,
    /// Gave up while waiting.
    Cancelled,
}

impl ActorStatus {
    /// Status an actor of `kind` has once admitted.
    #[inline]
    #[must_use]
    pub const fn active(kind: ActorKind) -> Self {
        match kind {
            ActorKind::Reader => Self::Reading,
            ActorKind::Writer => Self::Writing,
        }
    }

    /// Returns true for `Reading` and `Writing`.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Reading | Self::Writing)
    }
}

impl std::fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Waiting => "Waiting",
            Self::Reading => "Reading",
            Self::Writing => "Writing",
            Self::Stopped => "Stopped",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(text)
    }
}

/// Per-kind id counters. Ids start at 1 and saturate at `u64::MAX`; they
/// never wrap back to an id that was already issued.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    readers: AtomicU64,
    writers: AtomicU64,
}

impl IdAllocator {
    pub(crate) const fn new() -> Self {
        Self {
            readers: AtomicU64::new(1),
            writers: AtomicU64::new(1),
        }
    }

    #[cfg(test)]
    const fn starting_at(first: u64) -> Self {
        Self {
            readers: AtomicU64::new(first),
            writers: AtomicU64::new(first),
        }
    }

    pub(crate) fn next(&self, kind: ActorKind) -> ActorId {
        let counter = match kind {
            ActorKind::Reader => &self.readers,
            ActorKind::Writer => &self.writers,
        };
        let issued = counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| Some(id.saturating_add(1)))
            .unwrap_or_else(|id| id);
        ActorId(issued)
    }
}
