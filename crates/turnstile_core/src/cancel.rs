//! # Cancellation Tokens
//!
//! A [`CancellationToken`] lets a caller abandon a request that is still
//! waiting for admission. Clones share the same state, so one clone can be
//! handed to the waiting thread and another kept by whoever decides to give
//! up.
//!
//! ## Wakeup Protocol
//!
//! ```text
//!   waiter                                canceller
//!   ──────                                ─────────
//!   register waker on token
//!   lock monitor
//!   loop {
//!     admitted?  -> done
//!     cancelled? -> dequeue, Err  <────┐  set flag
//!     wait on condvar                  │  take registered wakers
//!   }                                  └─ each waker: lock monitor, notify
//! ```
//!
//! The waker takes the monitor lock before notifying, so a waiter that has
//! checked the flag but not yet parked cannot miss the wakeup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Callback run when the token is cancelled.
pub(crate) type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Wakers {
    next_key: u64,
    entries: Vec<(u64, Waker)>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    wakers: Mutex<Wakers>,
}

/// Shared flag that abandons waiting monitor requests.
///
/// Cancelling has no effect on access that was already granted.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every request waiting on it.
    ///
    /// Cancelling twice is a no-op.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        // Run wakers outside the token lock; each one takes a monitor lock.
        let wakers: Vec<Waker> = {
            let mut wakers = self.inner.wakers.lock();
            wakers.entries.drain(..).map(|(_, waker)| waker).collect()
        };
        for waker in wakers {
            waker();
        }
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Registers `waker` until the returned registration is dropped.
    pub(crate) fn register(&self, waker: Waker) -> Registration<'_> {
        let mut wakers = self.inner.wakers.lock();
        let key = wakers.next_key;
        wakers.next_key += 1;
        wakers.entries.push((key, waker));
        Registration { token: self, key }
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner.wakers.lock().entries.len()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Keeps a waker registered on a token.
pub(crate) struct Registration<'a> {
    token: &'a CancellationToken,
    key: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut wakers = self.token.inner.wakers.lock();
        wakers.entries.retain(|(key, _)| *key != self.key);
    }
}
