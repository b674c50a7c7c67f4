//! # Reader-Writer Monitor
//!
//! Many readers OR one writer, admitted in arrival order.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────────────────────┐
//!                 │         ReaderWriterMonitor          │
//!                 │                                      │
//!                 │  Mutex<MonitorState>                 │
//!                 │   ├─ readers: {ids}                  │
//!                 │   ├─ writer:  Option<id>             │
//!                 │   └─ queue:   [R R W R W ...] (FIFO) │
//!                 │                                      │
//!                 │  Condvar readable   Condvar writable │
//!                 │                                      │
//!                 │  Mutex<WaitStats>   (own lock)       │
//!                 └──────────────────┬───────────────────┘
//!                                    │ after unlock
//!                                    ▼
//!                               dyn Notifier
//! ```
//!
//! ## Admission
//!
//! A request is admitted when it is compatible with the current holders and
//! it is its turn in the request queue. Waiters re-check both
//! conditions after every wakeup, so spurious wakeups are harmless. Every
//! state change that can make the head of the queue admissible (a release or
//! a cancellation) wakes the condition variable of the head's kind while the
//! lock is held, so no wakeup is lost.
//!
//! ## Misuse
//!
//! Stopping a session that is not active, stopping twice, or starting an id
//! that is already waiting or active returns [`MonitorError::InvalidState`]
//! and changes nothing.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::actor::{ActorId, ActorKind, ActorStatus, IdAllocator};
use crate::cancel::{CancellationToken, Waker};
use crate::config::MonitorConfig;
use crate::error::{CancelReason, MonitorError, MonitorResult};
use crate::notifier::{NoopNotifier, Notifier, Outbox};
use crate::queue::RequestQueue;
use crate::stats::{as_millis_u64, WaitStats, WaitSummary};

/// Point-in-time view of the monitor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorSnapshot {
    /// Readers inside the critical section.
    pub active_readers: usize,
    /// Whether a writer holds exclusive access.
    pub writer_active: bool,
    /// Queued reader requests.
    pub waiting_readers: usize,
    /// Queued writer requests.
    pub waiting_writers: usize,
}

/// Everything guarded by the monitor lock.
#[derive(Debug)]
struct MonitorState {
    readers: HashSet<ActorId>,
    writer: Option<ActorId>,
    queue: RequestQueue,
}

impl MonitorState {
    fn new() -> Self {
        Self {
            readers: HashSet::new(),
            writer: None,
            queue: RequestQueue::new(),
        }
    }

    /// Whether `(kind, id)` is already waiting or active.
    fn is_live(&self, kind: ActorKind, id: ActorId) -> bool {
        let active = match kind {
            ActorKind::Reader => self.readers.contains(&id),
            ActorKind::Writer => self.writer == Some(id),
        };
        active || self.queue.contains(kind, id)
    }

    /// Whether `kind` can share the resource with the current holders.
    fn compatible(&self, kind: ActorKind) -> bool {
        match kind {
            ActorKind::Reader => self.writer.is_none(),
            ActorKind::Writer => self.writer.is_none() && self.readers.is_empty(),
        }
    }

    fn can_admit(&self, kind: ActorKind, seq: u64) -> bool {
        self.compatible(kind) && self.queue.is_turn(seq)
    }

    fn admit(&mut self, kind: ActorKind, id: ActorId) {
        match kind {
            ActorKind::Reader => {
                self.readers.insert(id);
            }
            ActorKind::Writer => self.writer = Some(id),
        }
        debug_assert!(
            self.writer.is_none() || self.readers.is_empty(),
            "readers and a writer admitted together"
        );
    }

    fn counts(&self) -> (usize, usize) {
        (self.readers.len(), usize::from(self.writer.is_some()))
    }
}

/// Lock and condition variables, shared with cancellation wakers.
#[derive(Debug)]
struct Shared {
    state: Mutex<MonitorState>,
    readable: Condvar,
    writable: Condvar,
}

impl Shared {
    fn condvar(&self, kind: ActorKind) -> &Condvar {
        match kind {
            ActorKind::Reader => &self.readable,
            ActorKind::Writer => &self.writable,
        }
    }

    /// Wakes the waiters of the kind at the head of the queue.
    /// Called with the state lock held.
    fn wake_head(&self, state: &MonitorState) {
        if let Some(kind) = state.queue.head_kind() {
            self.condvar(kind).notify_all();
        }
    }
}

/// Fair reader-writer monitor.
///
/// All operations take `&self`; share the monitor between threads with an
/// [`Arc`].
///
/// ## Usage
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use std::thread;
/// use turnstile_core::{ActorKind, ReaderWriterMonitor};
///
/// let monitor = Arc::new(ReaderWriterMonitor::new());
///
/// let reader = {
///     let monitor = Arc::clone(&monitor);
///     thread::spawn(move || {
///         let id = monitor.next_actor_id(ActorKind::Reader);
///         monitor.start_read(id)?;
///         // ... read ...
///         monitor.stop_read(id)
///     })
/// };
///
/// let id = monitor.next_actor_id(ActorKind::Writer);
/// let session = monitor.write(id)?;
/// // ... write ...
/// drop(session);
///
/// reader.join().unwrap()?;
/// # Ok::<(), turnstile_core::MonitorError>(())
/// ```
pub struct ReaderWriterMonitor {
    shared: Arc<Shared>,
    stats: Mutex<WaitStats>,
    ids: IdAllocator,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
}

impl ReaderWriterMonitor {
    /// Creates a monitor with the default config and no observer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    /// Creates a monitor with `config` and no observer.
    #[must_use]
    pub fn with_config(config: MonitorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(MonitorState::new()),
                readable: Condvar::new(),
                writable: Condvar::new(),
            }),
            stats: Mutex::new(WaitStats::new(config.sample_window)),
            ids: IdAllocator::new(),
            notifier: Arc::new(NoopNotifier),
            config,
        }
    }

    /// Replaces the observer.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Returns the config the monitor was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Issues a fresh id for `kind`. Ids are unique per kind for the life of
    /// the monitor and start at 1.
    #[must_use]
    pub fn next_actor_id(&self, kind: ActorKind) -> ActorId {
        self.ids.next(kind)
    }

    // =========================================================================
    // Entry
    // =========================================================================

    /// Blocks until read access is granted. Returns the time spent waiting.
    ///
    /// # Errors
    ///
    /// [`MonitorError::InvalidState`] if `id` is already a waiting or active
    /// reader.
    pub fn start_read(&self, id: ActorId) -> MonitorResult<Duration> {
        self.acquire(ActorKind::Reader, id, None, None)
    }

    /// Like [`start_read`](Self::start_read), but gives up when `token` is
    /// cancelled before admission.
    ///
    /// # Errors
    ///
    /// [`MonitorError::Cancelled`] with [`CancelReason::Token`], or
    /// [`MonitorError::InvalidState`] as for `start_read`.
    pub fn start_read_with(&self, id: ActorId, token: &CancellationToken) -> MonitorResult<Duration> {
        self.acquire(ActorKind::Reader, id, Some(token), None)
    }

    /// Like [`start_read`](Self::start_read), but gives up after `timeout`.
    /// A reader that can be admitted right away is admitted even with a zero
    /// timeout.
    ///
    /// # Errors
    ///
    /// [`MonitorError::Cancelled`] with [`CancelReason::TimedOut`], or
    /// [`MonitorError::InvalidState`] as for `start_read`.
    pub fn start_read_timeout(&self, id: ActorId, timeout: Duration) -> MonitorResult<Duration> {
        self.acquire(ActorKind::Reader, id, None, deadline_after(timeout))
    }

    /// Blocks until exclusive access is granted. Returns the time spent
    /// waiting.
    ///
    /// # Errors
    ///
    /// [`MonitorError::InvalidState`] if `id` is already the waiting or
    /// active writer.
    pub fn start_write(&self, id: ActorId) -> MonitorResult<Duration> {
        self.acquire(ActorKind::Writer, id, None, None)
    }

    /// Like [`start_write`](Self::start_write), but gives up when `token` is
    /// cancelled before admission.
    ///
    /// # Errors
    ///
    /// [`MonitorError::Cancelled`] with [`CancelReason::Token`], or
    /// [`MonitorError::InvalidState`] as for `start_write`.
    pub fn start_write_with(&self, id: ActorId, token: &CancellationToken) -> MonitorResult<Duration> {
        self.acquire(ActorKind::Writer, id, Some(token), None)
    }

    /// Like [`start_write`](Self::start_write), but gives up after `timeout`.
    /// A writer that can be admitted right away is admitted even with a zero
    /// timeout.
    ///
    /// # Errors
    ///
    /// [`MonitorError::Cancelled`] with [`CancelReason::TimedOut`], or
    /// [`MonitorError::InvalidState`] as for `start_write`.
    pub fn start_write_timeout(&self, id: ActorId, timeout: Duration) -> MonitorResult<Duration> {
        self.acquire(ActorKind::Writer, id, None, deadline_after(timeout))
    }

    /// Admits a reader only if it would be admitted immediately. Never
    /// queues. Returns `Ok(false)` when the reader would have to wait.
    ///
    /// # Errors
    ///
    /// [`MonitorError::InvalidState`] as for [`start_read`](Self::start_read).
    pub fn try_start_read(&self, id: ActorId) -> MonitorResult<bool> {
        self.try_acquire(ActorKind::Reader, id)
    }

    /// Admits a writer only if it would be admitted immediately. Never
    /// queues. Returns `Ok(false)` when the writer would have to wait.
    ///
    /// # Errors
    ///
    /// [`MonitorError::InvalidState`] as for [`start_write`](Self::start_write).
    pub fn try_start_write(&self, id: ActorId) -> MonitorResult<bool> {
        self.try_acquire(ActorKind::Writer, id)
    }

    /// Starts a read session that ends when the returned [`Session`] drops.
    ///
    /// # Errors
    ///
    /// As for [`start_read`](Self::start_read).
    pub fn read(&self, id: ActorId) -> MonitorResult<Session<'_>> {
        let waited = self.start_read(id)?;
        Ok(Session::new(self, ActorKind::Reader, id, waited))
    }

    /// Starts a write session that ends when the returned [`Session`] drops.
    ///
    /// # Errors
    ///
    /// As for [`start_write`](Self::start_write).
    pub fn write(&self, id: ActorId) -> MonitorResult<Session<'_>> {
        let waited = self.start_write(id)?;
        Ok(Session::new(self, ActorKind::Writer, id, waited))
    }

    // =========================================================================
    // Exit
    // =========================================================================

    /// Ends the read session of `id`. Wakes the next writer when the last
    /// reader leaves.
    ///
    /// # Errors
    ///
    /// [`MonitorError::InvalidState`] if `id` is not an active reader; the
    /// monitor is left unchanged.
    pub fn stop_read(&self, id: ActorId) -> MonitorResult<()> {
        self.release(ActorKind::Reader, id)
    }

    /// Ends the write session of `id` and wakes whoever is next in line.
    ///
    /// # Errors
    ///
    /// [`MonitorError::InvalidState`] if `id` is not the active writer; the
    /// monitor is left unchanged.
    pub fn stop_write(&self, id: ActorId) -> MonitorResult<()> {
        self.release(ActorKind::Writer, id)
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Consistent view of holders and waiters.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        let state = self.shared.state.lock();
        MonitorSnapshot {
            active_readers: state.readers.len(),
            writer_active: state.writer.is_some(),
            waiting_readers: state.queue.waiting(ActorKind::Reader),
            waiting_writers: state.queue.waiting(ActorKind::Writer),
        }
    }

    /// Mean reader admission wait, zero before the first admission.
    #[must_use]
    pub fn average_reader_wait(&self) -> Duration {
        self.stats.lock().average(ActorKind::Reader)
    }

    /// Mean writer admission wait, zero before the first admission.
    #[must_use]
    pub fn average_writer_wait(&self) -> Duration {
        self.stats.lock().average(ActorKind::Writer)
    }

    /// [`average_reader_wait`](Self::average_reader_wait) in whole
    /// milliseconds.
    #[must_use]
    pub fn average_reader_wait_ms(&self) -> u64 {
        as_millis_u64(self.average_reader_wait())
    }

    /// [`average_writer_wait`](Self::average_writer_wait) in whole
    /// milliseconds.
    #[must_use]
    pub fn average_writer_wait_ms(&self) -> u64 {
        as_millis_u64(self.average_writer_wait())
    }

    /// Count, average, max and recent samples for `kind`.
    #[must_use]
    pub fn wait_summary(&self, kind: ActorKind) -> WaitSummary {
        self.stats.lock().summary(kind)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn acquire(
        &self,
        kind: ActorKind,
        id: ActorId,
        token: Option<&CancellationToken>,
        deadline: Option<Instant>,
    ) -> MonitorResult<Duration> {
        let requested_at = Instant::now();
        // Registered before the state lock is taken; dropped after it is released.
        let registration = token.map(|token| token.register(self.cancel_waker()));

        let mut outbox = Outbox::new();
        let result = self.acquire_locked(kind, id, token, deadline, requested_at, &mut outbox);
        drop(registration);

        outbox.deliver(&*self.notifier);
        result
    }

    fn acquire_locked(
        &self,
        kind: ActorKind,
        id: ActorId,
        token: Option<&CancellationToken>,
        deadline: Option<Instant>,
        requested_at: Instant,
        outbox: &mut Outbox,
    ) -> MonitorResult<Duration> {
        let mut state = self.shared.state.lock();
        if state.is_live(kind, id) {
            tracing::warn!(%kind, %id, "start for an actor that is already waiting or active");
            return Err(MonitorError::InvalidState {
                kind,
                id,
                reason: "already waiting or active",
            });
        }
        // Only a token cancelled before the call is rejected up front. An
        // expired deadline still gets one admission check below.
        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(MonitorError::Cancelled {
                kind,
                id,
                reason: CancelReason::Token,
            });
        }

        let seq = state.queue.push(kind, id);
        let mut announced = false;

        loop {
            if state.can_admit(kind, seq) {
                state.queue.remove(seq);
                let waited = requested_at.elapsed();
                self.admitted(state, kind, id, waited, outbox);
                return Ok(waited);
            }

            if let Some(reason) = abandon_reason(token, deadline) {
                state.queue.remove(seq);
                self.shared.wake_head(&state);
                drop(state);

                tracing::debug!(%kind, %id, %reason, "request abandoned");
                outbox.status(kind, id, ActorStatus::Cancelled, Duration::ZERO);
                return Err(MonitorError::Cancelled { kind, id, reason });
            }

            if !announced {
                announced = true;
                if self.config.trace_admissions {
                    tracing::debug!(%kind, %id, queued = state.queue.len(), "waiting for admission");
                }
                // The observer may call back into the monitor, so it runs unlocked.
                // Admission is re-checked afterwards.
                let notifier = &*self.notifier;
                MutexGuard::unlocked(&mut state, || {
                    notifier.on_actor_status(kind, id, ActorStatus::Waiting, Duration::ZERO);
                });
                continue;
            }

            let condvar = self.shared.condvar(kind);
            match deadline {
                Some(deadline) => {
                    let _ = condvar.wait_until(&mut state, deadline);
                }
                None => condvar.wait(&mut state),
            }
        }
    }

    fn try_acquire(&self, kind: ActorKind, id: ActorId) -> MonitorResult<bool> {
        let mut outbox = Outbox::new();
        {
            let state = self.shared.state.lock();
            if state.is_live(kind, id) {
                tracing::warn!(%kind, %id, "try-start for an actor that is already waiting or active");
                return Err(MonitorError::InvalidState {
                    kind,
                    id,
                    reason: "already waiting or active",
                });
            }
            if !(state.compatible(kind) && state.queue.would_be_turn(kind)) {
                return Ok(false);
            }
            self.admitted(state, kind, id, Duration::ZERO, &mut outbox);
        }
        outbox.deliver(&*self.notifier);
        Ok(true)
    }

    /// Marks `(kind, id)` active, releases the lock, records the wait and
    /// queues the notifications.
    fn admitted(
        &self,
        mut state: MutexGuard<'_, MonitorState>,
        kind: ActorKind,
        id: ActorId,
        waited: Duration,
        outbox: &mut Outbox,
    ) {
        state.admit(kind, id);
        let (readers, writers) = state.counts();
        drop(state);

        let (avg_reader, avg_writer) = {
            let mut stats = self.stats.lock();
            stats.record(kind, waited);
            (stats.average(ActorKind::Reader), stats.average(ActorKind::Writer))
        };

        if self.config.trace_admissions {
            tracing::debug!(%kind, %id, waited_ms = as_millis_u64(waited), readers, writers, "admitted");
        }

        outbox.status(kind, id, ActorStatus::active(kind), waited);
        outbox.counts(readers, writers);
        outbox.averages(avg_reader, avg_writer);
    }

    fn release(&self, kind: ActorKind, id: ActorId) -> MonitorResult<()> {
        let (readers, writers) = {
            let mut state = self.shared.state.lock();
            match kind {
                ActorKind::Reader => {
                    if !state.readers.remove(&id) {
                        tracing::warn!(%id, "stop for a reader that is not active");
                        return Err(MonitorError::InvalidState {
                            kind,
                            id,
                            reason: "not an active reader",
                        });
                    }
                    if state.readers.is_empty() {
                        self.shared.wake_head(&state);
                    }
                }
                ActorKind::Writer => {
                    if state.writer != Some(id) {
                        tracing::warn!(%id, "stop for a writer that is not active");
                        return Err(MonitorError::InvalidState {
                            kind,
                            id,
                            reason: "not the active writer",
                        });
                    }
                    state.writer = None;
                    self.shared.wake_head(&state);
                }
            }
            state.counts()
        };

        if self.config.trace_admissions {
            tracing::debug!(%kind, %id, readers, writers, "released");
        }

        let mut outbox = Outbox::new();
        outbox.status(kind, id, ActorStatus::Stopped, Duration::ZERO);
        outbox.counts(readers, writers);
        outbox.deliver(&*self.notifier);
        Ok(())
    }

    /// Waker that takes the lock before notifying, so a waiter between its
    /// cancellation check and `wait` cannot miss it.
    fn cancel_waker(&self) -> Waker {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        Arc::new(move || {
            if let Some(shared) = shared.upgrade() {
                let _state = shared.state.lock();
                shared.readable.notify_all();
                shared.writable.notify_all();
            }
        })
    }
}

impl Default for ReaderWriterMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReaderWriterMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderWriterMonitor")
            .field("snapshot", &self.snapshot())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Deadline `timeout` from now. `None` (no deadline) when it does not fit in
/// an [`Instant`], so `Duration::MAX` waits indefinitely.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

fn abandon_reason(token: Option<&CancellationToken>, deadline: Option<Instant>) -> Option<CancelReason> {
    if token.is_some_and(CancellationToken::is_cancelled) {
        return Some(CancelReason::Token);
    }
    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        return Some(CancelReason::TimedOut);
    }
    None
}

/// Read or write access that is released when dropped.
#[must_use = "dropping a session releases access immediately"]
pub struct Session<'a> {
    monitor: &'a ReaderWriterMonitor,
    kind: ActorKind,
    id: ActorId,
    waited: Duration,
}

impl<'a> Session<'a> {
    fn new(monitor: &'a ReaderWriterMonitor, kind: ActorKind, id: ActorId, waited: Duration) -> Self {
        Self {
            monitor,
            kind,
            id,
            waited,
        }
    }

    /// Kind of access held.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    /// Id the session was started with.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Time spent waiting for admission.
    #[inline]
    #[must_use]
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        let result = match self.kind {
            ActorKind::Reader => self.monitor.stop_read(self.id),
            ActorKind::Writer => self.monitor.stop_write(self.id),
        };
        if let Err(err) = result {
            tracing::warn!(%err, "session was already released");
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("waited", &self.waited)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{ChannelNotifier, MonitorEvent};
    use std::thread;

    fn wait_for(monitor: &ReaderWriterMonitor, check: impl Fn(MonitorSnapshot) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !check(monitor.snapshot()) {
            assert!(Instant::now() < deadline, "timed out, snapshot: {:?}", monitor.snapshot());
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_readers_share() {
        let monitor = ReaderWriterMonitor::new();
        monitor.start_read(ActorId(1)).unwrap();
        monitor.start_read(ActorId(2)).unwrap();

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.active_readers, 2);
        assert!(!snapshot.writer_active);

        monitor.stop_read(ActorId(1)).unwrap();
        monitor.stop_read(ActorId(2)).unwrap();
        assert_eq!(monitor.snapshot(), MonitorSnapshot::default());
    }

    #[test]
    fn test_stop_without_start_is_invalid() {
        let monitor = ReaderWriterMonitor::new();
        monitor.start_read(ActorId(1)).unwrap();
        let before = monitor.snapshot();

        let err = monitor.stop_read(ActorId(9)).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidState { kind: ActorKind::Reader, .. }));
        let err = monitor.stop_write(ActorId(1)).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidState { kind: ActorKind::Writer, .. }));

        assert_eq!(monitor.snapshot(), before);
    }

    #[test]
    fn test_double_stop_is_invalid() {
        let monitor = ReaderWriterMonitor::new();
        monitor.start_write(ActorId(1)).unwrap();
        monitor.stop_write(ActorId(1)).unwrap();
        assert!(monitor.stop_write(ActorId(1)).is_err());
        assert_eq!(monitor.snapshot(), MonitorSnapshot::default());
    }

    #[test]
    fn test_duplicate_start_is_invalid() {
        let monitor = ReaderWriterMonitor::new();
        monitor.start_read(ActorId(4)).unwrap();
        let err = monitor.start_read(ActorId(4)).unwrap_err();
        assert_eq!(
            err,
            MonitorError::InvalidState {
                kind: ActorKind::Reader,
                id: ActorId(4),
                reason: "already waiting or active",
            }
        );
        // Same number as a writer is a different actor.
        assert!(!monitor.try_start_write(ActorId(4)).unwrap());
        assert_eq!(monitor.snapshot().active_readers, 1);
    }

    #[test]
    fn test_try_start_respects_queue() {
        let monitor = Arc::new(ReaderWriterMonitor::new());
        monitor.start_read(ActorId(1)).unwrap();

        let writer = {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || monitor.start_write(ActorId(1)))
        };
        wait_for(&monitor, |s| s.waiting_writers == 1);

        // Compatible with the active reader, but a writer is queued first.
        assert!(!monitor.try_start_read(ActorId(2)).unwrap());
        assert_eq!(monitor.snapshot().waiting_readers, 0);

        monitor.stop_read(ActorId(1)).unwrap();
        writer.join().unwrap().unwrap();
        assert!(!monitor.try_start_write(ActorId(2)).unwrap());
        monitor.stop_write(ActorId(1)).unwrap();
        assert!(monitor.try_start_write(ActorId(2)).unwrap());
    }

    #[test]
    fn test_timeout_leaves_no_ticket() {
        let monitor = ReaderWriterMonitor::new();
        monitor.start_read(ActorId(1)).unwrap();

        let err = monitor
            .start_write_timeout(ActorId(1), Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(
            err,
            MonitorError::Cancelled {
                kind: ActorKind::Writer,
                id: ActorId(1),
                reason: CancelReason::TimedOut,
            }
        );
        assert_eq!(monitor.snapshot().waiting_writers, 0);

        // Nothing blocks new readers afterwards.
        assert!(monitor.try_start_read(ActorId(2)).unwrap());
    }

    #[test]
    fn test_zero_timeout_admits_when_free() {
        let monitor = ReaderWriterMonitor::new();
        assert!(monitor.start_read_timeout(ActorId(1), Duration::ZERO).is_ok());
        monitor.stop_read(ActorId(1)).unwrap();

        assert!(monitor.start_write_timeout(ActorId(1), Duration::ZERO).is_ok());
        assert!(monitor.snapshot().writer_active);
    }

    #[test]
    fn test_zero_timeout_when_blocked() {
        let (notifier, events) = ChannelNotifier::unbounded();
        let monitor = ReaderWriterMonitor::new().with_notifier(Arc::new(notifier));
        monitor.start_write(ActorId(1)).unwrap();

        let err = monitor
            .start_read_timeout(ActorId(1), Duration::ZERO)
            .unwrap_err();
        assert_eq!(
            err,
            MonitorError::Cancelled {
                kind: ActorKind::Reader,
                id: ActorId(1),
                reason: CancelReason::TimedOut,
            }
        );
        assert_eq!(monitor.snapshot().waiting_readers, 0);
        assert!(events.try_iter().any(|event| matches!(
            event,
            MonitorEvent::Status {
                kind: ActorKind::Reader,
                status: ActorStatus::Cancelled,
                ..
            }
        )));
    }

    #[test]
    fn test_unbounded_timeout_does_not_overflow() {
        let monitor = ReaderWriterMonitor::new();
        assert!(monitor.start_write_timeout(ActorId(1), Duration::MAX).is_ok());
        monitor.stop_write(ActorId(1)).unwrap();
        assert!(monitor.start_read_timeout(ActorId(1), Duration::MAX).is_ok());
        assert_eq!(monitor.snapshot().active_readers, 1);
    }

    #[test]
    fn test_cancelled_token_before_start() {
        let monitor = ReaderWriterMonitor::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = monitor.start_read_with(ActorId(1), &token).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(monitor.snapshot(), MonitorSnapshot::default());
    }

    #[test]
    fn test_session_releases_on_drop() {
        let monitor = ReaderWriterMonitor::new();
        {
            let session = monitor.write(ActorId(1)).unwrap();
            assert_eq!(session.kind(), ActorKind::Writer);
            assert!(monitor.snapshot().writer_active);
        }
        assert!(!monitor.snapshot().writer_active);

        let session = monitor.read(ActorId(1)).unwrap();
        monitor.stop_read(session.id()).unwrap();
        // Dropping after a manual stop only logs.
        drop(session);
        assert_eq!(monitor.snapshot(), MonitorSnapshot::default());
    }

    #[test]
    fn test_notifications_for_immediate_admission() {
        let (notifier, events) = ChannelNotifier::unbounded();
        let monitor = ReaderWriterMonitor::new().with_notifier(Arc::new(notifier));

        monitor.start_read(ActorId(1)).unwrap();
        monitor.stop_read(ActorId(1)).unwrap();

        let events: Vec<_> = events.try_iter().collect();
        assert!(matches!(
            events[0],
            MonitorEvent::Status {
                kind: ActorKind::Reader,
                id: ActorId(1),
                status: ActorStatus::Reading,
                ..
            }
        ));
        assert_eq!(events[1], MonitorEvent::Counts { readers: 1, writers: 0 });
        assert!(matches!(events[2], MonitorEvent::Averages { .. }));
        assert!(matches!(
            events[3],
            MonitorEvent::Status {
                status: ActorStatus::Stopped,
                ..
            }
        ));
        assert_eq!(events[4], MonitorEvent::Counts { readers: 0, writers: 0 });
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn test_averages_count_every_admission() {
        let monitor = ReaderWriterMonitor::new();
        assert_eq!(monitor.average_reader_wait(), Duration::ZERO);
        assert_eq!(monitor.average_writer_wait_ms(), 0);

        for id in 1..=3 {
            monitor.start_read(ActorId(id)).unwrap();
        }
        assert_eq!(monitor.wait_summary(ActorKind::Reader).count, 3);
        assert_eq!(monitor.wait_summary(ActorKind::Writer).count, 0);
    }

    #[test]
    fn test_next_actor_id() {
        let monitor = ReaderWriterMonitor::new();
        assert_eq!(monitor.next_actor_id(ActorKind::Writer), ActorId(1));
        assert_eq!(monitor.next_actor_id(ActorKind::Writer), ActorId(2));
        assert_eq!(monitor.next_actor_id(ActorKind::Reader), ActorId(1));
    }
}
