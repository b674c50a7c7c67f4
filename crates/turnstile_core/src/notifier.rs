//! # Observer Interface
//!
//! The monitor reports state changes to a [`Notifier`]. Notifiers are pure
//! sinks: they never influence admission, and they are always called after
//! the monitor's lock has been released, possibly from many threads at once.
//!
//! Implementations that need a particular thread (a UI loop, a terminal
//! renderer) do their own hand-off; [`ChannelNotifier`] is the usual way.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::actor::{ActorId, ActorKind, ActorStatus};
use crate::stats::as_millis_u64;

/// Receives monitor state changes.
///
/// Every method has an empty default so observers implement only what they
/// render.
pub trait Notifier: Send + Sync {
    /// Active reader and writer counts changed.
    fn on_counts_changed(&self, _readers: usize, _writers: usize) {}

    /// An actor changed status. `waited` is the admission wait for
    /// `Reading`/`Writing`, zero otherwise.
    fn on_actor_status(
        &self,
        _kind: ActorKind,
        _id: ActorId,
        _status: ActorStatus,
        _waited: Duration,
    ) {
    }

    /// Average admission waits changed.
    fn on_average_wait_changed(&self, _avg_reader: Duration, _avg_writer: Duration) {}
}

/// Notifier that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {}

/// A single notifier callback, as a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorEvent {
    /// See [`Notifier::on_counts_changed`].
    Counts {
        /// Active readers.
        readers: usize,
        /// Active writers (0 or 1).
        writers: usize,
    },
    /// See [`Notifier::on_actor_status`].
    Status {
        /// Actor kind.
        kind: ActorKind,
        /// Actor id.
        id: ActorId,
        /// New status.
        status: ActorStatus,
        /// Admission wait.
        waited: Duration,
    },
    /// See [`Notifier::on_average_wait_changed`].
    Averages {
        /// Mean reader wait.
        reader: Duration,
        /// Mean writer wait.
        writer: Duration,
    },
}

impl MonitorEvent {
    /// Calls the matching method on `notifier`.
    pub fn deliver_to(&self, notifier: &dyn Notifier) {
        match *self {
            Self::Counts { readers, writers } => notifier.on_counts_changed(readers, writers),
            Self::Status {
                kind,
                id,
                status,
                waited,
            } => notifier.on_actor_status(kind, id, status, waited),
            Self::Averages { reader, writer } => notifier.on_average_wait_changed(reader, writer),
        }
    }
}

/// Forwards every callback as a [`MonitorEvent`] over a channel.
///
/// Never blocks: on a full bounded channel the event is dropped, and a
/// disconnected receiver is ignored.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    sender: Sender<MonitorEvent>,
}

impl ChannelNotifier {
    /// Wraps an existing sender.
    #[must_use]
    pub fn new(sender: Sender<MonitorEvent>) -> Self {
        Self { sender }
    }

    /// Creates a notifier backed by an unbounded channel.
    #[must_use]
    pub fn unbounded() -> (Self, Receiver<MonitorEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }

    fn send(&self, event: MonitorEvent) {
        match self.sender.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!(?event, "notifier channel full, event dropped");
            }
        }
    }
}

impl Notifier for ChannelNotifier {
    fn on_counts_changed(&self, readers: usize, writers: usize) {
        self.send(MonitorEvent::Counts { readers, writers });
    }

    fn on_actor_status(&self, kind: ActorKind, id: ActorId, status: ActorStatus, waited: Duration) {
        self.send(MonitorEvent::Status {
            kind,
            id,
            status,
            waited,
        });
    }

    fn on_average_wait_changed(&self, avg_reader: Duration, avg_writer: Duration) {
        self.send(MonitorEvent::Averages {
            reader: avg_reader,
            writer: avg_writer,
        });
    }
}

/// Logs every callback through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn on_counts_changed(&self, readers: usize, writers: usize) {
        tracing::info!(readers, writers, "counts changed");
    }

    fn on_actor_status(&self, kind: ActorKind, id: ActorId, status: ActorStatus, waited: Duration) {
        tracing::info!(
            %kind,
            %id,
            %status,
            waited_ms = as_millis_u64(waited),
            "actor status"
        );
    }

    fn on_average_wait_changed(&self, avg_reader: Duration, avg_writer: Duration) {
        tracing::info!(
            avg_reader_ms = as_millis_u64(avg_reader),
            avg_writer_ms = as_millis_u64(avg_writer),
            "average wait changed"
        );
    }
}

/// Events collected under the monitor lock, delivered after it is released.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    events: Vec<MonitorEvent>,
}

impl Outbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn status(&mut self, kind: ActorKind, id: ActorId, status: ActorStatus, waited: Duration) {
        self.events.push(MonitorEvent::Status {
            kind,
            id,
            status,
            waited,
        });
    }

    pub(crate) fn counts(&mut self, readers: usize, writers: usize) {
        self.events.push(MonitorEvent::Counts { readers, writers });
    }

    pub(crate) fn averages(&mut self, reader: Duration, writer: Duration) {
        self.events.push(MonitorEvent::Averages { reader, writer });
    }

    /// Delivers everything in order. Must be called without the monitor lock.
    pub(crate) fn deliver(self, notifier: &dyn Notifier) {
        for event in &self.events {
            event.deliver_to(notifier);
        }
    }
}
