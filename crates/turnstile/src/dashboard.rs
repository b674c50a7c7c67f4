//! # Terminal Dashboard
//!
//! Renders what the monitor reports: one status line per actor, the active
//! counts and the average waits.
//!
//! ```text
//!   Readers: 2        Writers: 0
//!   Average Reader Wait Time: 12 ms
//!   Average Writer Wait Time: 740 ms
//!
//!   [ACTIVE] Reader 1: Reading
//!   [ACTIVE] Reader 2: Reading (Waited: 24 ms)
//!   [STOP  ] Writer 1: Stopped
//! ```
//!
//! Status tags replace color coding: `WAIT` for waiting, `ACTIVE` for
//! reading/writing, `STOP` for stopped or cancelled.
//!
//! Count and average callbacks from different threads may arrive out of
//! order, so the last one received is not always the newest. Call
//! [`Dashboard::reconcile`] before a render that must be exact.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use parking_lot::Mutex;
use turnstile_core::stats::as_millis_u64;
use turnstile_core::{ActorId, ActorKind, ActorStatus, Notifier, ReaderWriterMonitor};

/// Latest reported status of one actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusLine {
    /// Actor kind.
    pub kind: ActorKind,
    /// Actor id.
    pub id: ActorId,
    /// Last status.
    pub status: ActorStatus,
    /// Admission wait reported with the status.
    pub waited: Duration,
}

impl StatusLine {
    fn tag(&self) -> &'static str {
        match self.status {
            ActorStatus::Waiting => "WAIT  ",
            ActorStatus::Reading | ActorStatus::Writing => "ACTIVE",
            ActorStatus::Stopped | ActorStatus::Cancelled => "STOP  ",
        }
    }
}

impl std::fmt::Display for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.id, self.status)?;
        let waited_ms = as_millis_u64(self.waited);
        if waited_ms > 0 {
            write!(f, " (Waited: {waited_ms} ms)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct DashboardState {
    lines: BTreeMap<(u8, ActorId), StatusLine>,
    readers: usize,
    writers: usize,
    avg_reader: Duration,
    avg_writer: Duration,
}

/// Notifier that keeps everything needed to draw the dashboard.
#[derive(Debug, Default)]
pub struct Dashboard {
    state: Mutex<DashboardState>,
    echo: bool,
}

impl Dashboard {
    /// Creates an empty dashboard that does not log changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dashboard that logs every status line as it changes.
    #[must_use]
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Latest status of `(kind, id)`, if it was ever reported.
    #[must_use]
    pub fn status_of(&self, kind: ActorKind, id: ActorId) -> Option<StatusLine> {
        self.state.lock().lines.get(&(kind_order(kind), id)).copied()
    }

    /// Last reported active counts as `(readers, writers)`.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.readers, state.writers)
    }

    /// Last reported average waits as `(reader, writer)`.
    #[must_use]
    pub fn averages(&self) -> (Duration, Duration) {
        let state = self.state.lock();
        (state.avg_reader, state.avg_writer)
    }

    /// Replaces counts and averages with the monitor's current values.
    pub fn reconcile(&self, monitor: &ReaderWriterMonitor) {
        let snapshot = monitor.snapshot();
        let avg_reader = monitor.average_reader_wait();
        let avg_writer = monitor.average_writer_wait();

        let mut state = self.state.lock();
        state.readers = snapshot.active_readers;
        state.writers = usize::from(snapshot.writer_active);
        state.avg_reader = avg_reader;
        state.avg_writer = avg_writer;
    }

    /// Draws the whole dashboard.
    #[must_use]
    pub fn render(&self) -> String {
        let state = self.state.lock();
        let mut out = String::new();
        let _ = writeln!(out, "Readers: {:<8} Writers: {}", state.readers, state.writers);
        let _ = writeln!(
            out,
            "Average Reader Wait Time: {} ms",
            as_millis_u64(state.avg_reader)
        );
        let _ = writeln!(
            out,
            "Average Writer Wait Time: {} ms",
            as_millis_u64(state.avg_writer)
        );
        if !state.lines.is_empty() {
            out.push('\n');
        }
        for line in state.lines.values() {
            let _ = writeln!(out, "[{}] {line}", line.tag());
        }
        out
    }
}

/// Readers sort before writers.
fn kind_order(kind: ActorKind) -> u8 {
    match kind {
        ActorKind::Reader => 0,
        ActorKind::Writer => 1,
    }
}

impl Notifier for Dashboard {
    fn on_counts_changed(&self, readers: usize, writers: usize) {
        let mut state = self.state.lock();
        state.readers = readers;
        state.writers = writers;
    }

    fn on_actor_status(&self, kind: ActorKind, id: ActorId, status: ActorStatus, waited: Duration) {
        let line = StatusLine {
            kind,
            id,
            status,
            waited,
        };
        self.state.lock().lines.insert((kind_order(kind), id), line);
        if self.echo {
            tracing::info!("[{}] {line}", line.tag());
        }
    }

    fn on_average_wait_changed(&self, avg_reader: Duration, avg_writer: Duration) {
        let mut state = self.state.lock();
        state.avg_reader = avg_reader;
        state.avg_writer = avg_writer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_suffix_only_when_waited() {
        let mut line = StatusLine {
            kind: ActorKind::Reader,
            id: ActorId(3),
            status: ActorStatus::Reading,
            waited: Duration::ZERO,
        };
        assert_eq!(line.to_string(), "Reader 3: Reading");

        line.waited = Duration::from_millis(120);
        assert_eq!(line.to_string(), "Reader 3: Reading (Waited: 120 ms)");
    }

    #[test]
    fn test_status_is_replaced_per_actor() {
        let dashboard = Dashboard::new();
        dashboard.on_actor_status(ActorKind::Writer, ActorId(1), ActorStatus::Waiting, Duration::ZERO);
        dashboard.on_actor_status(
            ActorKind::Writer,
            ActorId(1),
            ActorStatus::Writing,
            Duration::from_millis(5),
        );
        dashboard.on_actor_status(ActorKind::Reader, ActorId(1), ActorStatus::Stopped, Duration::ZERO);

        let writer = dashboard.status_of(ActorKind::Writer, ActorId(1)).unwrap();
        assert_eq!(writer.status, ActorStatus::Writing);
        assert_eq!(
            dashboard.status_of(ActorKind::Reader, ActorId(1)).unwrap().status,
            ActorStatus::Stopped
        );
        assert!(dashboard.status_of(ActorKind::Reader, ActorId(2)).is_none());
    }

    #[test]
    fn test_render() {
        let dashboard = Dashboard::new();
        dashboard.on_counts_changed(2, 0);
        dashboard.on_average_wait_changed(Duration::from_millis(20), Duration::ZERO);
        dashboard.on_actor_status(ActorKind::Writer, ActorId(1), ActorStatus::Waiting, Duration::ZERO);
        dashboard.on_actor_status(ActorKind::Reader, ActorId(2), ActorStatus::Reading, Duration::ZERO);

        let rendered = dashboard.render();
        assert!(rendered.starts_with("Readers: 2"));
        assert!(rendered.contains("Average Reader Wait Time: 20 ms"));
        assert!(rendered.contains("Average Writer Wait Time: 0 ms"));

        // Readers are listed before writers.
        let reader_at = rendered.find("[ACTIVE] Reader 2: Reading").unwrap();
        let writer_at = rendered.find("[WAIT  ] Writer 1: Waiting").unwrap();
        assert!(reader_at < writer_at);
        assert_eq!(dashboard.counts(), (2, 0));
    }

    #[test]
    fn test_reconcile_drops_out_of_order_counts() {
        let dashboard = Dashboard::new();
        let monitor = ReaderWriterMonitor::new();
        monitor.start_read(ActorId(1)).unwrap();
        monitor.start_read(ActorId(2)).unwrap();
        monitor.stop_read(ActorId(1)).unwrap();
        monitor.stop_read(ActorId(2)).unwrap();

        // Second stop delivered before the first one.
        dashboard.on_counts_changed(0, 0);
        dashboard.on_counts_changed(1, 0);
        dashboard.on_average_wait_changed(Duration::from_secs(5), Duration::from_secs(5));
        assert_eq!(dashboard.counts(), (1, 0));

        dashboard.reconcile(&monitor);
        assert_eq!(dashboard.counts(), (0, 0));
        assert_eq!(
            dashboard.averages(),
            (monitor.average_reader_wait(), monitor.average_writer_wait())
        );
        assert!(dashboard.render().starts_with("Readers: 0"));
    }
}
