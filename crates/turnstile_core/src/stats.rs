//! # Wait-Time Statistics
//!
//! Every admission appends the time the actor spent waiting. Averages are
//! computed from an exact cumulative sum and count (integer nanoseconds, no
//! floating point), so `[10ms, 20ms, 30ms]` averages to exactly `20ms`.
//!
//! Only the most recent `window` samples are kept for inspection; the
//! average always covers every sample ever recorded.

use std::collections::VecDeque;
use std::time::Duration;

use crate::actor::ActorKind;

/// Default number of recent samples kept per actor kind.
pub const DEFAULT_SAMPLE_WINDOW: usize = 1024;

/// Summary of the wait times recorded for one actor kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaitSummary {
    /// Number of recorded admissions.
    pub count: u64,
    /// Mean wait, `Duration::ZERO` with no samples.
    pub average: Duration,
    /// Longest wait seen.
    pub max: Duration,
    /// Most recent samples, oldest first.
    pub recent: Vec<Duration>,
}

/// Samples for a single actor kind.
#[derive(Clone, Debug, Default)]
struct KindStats {
    total_nanos: u128,
    count: u64,
    max: Duration,
    recent: VecDeque<Duration>,
}

impl KindStats {
    fn record(&mut self, wait: Duration, window: usize) {
        self.total_nanos += wait.as_nanos();
        self.count += 1;
        self.max = self.max.max(wait);

        if window == 0 {
            return;
        }
        if self.recent.len() == window {
            self.recent.pop_front();
        }
        self.recent.push_back(wait);
    }

    fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let mean = self.total_nanos / u128::from(self.count);
        Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX))
    }
}

/// Wait-time samples for readers and writers.
///
/// Not synchronized on its own; the monitor keeps it behind a lock.
#[derive(Clone, Debug)]
pub struct WaitStats {
    readers: KindStats,
    writers: KindStats,
    window: usize,
}

impl WaitStats {
    /// Creates empty statistics keeping `window` recent samples per kind.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            readers: KindStats::default(),
            writers: KindStats::default(),
            window,
        }
    }

    fn kind(&self, kind: ActorKind) -> &KindStats {
        match kind {
            ActorKind::Reader => &self.readers,
            ActorKind::Writer => &self.writers,
        }
    }

    /// Appends one wait sample.
    pub fn record(&mut self, kind: ActorKind, wait: Duration) {
        let window = self.window;
        match kind {
            ActorKind::Reader => self.readers.record(wait, window),
            ActorKind::Writer => self.writers.record(wait, window),
        }
    }

    /// Mean wait for `kind`, `Duration::ZERO` when nothing was recorded.
    #[must_use]
    pub fn average(&self, kind: ActorKind) -> Duration {
        self.kind(kind).average()
    }

    /// Number of samples recorded for `kind`.
    #[must_use]
    pub fn count(&self, kind: ActorKind) -> u64 {
        self.kind(kind).count
    }

    /// Full summary for `kind`.
    #[must_use]
    pub fn summary(&self, kind: ActorKind) -> WaitSummary {
        let stats = self.kind(kind);
        WaitSummary {
            count: stats.count,
            average: stats.average(),
            max: stats.max,
            recent: stats.recent.iter().copied().collect(),
        }
    }
}

impl Default for WaitStats {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}

/// Whole milliseconds of `duration`, rounded down.
#[inline]
#[must_use]
pub fn as_millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
