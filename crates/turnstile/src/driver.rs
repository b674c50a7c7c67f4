//! # Scenario Driver
//!
//! Plays a list of [`Step`]s against a shared monitor. Every started actor
//! gets its own thread:
//!
//! ```text
//!   start_reader ──► thread "Reader-3"
//!                      start_read_with(id, token)   blocks until admitted
//!                      hold for hold_ms or until released
//!                      stop_read(id)
//!
//!   stop_reader  ──► newest live Reader control
//!                      token.cancel()   waiting: leaves the queue
//!                      release          active: ends the hold early
//! ```
//!
//! A stop for a kind with no live actor is counted and ignored.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use turnstile_core::{ActorId, ActorKind, CancellationToken, MonitorResult, ReaderWriterMonitor};

use crate::error::{DriverError, DriverResult};
use crate::scenario::Step;

/// How an actor thread ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ActorOutcome {
    Completed,
    Cancelled,
}

/// Handle the driver keeps for each live actor.
struct SessionControl {
    id: ActorId,
    token: CancellationToken,
    release: Sender<()>,
}

impl SessionControl {
    /// Cancels the request if it is still queued, ends the hold otherwise.
    fn stop(&self) {
        self.token.cancel();
        let _ = self.release.try_send(());
    }
}

#[derive(Default)]
struct Controls {
    readers: Mutex<Vec<SessionControl>>,
    writers: Mutex<Vec<SessionControl>>,
}

impl Controls {
    fn of(&self, kind: ActorKind) -> &Mutex<Vec<SessionControl>> {
        match kind {
            ActorKind::Reader => &self.readers,
            ActorKind::Writer => &self.writers,
        }
    }

    fn forget(&self, kind: ActorKind, id: ActorId) {
        self.of(kind).lock().retain(|control| control.id != id);
    }
}

struct ActorHandle {
    kind: ActorKind,
    id: ActorId,
    handle: JoinHandle<MonitorResult<ActorOutcome>>,
}

/// Totals of one driver run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverReport {
    /// Readers started.
    pub readers_started: usize,
    /// Writers started.
    pub writers_started: usize,
    /// Actors that were admitted and stopped.
    pub completed: usize,
    /// Actors stopped while still waiting.
    pub cancelled: usize,
    /// Stop steps with no live actor of their kind.
    pub ignored_stops: usize,
}

impl fmt::Display for DriverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "started {} readers and {} writers: {} completed, {} cancelled, {} stops ignored",
            self.readers_started, self.writers_started, self.completed, self.cancelled, self.ignored_stops
        )
    }
}

/// Runs scenario steps against a monitor.
pub struct Driver {
    monitor: Arc<ReaderWriterMonitor>,
    hold: Duration,
    step_delay: Duration,
    controls: Arc<Controls>,
    actors: Vec<ActorHandle>,
    report: DriverReport,
}

impl Driver {
    /// Creates a driver whose actors hold their access for `hold`.
    #[must_use]
    pub fn new(monitor: Arc<ReaderWriterMonitor>, hold: Duration) -> Self {
        Self {
            monitor,
            hold,
            step_delay: Duration::ZERO,
            controls: Arc::new(Controls::default()),
            actors: Vec::new(),
            report: DriverReport::default(),
        }
    }

    /// Sleeps `delay` after every step.
    #[must_use]
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// The monitor being driven.
    #[must_use]
    pub fn monitor(&self) -> &Arc<ReaderWriterMonitor> {
        &self.monitor
    }

    /// Plays `steps` in order, then waits for every actor to finish.
    ///
    /// # Errors
    ///
    /// [`DriverError::Spawn`] if a thread cannot be started,
    /// [`DriverError::ActorPanicked`] if one panics, or
    /// [`DriverError::Monitor`] if the monitor rejects an actor. Cancelled
    /// actors are counted in the report, not treated as errors.
    pub fn run(mut self, steps: &[Step]) -> DriverResult<DriverReport> {
        for step in steps {
            self.apply(*step)?;
            if !self.step_delay.is_zero() {
                thread::sleep(self.step_delay);
            }
        }
        self.join()
    }

    fn apply(&mut self, step: Step) -> DriverResult<()> {
        match step {
            Step::StartReader => self.start(ActorKind::Reader),
            Step::StartWriter => self.start(ActorKind::Writer),
            Step::StopReader => {
                self.stop(ActorKind::Reader);
                Ok(())
            }
            Step::StopWriter => {
                self.stop(ActorKind::Writer);
                Ok(())
            }
            Step::Pause { ms } => {
                thread::sleep(Duration::from_millis(ms));
                Ok(())
            }
        }
    }

    fn start(&mut self, kind: ActorKind) -> DriverResult<()> {
        let id = self.monitor.next_actor_id(kind);
        let token = CancellationToken::new();
        let (release, released) = bounded(1);
        self.controls.of(kind).lock().push(SessionControl {
            id,
            token: token.clone(),
            release,
        });

        let monitor = Arc::clone(&self.monitor);
        let controls = Arc::clone(&self.controls);
        let hold = self.hold;
        let spawned = thread::Builder::new()
            .name(format!("{kind}-{id}"))
            .spawn(move || run_actor(&monitor, &controls, kind, id, &token, &released, hold));

        match spawned {
            Ok(handle) => {
                match kind {
                    ActorKind::Reader => self.report.readers_started += 1,
                    ActorKind::Writer => self.report.writers_started += 1,
                }
                self.actors.push(ActorHandle { kind, id, handle });
                Ok(())
            }
            Err(source) => {
                self.controls.forget(kind, id);
                Err(DriverError::Spawn { kind, id, source })
            }
        }
    }

    fn stop(&mut self, kind: ActorKind) {
        let control = self.controls.of(kind).lock().pop();
        match control {
            Some(control) => {
                tracing::debug!("stopping {kind} {}", control.id);
                control.stop();
            }
            None => {
                tracing::info!("no live {kind} to stop");
                self.report.ignored_stops += 1;
            }
        }
    }

    fn join(self) -> DriverResult<DriverReport> {
        let mut report = self.report;
        let mut first_error = None;
        for actor in self.actors {
            let result = match actor.handle.join() {
                Ok(Ok(ActorOutcome::Completed)) => {
                    report.completed += 1;
                    Ok(())
                }
                Ok(Ok(ActorOutcome::Cancelled)) => {
                    report.cancelled += 1;
                    Ok(())
                }
                Ok(Err(err)) => Err(DriverError::Monitor(err)),
                Err(_) => Err(DriverError::ActorPanicked {
                    kind: actor.kind,
                    id: actor.id,
                }),
            };
            if let Err(err) = result {
                tracing::error!("{err}");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

fn run_actor(
    monitor: &ReaderWriterMonitor,
    controls: &Controls,
    kind: ActorKind,
    id: ActorId,
    token: &CancellationToken,
    released: &Receiver<()>,
    hold: Duration,
) -> MonitorResult<ActorOutcome> {
    let admitted = match kind {
        ActorKind::Reader => monitor.start_read_with(id, token),
        ActorKind::Writer => monitor.start_write_with(id, token),
    };
    match admitted {
        Ok(_) => {}
        Err(err) if err.is_cancelled() => {
            controls.forget(kind, id);
            return Ok(ActorOutcome::Cancelled);
        }
        Err(err) => {
            controls.forget(kind, id);
            return Err(err);
        }
    }

    let _ = released.recv_timeout(hold);
    controls.forget(kind, id);
    match kind {
        ActorKind::Reader => monitor.stop_read(id)?,
        ActorKind::Writer => monitor.stop_write(id)?,
    }
    Ok(ActorOutcome::Completed)
}
