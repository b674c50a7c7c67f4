//! # Turnstile Core
//!
//! A reader-writer monitor for the classic reader-writer problem:
//! - Many concurrent readers OR one exclusive writer
//! - Fair FIFO admission, consecutive readers at the head admitted together
//! - Cancellation tokens and deadlines for waiting requests
//! - Exact average wait times per actor kind
//!
//! ## Architecture Rules
//!
//! 1. **One lock** - all monitor state lives behind a single mutex
//! 2. **Observers are sinks** - notifications run after the lock is released
//! 3. **Misuse is an error** - stopping what never started is reported, never ignored
//!
//! ## Example
//!
//! ```rust,ignore
//! use turnstile_core::{ActorKind, ReaderWriterMonitor};
//!
//! let monitor = ReaderWriterMonitor::new();
//! let id = monitor.next_actor_id(ActorKind::Reader);
//! let waited = monitor.start_read(id)?;
//! monitor.stop_read(id)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod actor;
pub mod cancel;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notifier;
mod queue;
pub mod stats;

pub use actor::{ActorId, ActorKind, ActorStatus};
pub use cancel::CancellationToken;
pub use config::MonitorConfig;
pub use error::{CancelReason, MonitorError, MonitorResult};
pub use monitor::{MonitorSnapshot, ReaderWriterMonitor, Session};
pub use notifier::{ChannelNotifier, MonitorEvent, NoopNotifier, Notifier, TracingNotifier};
pub use stats::{WaitStats, WaitSummary};
