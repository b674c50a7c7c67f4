//! # Turnstile Driver
//!
//! Terminal front end for [`turnstile_core`]:
//! - Scenario files with the Start/Stop Reader/Writer actions
//! - One thread per actor, stoppable while waiting or active
//! - A dashboard notifier that tracks status lines, counts and averages
//!
//! ## Example
//!
//! ```rust,ignore
//! let scenario = ScenarioConfig::builtin();
//! let dashboard = Arc::new(Dashboard::new());
//! let monitor = ReaderWriterMonitor::with_config(scenario.monitor.clone())
//!     .with_notifier(dashboard.clone());
//! let report = Driver::new(Arc::new(monitor), Duration::from_millis(scenario.hold_ms))
//!     .run(&scenario.resolve_steps()?)?;
//! println!("{}", dashboard.render());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod dashboard;
pub mod driver;
pub mod error;
pub mod logging;
pub mod scenario;

pub use dashboard::{Dashboard, StatusLine};
pub use driver::{Driver, DriverReport};
pub use error::{DriverError, DriverResult};
pub use logging::setup_log;
pub use scenario::{RandomWorkload, ScenarioConfig, Step};
