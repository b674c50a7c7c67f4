//! # Turnstile
//!
//! Runs a reader-writer scenario against the monitor and prints the
//! dashboard as it looked at the end.
//!
//! ```bash
//! # Built-in scenario: reader, writer, reader
//! turnstile
//!
//! # Scenario file
//! RUST_LOG=debug turnstile crates/turnstile/scenarios/random.toml
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use turnstile::{setup_log, Dashboard, Driver, DriverResult, ScenarioConfig};
use turnstile_core::ReaderWriterMonitor;

fn main() -> ExitCode {
    setup_log();

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                      TURNSTILE v{}", env!("CARGO_PKG_VERSION"));
    println!("                 fair reader-writer monitor demo");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: Option<String>) -> DriverResult<()> {
    let scenario = match &path {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::builtin(),
    };
    let steps = scenario.resolve_steps()?;
    tracing::info!(
        "scenario {}: {} steps, hold {} ms",
        path.as_deref().unwrap_or("<builtin>"),
        steps.len(),
        scenario.hold_ms
    );

    let dashboard = Arc::new(Dashboard::echoing());
    let monitor = Arc::new(
        ReaderWriterMonitor::with_config(scenario.monitor.clone()).with_notifier(dashboard.clone()),
    );
    let report = Driver::new(Arc::clone(&monitor), Duration::from_millis(scenario.hold_ms))
        .with_step_delay(Duration::from_millis(scenario.step_delay_ms))
        .run(&steps)?;
    dashboard.reconcile(&monitor);

    println!();
    print!("{}", dashboard.render());
    println!();
    println!("  {report}");
    Ok(())
}
