//! Logging setup for the driver binary.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,turnstile_core=debug";

/// Installs a fmt subscriber filtered by `RUST_LOG`. Safe to call twice.
pub fn setup_log() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = SubscriberBuilder::default()
        .with_thread_names(true)
        .with_span_events(FmtSpan::NONE)
        .with_env_filter(filter)
        .finish()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_log_twice() {
        setup_log();
        setup_log();
        tracing::info!("logging installed");
    }
}
