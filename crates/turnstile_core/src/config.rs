//! # Monitor Configuration
//!
//! Loaded once at startup, typically from the `[monitor]` table of a TOML
//! file. Every field has a default, so an empty table is valid.

use serde::{Deserialize, Serialize};

use crate::stats::DEFAULT_SAMPLE_WINDOW;

/// Configuration for a [`ReaderWriterMonitor`](crate::ReaderWriterMonitor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Recent wait samples kept per actor kind. Averages are unaffected.
    pub sample_window: usize,
    /// Emit a `debug` event for every admission and release.
    pub trace_admissions: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_window: DEFAULT_SAMPLE_WINDOW,
            trace_admissions: true,
        }
    }
}

impl MonitorConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed TOML or unknown fields.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = MonitorConfig::from_toml_str("sample_window = 16").unwrap();
        assert_eq!(config.sample_window, 16);
        assert!(config.trace_admissions);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(MonitorConfig::from_toml_str("fairness = \"writer\"").is_err());
    }
}
