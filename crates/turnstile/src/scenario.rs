//! # Scenarios
//!
//! A scenario is an ordered list of button presses, the same four the
//! reader-writer demo always had plus a pause:
//!
//! ```toml
//! hold_ms = 2000        # how long a started actor keeps its access
//! step_delay_ms = 100   # gap inserted after every step
//!
//! [monitor]
//! sample_window = 256
//!
//! [[steps]]
//! action = "start_reader"
//!
//! [[steps]]
//! action = "pause"
//! ms = 500
//!
//! [[steps]]
//! action = "start_writer"
//! ```
//!
//! Instead of `steps`, a `[random]` table generates a seeded workload.

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use turnstile_core::MonitorConfig;

use crate::error::{DriverError, DriverResult};

/// One scripted action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Start a reader that holds for `hold_ms`, then stops.
    StartReader,
    /// Start a writer that holds for `hold_ms`, then stops.
    StartWriter,
    /// Stop the most recently started reader that is still waiting or active.
    StopReader,
    /// Stop the most recently started writer that is still waiting or active.
    StopWriter,
    /// Do nothing for `ms` milliseconds.
    Pause {
        /// Pause length.
        ms: u64,
    },
}

/// Seeded random arrivals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomWorkload {
    /// RNG seed; the same seed yields the same steps.
    pub seed: u64,
    /// Number of actors to start.
    pub actors: usize,
    /// Probability that an arrival is a writer, in `[0, 1]`.
    pub writer_ratio: f64,
    /// Upper bound of the random gap between arrivals.
    pub max_gap_ms: u64,
}

impl Default for RandomWorkload {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            actors: 20,
            writer_ratio: 0.25,
            max_gap_ms: 200,
        }
    }
}

impl RandomWorkload {
    /// Generates the arrival steps.
    ///
    /// # Errors
    ///
    /// [`DriverError::InvalidScenario`] if `writer_ratio` is outside `[0, 1]`.
    pub fn generate(&self) -> DriverResult<Vec<Step>> {
        if !(0.0..=1.0).contains(&self.writer_ratio) {
            return Err(DriverError::InvalidScenario(format!(
                "writer_ratio must be within [0, 1], got {}",
                self.writer_ratio
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut steps = Vec::with_capacity(self.actors * 2);
        for _ in 0..self.actors {
            if rng.gen_bool(self.writer_ratio) {
                steps.push(Step::StartWriter);
            } else {
                steps.push(Step::StartReader);
            }
            if self.max_gap_ms > 0 {
                steps.push(Step::Pause {
                    ms: rng.gen_range(0..=self.max_gap_ms),
                });
            }
        }
        Ok(steps)
    }
}

/// A complete scenario file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// How long each started actor holds its access (ms).
    pub hold_ms: u64,
    /// Gap inserted after every step (ms).
    pub step_delay_ms: u64,
    /// Monitor settings.
    pub monitor: MonitorConfig,
    /// Scripted steps, run in order.
    pub steps: Vec<Step>,
    /// Random workload, used when `steps` is empty.
    pub random: Option<RandomWorkload>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            hold_ms: 2000,
            step_delay_ms: 0,
            monitor: MonitorConfig::default(),
            steps: Vec::new(),
            random: None,
        }
    }
}

impl ScenarioConfig {
    /// Parses a scenario from TOML text.
    ///
    /// # Errors
    ///
    /// [`DriverError::Config`] for malformed TOML or unknown fields.
    pub fn from_toml_str(text: &str) -> DriverResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a scenario file.
    ///
    /// # Errors
    ///
    /// [`DriverError::Io`] if the file cannot be read, otherwise as for
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> DriverResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reader A holds, writer B queues, reader C arrives behind B.
    /// B must be admitted before C.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            hold_ms: 1500,
            step_delay_ms: 200,
            steps: vec![Step::StartReader, Step::StartWriter, Step::StartReader],
            ..Self::default()
        }
    }

    /// Steps to run: the scripted ones, or the random workload.
    ///
    /// # Errors
    ///
    /// [`DriverError::InvalidScenario`] if there is nothing to run or the
    /// random workload is invalid.
    pub fn resolve_steps(&self) -> DriverResult<Vec<Step>> {
        if !self.steps.is_empty() {
            return Ok(self.steps.clone());
        }
        match &self.random {
            Some(random) => random.generate(),
            None => Err(DriverError::InvalidScenario(
                "scenario has neither steps nor a [random] table".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let scenario = ScenarioConfig::from_toml_str(
            r#"
            hold_ms = 50

            [[steps]]
            action = "start_reader"

            [[steps]]
            action = "pause"
            ms = 10

            [[steps]]
            action = "stop_writer"
            "#,
        )
        .unwrap();

        assert_eq!(scenario.hold_ms, 50);
        assert_eq!(scenario.step_delay_ms, 0);
        assert_eq!(
            scenario.resolve_steps().unwrap(),
            vec![Step::StartReader, Step::Pause { ms: 10 }, Step::StopWriter]
        );
    }

    #[test]
    fn test_monitor_table() {
        let scenario = ScenarioConfig::from_toml_str(
            r#"
            [monitor]
            sample_window = 8
            trace_admissions = false

            [[steps]]
            action = "start_writer"
            "#,
        )
        .unwrap();
        assert_eq!(scenario.monitor.sample_window, 8);
        assert!(!scenario.monitor.trace_admissions);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = ScenarioConfig::from_toml_str("[[steps]]\naction = \"explode\"\n");
        assert!(matches!(result, Err(DriverError::Config(_))));
    }

    #[test]
    fn test_random_workload_is_deterministic() {
        let random = RandomWorkload {
            actors: 10,
            ..RandomWorkload::default()
        };
        let first = random.generate().unwrap();
        assert_eq!(first, random.generate().unwrap());

        let arrivals = first
            .iter()
            .filter(|step| matches!(step, Step::StartReader | Step::StartWriter))
            .count();
        assert_eq!(arrivals, 10);
    }

    #[test]
    fn test_random_workload_rejects_bad_ratio() {
        let random = RandomWorkload {
            writer_ratio: 1.5,
            ..RandomWorkload::default()
        };
        assert!(matches!(random.generate(), Err(DriverError::InvalidScenario(_))));
    }

    #[test]
    fn test_empty_scenario_has_nothing_to_run() {
        let scenario = ScenarioConfig::default();
        assert!(scenario.resolve_steps().is_err());
        assert_eq!(ScenarioConfig::builtin().resolve_steps().unwrap().len(), 3);
    }

    #[test]
    fn test_missing_file() {
        let result = ScenarioConfig::load("/nonexistent/turnstile/scenario.toml");
        assert!(matches!(result, Err(DriverError::Io { .. })));
    }
}
