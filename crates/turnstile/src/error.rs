//! # Driver Error Types

use std::path::PathBuf;

use thiserror::Error;
use turnstile_core::{ActorId, ActorKind, MonitorError};

/// Errors that can occur while loading or running a scenario.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Scenario file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Scenario file is not valid TOML or has unknown fields.
    #[error("invalid scenario: {0}")]
    Config(#[from] toml::de::Error),

    /// Scenario values are out of range.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// The monitor rejected an operation.
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// An actor thread could not be spawned.
    #[error("failed to spawn {kind} {id}: {source}")]
    Spawn {
        /// Kind of the actor.
        kind: ActorKind,
        /// Id of the actor.
        id: ActorId,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An actor thread panicked.
    #[error("{kind} {id} thread panicked")]
    ActorPanicked {
        /// Kind of the actor.
        kind: ActorKind,
        /// Id of the actor.
        id: ActorId,
    },
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
