//! Error types for rollout inference

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a [`Simulator`](crate::simulation::simulator::Simulator)
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        got: String,
    },

    #[error("Simulator called before warmup resolved its input shapes")]
    NotWarmedUp,

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Missing parameter in checkpoint: {0}")]
    MissingParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulatorError {
    pub fn shape(what: &'static str, expected: impl ToString, got: impl ToString) -> Self {
        SimulatorError::ShapeMismatch {
            what,
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RolloutError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Global context of length {context_len} cannot cover step {step} with window {window}")]
    ContextMisaligned {
        context_len: usize,
        window: usize,
        step: usize,
    },

    #[error("Simulator invocation failed: {0}")]
    Simulator(#[from] SimulatorError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Rollout cancelled before step {step}")]
    Cancelled { step: usize },
}

impl RolloutError {
    /// Errors that make the whole run invalid rather than a single example
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RolloutError::Configuration(_) | RolloutError::ContextMisaligned { .. }
        )
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RolloutError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type RolloutResult<T> = Result<T, RolloutError>;
