//! Rollout records and their JSON persistence
//!
//! One record per example, written to `rollout_<split>_<index>.json`:
//!
//! ```json
//! {
//!   "initial_positions": [...],   // W × particles × dims
//!   "predicted_rollout": [...],   // steps × particles × dims
//!   "particle_types": [...],
//!   "global_context": [...],      // as read: one value per step, or steps × dim rows; null if absent
//!   "metadata": { ... }           // dataset metadata, verbatim
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::Example;
use crate::error::{RolloutError, RolloutResult};
use crate::simulation::engine::Rollout;
use crate::simulation::states::{snapshot_rows, GlobalContext};

/// Global context in the shape the example supplied it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RecordedContext {
    Scalars(Vec<f64>),
    Rows(Vec<Vec<f64>>),
}

impl From<&GlobalContext> for RecordedContext {
    fn from(ctx: &GlobalContext) -> Self {
        if ctx.is_scalar() {
            RecordedContext::Scalars(ctx.values().to_vec())
        } else {
            RecordedContext::Rows(ctx.rows())
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RolloutRecord {
    pub initial_positions: Vec<Vec<Vec<f64>>>,
    pub predicted_rollout: Vec<Vec<Vec<f64>>>,
    pub particle_types: Vec<u8>,
    pub global_context: Option<RecordedContext>,
    pub metadata: Value,
}

impl RolloutRecord {
    /// Combine a finished rollout with the example's static data
    pub fn assemble(rollout: &Rollout, example: &Example, metadata: &Value) -> Self {
        Self {
            initial_positions: rollout.initial_window.iter().map(snapshot_rows).collect(),
            predicted_rollout: rollout.predictions.iter().map(snapshot_rows).collect(),
            particle_types: example.particle_types.iter().map(|t| t.id()).collect(),
            global_context: example.global_context.as_ref().map(RecordedContext::from),
            metadata: metadata.clone(),
        }
    }

    /// `(steps, particles, dims)` of the predicted trajectory
    pub fn rollout_shape(&self) -> (usize, usize, usize) {
        let steps = self.predicted_rollout.len();
        let particles = self.predicted_rollout.first().map(|s| s.len()).unwrap_or(0);
        let dims = self
            .predicted_rollout
            .first()
            .and_then(|s| s.first())
            .map(|p| p.len())
            .unwrap_or(0);
        (steps, particles, dims)
    }

    pub fn read(path: &Path) -> RolloutResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| RolloutError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Writes records under one output directory for one split
#[derive(Debug, Clone)]
pub struct TrajectoryWriter {
    output_dir: PathBuf,
    split: String,
}

impl TrajectoryWriter {
    pub fn new(output_dir: impl Into<PathBuf>, split: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            split: split.into(),
        }
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("rollout_{}_{}.json", self.split, index))
    }

    /// Serialize and write one record; an existing file of the same name is replaced.
    pub fn write(&self, index: usize, record: &RolloutRecord) -> RolloutResult<PathBuf> {
        // serialize first so a failure never leaves a partial file behind
        let bytes = serde_json::to_vec(record)?;

        fs::create_dir_all(&self.output_dir).map_err(|e| RolloutError::io(&self.output_dir, e))?;
        let path = self.path_for(index);
        fs::write(&path, bytes).map_err(|e| RolloutError::io(&path, e))?;
        Ok(path)
    }
}
