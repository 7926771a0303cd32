//! One rollout example and its on-disk JSON form.
//!
//! ```json
//! {
//!   "position": [[[0.0, 0.0], [0.1, 0.0]], [[1.0, 0.0], [1.1, 0.0]]],
//!   "particle_type": [2, 0],
//!   "senders": [0, 1],
//!   "receivers": [1, 0],
//!   "step_context": [[300.0], [310.0]],
//!   "n_particles_per_example": [2],
//!   "n_edges_per_example": [2]
//! }
//! ```
//!
//! `position` is particle-major (`particles × time × dims`), as the model's
//! feature tensors are stored. `step_context` may be `null`, a list of
//! scalars, or a list of per-step rows.

use serde::Deserialize;

use crate::error::{RolloutError, RolloutResult};
use crate::simulation::states::{snapshot_from_rows, GlobalContext, GraphTopology, ParticleType, Snapshot};

/// Features of one scene to roll out
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub positions: Vec<Snapshot>, // time-major; the first W form the initial window, the rest is ground truth
    pub particle_types: Vec<ParticleType>,
    pub topology: GraphTopology,
    pub global_context: Option<GlobalContext>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ContextValues {
    Scalars(Vec<f64>),
    Rows(Vec<Vec<f64>>),
}

#[derive(Deserialize, Debug)]
pub struct ExampleFile {
    position: Vec<Vec<Vec<f64>>>, // particles × time × dims
    particle_type: Vec<u8>,
    #[serde(default)]
    senders: Vec<usize>,
    #[serde(default)]
    receivers: Vec<usize>,
    #[serde(default)]
    step_context: Option<ContextValues>,
    #[serde(default)]
    n_particles_per_example: Option<Vec<usize>>,
    #[serde(default)]
    n_edges_per_example: Option<Vec<usize>>,
}

impl TryFrom<ExampleFile> for Example {
    type Error = RolloutError;

    fn try_from(file: ExampleFile) -> RolloutResult<Self> {
        let particles = file.position.len();
        let steps = file.position.first().map(|p| p.len()).unwrap_or(0);
        if file.position.iter().any(|p| p.len() != steps) {
            return Err(RolloutError::Dataset("particles have trajectories of different lengths".to_string()));
        }

        // particle-major -> time-major
        let positions = (0..steps)
            .map(|t| {
                let rows: Vec<Vec<f64>> = file.position.iter().map(|p| p[t].clone()).collect();
                snapshot_from_rows(&rows)
                    .ok_or_else(|| RolloutError::Dataset(format!("ragged positions at step {t}")))
            })
            .collect::<RolloutResult<Vec<_>>>()?;

        if file.senders.len() != file.receivers.len() {
            return Err(RolloutError::Dataset(format!(
                "{} senders but {} receivers",
                file.senders.len(),
                file.receivers.len()
            )));
        }
        let n_edges = file.senders.len();
        let topology = GraphTopology {
            senders: file.senders,
            receivers: file.receivers,
            n_particles_per_example: file.n_particles_per_example.unwrap_or_else(|| vec![particles]),
            n_edges_per_example: file.n_edges_per_example.unwrap_or_else(|| vec![n_edges]),
        };

        let global_context = match file.step_context {
            None => None,
            Some(ContextValues::Scalars(values)) => Some(GlobalContext::from_scalars(values)),
            Some(ContextValues::Rows(rows)) => Some(
                GlobalContext::from_rows(&rows)
                    .ok_or_else(|| RolloutError::Dataset("step_context rows have different widths".to_string()))?,
            ),
        };
        if global_context.as_ref().is_some_and(|c| c.is_empty()) {
            return Err(RolloutError::Dataset("step_context is present but empty".to_string()));
        }

        Ok(Example {
            positions,
            particle_types: file.particle_type.into_iter().map(ParticleType).collect(),
            topology,
            global_context,
        })
    }
}
