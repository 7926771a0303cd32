//! Learned simulator interface
//!
//! The rollout engine only talks to a model through [`Simulator`]. Different
//! architectures plug in without engine changes, and device placement stays
//! a property of the implementation.

use std::path::Path;

use crate::error::SimulatorError;
use crate::simulation::params::Device;
use crate::simulation::states::{ContextVector, GraphTopology, ParticleType, PositionWindow, Snapshot};

/// Everything a simulator sees for one call
#[derive(Debug, Clone, Copy)]
pub struct SimulatorInput<'a> {
    pub positions: &'a PositionWindow,
    pub particle_types: &'a [ParticleType],
    pub topology: &'a GraphTopology,
    pub predict_length: usize,
    pub context: Option<&'a ContextVector>,
}

/// `predict_length` future snapshots, nearest first
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub steps: Vec<Snapshot>,
}

impl Prediction {
    /// Next-step positions; the only part fed back into the rollout
    pub fn next(self) -> Result<Snapshot, SimulatorError> {
        let got = self.steps.len();
        self.steps
            .into_iter()
            .next()
            .ok_or_else(|| SimulatorError::shape("prediction length", ">= 1", got))
    }
}

/// Outcome of a non-strict parameter load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

pub trait Simulator {
    /// One forward pass used to resolve dynamic input shapes before
    /// parameters are loaded.
    fn warmup(&mut self, input: &SimulatorInput<'_>) -> Result<(), SimulatorError>;

    /// Load parameters from `path`. With `allow_partial`, missing and unknown
    /// keys are reported instead of failing.
    fn load_parameters(&mut self, path: &Path, allow_partial: bool) -> Result<LoadReport, SimulatorError>;

    fn predict(&self, input: &SimulatorInput<'_>) -> Result<Prediction, SimulatorError>;

    /// Move parameters and statistics to `device`
    fn to_device(&mut self, device: Device);

    fn device(&self) -> Device;
}
