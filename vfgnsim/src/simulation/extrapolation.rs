//! Built-in graph simulator
//!
//! A small parametric stand-in for a trained network: accelerations come
//! from an [`AccelSet`] (dataset mean acceleration, velocity damping,
//! global-context drive, neighbour coupling along graph edges) and
//! positions advance with the unit-step integrator. Parameters load from a
//! JSON checkpoint of `name -> number`.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::SimulatorError;
use crate::simulation::forces::{AccelInput, AccelSet, ContextDrive, MeanAcceleration, NeighborCoupling, VelocityDamping};
use crate::simulation::integrator::{euler_step, finite_difference_velocity};
use crate::simulation::params::{Device, NormalizationStats};
use crate::simulation::simulator::{LoadReport, Prediction, Simulator, SimulatorInput};
use crate::simulation::states::Snapshot;

/// Trainable coefficients of the built-in simulator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtrapolationParams {
    pub damping: f64,
    pub context_gain: f64,
    pub neighbor_coupling: f64,
}

impl ExtrapolationParams {
    pub const NAMES: [&'static str; 3] = ["damping", "context_gain", "neighbor_coupling"];

    fn slot(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "damping" => Some(&mut self.damping),
            "context_gain" => Some(&mut self.context_gain),
            "neighbor_coupling" => Some(&mut self.neighbor_coupling),
            _ => None,
        }
    }
}

/// Input dimensions fixed by `warmup`. The particle count is per example
/// and is not pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputShapes {
    particles: usize,
    dims: usize,
    window: usize,
    context_len: Option<usize>,
}

pub struct ExtrapolationSimulator {
    stats: NormalizationStats,
    params: ExtrapolationParams,
    accels: AccelSet,
    shapes: Option<InputShapes>,
}

impl ExtrapolationSimulator {
    pub fn new(stats: NormalizationStats, params: ExtrapolationParams) -> Self {
        let accels = build_accels(&stats, &params);
        Self {
            stats,
            params,
            accels,
            shapes: None,
        }
    }

    pub fn params(&self) -> &ExtrapolationParams {
        &self.params
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    fn check_shapes(&self, input: &SimulatorInput<'_>) -> Result<InputShapes, SimulatorError> {
        let window = input.positions.len();
        if window < 2 {
            return Err(SimulatorError::shape("position window", ">= 2 snapshots", window));
        }
        let (particles, dims) = input.positions.shape();
        if let Some(bad) = input.positions.iter().find(|s| s.shape() != (particles, dims)) {
            return Err(SimulatorError::shape(
                "position window",
                format!("{particles}x{dims}"),
                format!("{}x{}", bad.nrows(), bad.ncols()),
            ));
        }
        if dims != self.stats.acceleration.len() {
            return Err(SimulatorError::shape("spatial dims", self.stats.acceleration.len(), dims));
        }
        if input.particle_types.len() != particles {
            return Err(SimulatorError::shape("particle types", particles, input.particle_types.len()));
        }

        let topology = input.topology;
        if topology.num_particles() != particles {
            return Err(SimulatorError::shape("n_particles_per_example", particles, topology.num_particles()));
        }
        if topology.senders.len() != topology.receivers.len() {
            return Err(SimulatorError::shape("receivers", topology.senders.len(), topology.receivers.len()));
        }
        if let Some(bad) = topology.senders.iter().chain(&topology.receivers).find(|i| **i >= particles) {
            return Err(SimulatorError::shape("edge index", format!("< {particles}"), bad));
        }
        if input.predict_length == 0 {
            return Err(SimulatorError::shape("predict length", ">= 1", 0));
        }

        Ok(InputShapes {
            particles,
            dims,
            window,
            context_len: input.context.map(|c| c.len()),
        })
    }
}

impl Simulator for ExtrapolationSimulator {
    fn warmup(&mut self, input: &SimulatorInput<'_>) -> Result<(), SimulatorError> {
        let shapes = self.check_shapes(input)?;
        debug!(?shapes, "resolved simulator input shapes");
        self.shapes = Some(shapes);
        Ok(())
    }

    fn load_parameters(&mut self, path: &Path, allow_partial: bool) -> Result<LoadReport, SimulatorError> {
        let text = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| SimulatorError::Checkpoint(format!("{}: {e}", path.display())))?;
        let entries = value
            .as_object()
            .ok_or_else(|| SimulatorError::Checkpoint(format!("{}: expected a JSON object", path.display())))?;

        let mut params = self.params.clone();
        let mut report = LoadReport::default();

        for (key, v) in entries {
            match params.slot(key) {
                Some(slot) => {
                    *slot = v
                        .as_f64()
                        .ok_or_else(|| SimulatorError::Checkpoint(format!("parameter {key} is not a number")))?;
                    report.loaded.push(key.clone());
                }
                None => report.unexpected.push(key.clone()),
            }
        }
        report.missing = ExtrapolationParams::NAMES
            .iter()
            .filter(|name| !entries.contains_key(**name))
            .map(|name| name.to_string())
            .collect();

        if !allow_partial {
            if let Some(name) = report.missing.first() {
                return Err(SimulatorError::MissingParameter(name.clone()));
            }
            if let Some(key) = report.unexpected.first() {
                return Err(SimulatorError::Checkpoint(format!("unexpected parameter {key}")));
            }
        }

        self.accels = build_accels(&self.stats, &params);
        self.params = params;
        Ok(report)
    }

    fn predict(&self, input: &SimulatorInput<'_>) -> Result<Prediction, SimulatorError> {
        let expected = self.shapes.ok_or(SimulatorError::NotWarmedUp)?;
        let got = self.check_shapes(input)?;
        if got.dims != expected.dims {
            return Err(SimulatorError::shape("spatial dims", expected.dims, got.dims));
        }
        if got.window != expected.window {
            return Err(SimulatorError::shape("position window", expected.window, got.window));
        }
        if got.context_len != expected.context_len {
            return Err(SimulatorError::shape(
                "global context",
                format!("{:?}", expected.context_len),
                format!("{:?}", got.context_len),
            ));
        }

        let mut position = input
            .positions
            .newest()
            .cloned()
            .ok_or_else(|| SimulatorError::shape("position window", ">= 2 snapshots", 0))?;
        let mut velocity = finite_difference_velocity(input.positions)
            .ok_or_else(|| SimulatorError::shape("position window", ">= 2 snapshots", got.window))?;
        let mut accel = Snapshot::zeros(got.particles, got.dims);

        let mut steps = Vec::with_capacity(input.predict_length);
        for _ in 0..input.predict_length {
            let accel_input = AccelInput {
                velocity: &velocity,
                topology: input.topology,
                context: input.context,
            };
            self.accels.accumulate_accels(&accel_input, &mut accel);
            let (next_position, next_velocity) = euler_step(&position, &velocity, &accel);
            steps.push(next_position.clone());
            position = next_position;
            velocity = next_velocity;
        }

        Ok(Prediction { steps })
    }

    fn to_device(&mut self, device: Device) {
        self.stats = self.stats.clone().to(device);
        self.accels = build_accels(&self.stats, &self.params);
    }

    fn device(&self) -> Device {
        self.stats.device()
    }
}

/// Register every acceleration term for the current parameters
fn build_accels(stats: &NormalizationStats, params: &ExtrapolationParams) -> AccelSet {
    let mut accels = AccelSet::new()
        .with(MeanAcceleration {
            mean: stats.acceleration.mean.clone(),
        })
        .with(VelocityDamping {
            damping: params.damping,
        })
        .with(NeighborCoupling {
            strength: params.neighbor_coupling,
        });

    if let Some(context_stats) = &stats.context {
        accels = accels.with(ContextDrive {
            gain: params.context_gain,
            context_stats: context_stats.clone(),
            acceleration_stats: stats.acceleration.clone(),
        });
    }
    accels
}
