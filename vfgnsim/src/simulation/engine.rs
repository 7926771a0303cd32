//! Autoregressive rollout engine
//!
//! Drives one example from its initial window to the end of the rollout:
//! each step builds the context vector, calls the simulator once, appends
//! the prediction and slides the window. Step `k + 1` depends on the output
//! of step `k`, so steps run strictly in order and any failure aborts the
//! example.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::configuration::config::{EngineConfig, KinematicPolicy};
use crate::dataset::Example;
use crate::error::{RolloutError, RolloutResult, SimulatorError};
use crate::simulation::context::ContextWindowBuilder;
use crate::simulation::simulator::{Simulator, SimulatorInput};
use crate::simulation::states::{ParticleType, PositionWindow, Snapshot};

/// Immutable engine settings, fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub input_sequence_length: usize, // W
    pub predict_length: usize,
    pub num_particle_types: u8,
    pub kinematic_particle_id: u8,
    pub kinematic_policy: KinematicPolicy,
    pub rollout_steps: Option<usize>,
}

impl From<&EngineConfig> for EngineSettings {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            input_sequence_length: cfg.input_sequence_length,
            predict_length: cfg.predict_length,
            num_particle_types: cfg.num_particle_types,
            kinematic_particle_id: cfg.kinematic_particle_id,
            kinematic_policy: cfg.kinematic_policy,
            rollout_steps: cfg.rollout_steps,
        }
    }
}

/// Shared flag checked before every rollout step
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Finished rollout of one example
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    pub initial_window: Vec<Snapshot>,
    pub predictions: Vec<Snapshot>, // one per rollout step, chronological
    pub kinematic_mask: Vec<bool>,
    pub elapsed: Duration,
}

pub struct RolloutEngine {
    settings: EngineSettings,
}

impl RolloutEngine {
    pub fn new(settings: EngineSettings) -> RolloutResult<Self> {
        if settings.input_sequence_length == 0 {
            return Err(RolloutError::Configuration("input_sequence_length must be positive".to_string()));
        }
        if settings.predict_length == 0 {
            return Err(RolloutError::Configuration("predict_length must be positive".to_string()));
        }
        if settings.kinematic_particle_id >= settings.num_particle_types {
            return Err(RolloutError::Configuration(format!(
                "kinematic_particle_id {} out of range for {} particle types",
                settings.kinematic_particle_id, settings.num_particle_types
            )));
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// `true` for particles whose motion is prescribed rather than predicted
    pub fn kinematic_mask(&self, particle_types: &[ParticleType]) -> Vec<bool> {
        particle_types
            .iter()
            .map(|t| t.id() == self.settings.kinematic_particle_id)
            .collect()
    }

    /// Number of rollout steps for `example`.
    ///
    /// With a global context this is `L - W`; a configured override must
    /// agree with it. Without one the override applies, else it falls back to
    /// the length of the ground-truth trajectory after the initial window.
    pub fn num_rollout_steps(&self, example: &Example) -> RolloutResult<usize> {
        let w = self.settings.input_sequence_length;
        let contexts = ContextWindowBuilder::new(example.global_context.as_ref(), w);

        match contexts.max_steps() {
            Some(max_steps) => {
                let max_steps = max_steps?;
                match self.settings.rollout_steps {
                    Some(steps) if steps != max_steps => Err(RolloutError::Configuration(format!(
                        "rollout_steps = {steps} does not match the global context: {} steps with window {w} drive exactly {max_steps} steps",
                        example.global_context.as_ref().map(|c| c.len()).unwrap_or(0)
                    ))),
                    _ => Ok(max_steps),
                }
            }
            None => {
                if let Some(steps) = self.settings.rollout_steps {
                    return Ok(steps);
                }
                match example.positions.len().checked_sub(w) {
                    Some(steps) if steps > 0 => Ok(steps),
                    _ => Err(RolloutError::Configuration(
                        "example has no global context and no target trajectory to size the rollout".to_string(),
                    )),
                }
            }
        }
    }

    /// Validate `example` and set up the initial rollout state.
    /// Every configuration check happens here, before the first simulator call.
    pub fn start<'a>(&self, example: &'a Example) -> RolloutResult<RolloutState<'a>> {
        let w = self.settings.input_sequence_length;
        if example.positions.len() < w {
            return Err(RolloutError::Dataset(format!(
                "example has {} position snapshots, need at least {w}",
                example.positions.len()
            )));
        }
        let (particles, dims) = example.positions[0].shape();
        if let Some(bad) = example.positions.iter().find(|s| s.shape() != (particles, dims)) {
            return Err(RolloutError::Dataset(format!(
                "ragged trajectory: {particles}x{dims} vs {}x{}",
                bad.nrows(),
                bad.ncols()
            )));
        }
        if example.particle_types.len() != particles {
            return Err(RolloutError::Dataset(format!(
                "{} particle types for {particles} particles",
                example.particle_types.len()
            )));
        }
        if let Some(bad) = example
            .particle_types
            .iter()
            .find(|t| t.id() >= self.settings.num_particle_types)
        {
            return Err(RolloutError::Dataset(format!(
                "particle type {} outside the {} configured types",
                bad.id(),
                self.settings.num_particle_types
            )));
        }

        let num_steps = self.num_rollout_steps(example)?;

        if self.settings.kinematic_policy == KinematicPolicy::FollowGroundTruth
            && example.positions.len() < w + num_steps
        {
            return Err(RolloutError::Configuration(format!(
                "following ground truth for kinematic particles needs {} snapshots, example has {}",
                w + num_steps,
                example.positions.len()
            )));
        }

        Ok(RolloutState {
            example,
            settings: self.settings,
            contexts: ContextWindowBuilder::new(example.global_context.as_ref(), w),
            window: PositionWindow::new(example.positions[..w].to_vec()),
            predictions: Vec::with_capacity(num_steps),
            kinematic_mask: self.kinematic_mask(&example.particle_types),
            step: 0,
            num_steps,
        })
    }

    /// Roll `example` out to completion.
    pub fn rollout<S>(&self, simulator: &S, example: &Example, cancel: &CancelToken) -> RolloutResult<Rollout>
    where
        S: Simulator + ?Sized,
    {
        let start = Instant::now();
        let mut state = self.start(example)?;

        while !state.is_done() {
            if cancel.is_cancelled() {
                return Err(RolloutError::Cancelled { step: state.step });
            }
            state.step(simulator)?;
        }

        Ok(state.finish(start.elapsed()))
    }
}

/// Per-example rollout state. Owned exclusively by one rollout.
pub struct RolloutState<'a> {
    example: &'a Example,
    settings: EngineSettings,
    contexts: ContextWindowBuilder<'a>,
    window: PositionWindow,
    predictions: Vec<Snapshot>,
    kinematic_mask: Vec<bool>,
    step: usize,
    num_steps: usize,
}

impl RolloutState<'_> {
    pub fn step_index(&self) -> usize {
        self.step
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    pub fn is_done(&self) -> bool {
        self.step == self.num_steps
    }

    pub fn window(&self) -> &PositionWindow {
        &self.window
    }

    pub fn predictions(&self) -> &[Snapshot] {
        &self.predictions
    }

    pub fn kinematic_mask(&self) -> &[bool] {
        &self.kinematic_mask
    }

    /// Run one rollout step and return the snapshot appended to the trajectory
    pub fn step<S>(&mut self, simulator: &S) -> RolloutResult<&Snapshot>
    where
        S: Simulator + ?Sized,
    {
        if self.is_done() {
            return Err(RolloutError::Configuration(format!(
                "rollout already finished after {} steps",
                self.num_steps
            )));
        }
        debug!(step = self.step, "predicting step");

        let context = self.contexts.build(self.step)?;
        if !self.contexts.has_context() {
            debug!(step = self.step, "no global context for this step");
        }

        let input = SimulatorInput {
            positions: &self.window,
            particle_types: &self.example.particle_types,
            topology: &self.example.topology,
            predict_length: self.settings.predict_length,
            context: context.as_ref(),
        };
        let mut next = simulator.predict(&input)?.next()?;

        let expected = self.window.shape();
        if next.shape() != expected {
            return Err(SimulatorError::shape(
                "predicted positions",
                format!("{}x{}", expected.0, expected.1),
                format!("{}x{}", next.nrows(), next.ncols()),
            )
            .into());
        }

        if self.settings.kinematic_policy == KinematicPolicy::FollowGroundTruth {
            let truth = &self.example.positions[self.settings.input_sequence_length + self.step];
            for (i, _) in self.kinematic_mask.iter().enumerate().filter(|(_, kinematic)| **kinematic) {
                next.set_row(i, &truth.row(i));
            }
        }

        self.predictions.push(next.clone());
        self.window.advance(next);
        self.step += 1;

        Ok(&self.predictions[self.step - 1])
    }

    pub fn finish(self, elapsed: Duration) -> Rollout {
        Rollout {
            initial_window: self.example.positions[..self.settings.input_sequence_length].to_vec(),
            predictions: self.predictions,
            kinematic_mask: self.kinematic_mask,
            elapsed,
        }
    }
}
