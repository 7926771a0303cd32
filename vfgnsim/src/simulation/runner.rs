//! Build a fully-initialized rollout run from configuration and drive it
//! over a dataset split.
//!
//! A `RolloutRun` bundles:
//! - the rollout engine and its immutable settings
//! - the simulator (warmed up and loaded lazily on the first example)
//! - the trajectory writer and the dataset metadata copied into every record
//!
//! Examples are rolled out one at a time. A simulator or IO failure only
//! loses the current example; configuration errors stop the run.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{info, warn};

use crate::configuration::config::RunConfig;
use crate::dataset::{read_metadata, Example};
use crate::error::{RolloutError, RolloutResult};
use crate::simulation::context::ContextWindowBuilder;
use crate::simulation::engine::{CancelToken, EngineSettings, RolloutEngine};
use crate::simulation::extrapolation::{ExtrapolationParams, ExtrapolationSimulator};
use crate::simulation::params::Device;
use crate::simulation::record::{RolloutRecord, TrajectoryWriter};
use crate::simulation::simulator::{Simulator, SimulatorInput};

/// What happened to each example of a run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RolloutSummary {
    pub written: Vec<(usize, PathBuf)>,
    pub failed: Vec<(usize, String)>,
    pub cancelled: bool,
}

pub struct RolloutRun<S> {
    pub engine: RolloutEngine,
    pub simulator: S,
    pub writer: TrajectoryWriter,
    pub metadata: Value,
    pub checkpoint: Option<PathBuf>,
    pub device: Device,
    prepared: bool,
}

impl RolloutRun<ExtrapolationSimulator> {
    /// Validate `cfg`, read dataset metadata and set up the built-in simulator
    pub fn build(cfg: &RunConfig) -> RolloutResult<Self> {
        cfg.validate()?;

        let metadata = read_metadata(&cfg.data.data_path)?;
        let stats = metadata.normalization_stats(cfg.data.noise_std)?;
        let simulator = ExtrapolationSimulator::new(stats, ExtrapolationParams::from(&cfg.simulator));
        info!(dim = metadata.dim(), "initialized built-in simulator");

        Ok(Self::new(
            RolloutEngine::new(EngineSettings::from(&cfg.engine))?,
            simulator,
            TrajectoryWriter::new(&cfg.data.output_path, &cfg.data.eval_split),
            metadata.raw,
            cfg.data.checkpoint.clone(),
            cfg.device()?,
        ))
    }
}

impl<S: Simulator> RolloutRun<S> {
    pub fn new(
        engine: RolloutEngine,
        simulator: S,
        writer: TrajectoryWriter,
        metadata: Value,
        checkpoint: Option<PathBuf>,
        device: Device,
    ) -> Self {
        Self {
            engine,
            simulator,
            writer,
            metadata,
            checkpoint,
            device,
            prepared: false,
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Resolve input shapes with one warm-up call, load parameters without
    /// strict key matching, then move the simulator to its device.
    fn prepare(&mut self, example: &Example) -> RolloutResult<()> {
        let state = self.engine.start(example)?;
        let settings = self.engine.settings();
        let warmup_context = ContextWindowBuilder::new(example.global_context.as_ref(), settings.input_sequence_length).warmup();

        let input = SimulatorInput {
            positions: state.window(),
            particle_types: &example.particle_types,
            topology: &example.topology,
            predict_length: settings.predict_length,
            context: warmup_context.as_ref(),
        };
        self.simulator.warmup(&input)?;

        match &self.checkpoint {
            Some(path) => {
                let report = self.simulator.load_parameters(path, true)?;
                info!(checkpoint = %path.display(), loaded = ?report.loaded, "loaded simulator parameters");
                if !report.missing.is_empty() {
                    warn!(missing = ?report.missing, "checkpoint is missing parameters, keeping initial values");
                }
                if !report.unexpected.is_empty() {
                    warn!(unexpected = ?report.unexpected, "ignored unknown checkpoint parameters");
                }
            }
            None => warn!("no checkpoint configured, using initial simulator parameters"),
        }

        self.simulator.to_device(self.device);
        info!(device = %self.simulator.device(), "simulator ready");
        self.prepared = true;
        Ok(())
    }

    /// Roll out one example and write its record
    pub fn run_one(&mut self, index: usize, example: &Example, cancel: &CancelToken) -> RolloutResult<PathBuf> {
        if !self.prepared {
            self.prepare(example)?;
        }

        if let Some(ctx) = &example.global_context {
            info!(index, steps = ctx.len(), dim = ctx.dim(), "read global context");
        }
        let num_steps = self.engine.num_rollout_steps(example)?;
        info!(index, num_steps, particles = example.particle_types.len(), "start prediction");

        let rollout = self.engine.rollout(&self.simulator, example, cancel)?;
        info!(
            index,
            predictions = rollout.predictions.len(),
            elapsed_s = rollout.elapsed.as_secs_f64(),
            "finished rollout"
        );

        let record = RolloutRecord::assemble(&rollout, example, &self.metadata);
        let path = self.writer.write(index, &record)?;
        info!(index, path = %path.display(), "wrote rollout record");
        Ok(path)
    }

    /// Roll out every example in iteration order. Record names use the
    /// iteration index, failed examples included.
    pub fn run<I>(&mut self, examples: I, cancel: &CancelToken) -> RolloutResult<RolloutSummary>
    where
        I: IntoIterator<Item = RolloutResult<Example>>,
    {
        let mut summary = RolloutSummary::default();

        for (index, example) in examples.into_iter().enumerate() {
            let result = example.and_then(|example| self.run_one(index, &example, cancel));
            match result {
                Ok(path) => summary.written.push((index, path)),
                Err(RolloutError::Cancelled { step }) => {
                    warn!(index, step, "rollout cancelled");
                    summary.cancelled = true;
                    break;
                }
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => {
                    warn!(index, error = %e, "rollout failed, continuing with the next example");
                    summary.failed.push((index, e.to_string()));
                }
            }
        }

        info!(
            written = summary.written.len(),
            failed = summary.failed.len(),
            cancelled = summary.cancelled,
            "rollout run finished"
        );
        Ok(summary)
    }
}
