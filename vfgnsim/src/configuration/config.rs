//! Configuration types for loading rollout runs from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! rollout run. A run consists of:
//!
//! - [`EngineConfig`]    – window length, predict length, particle-type enumeration, masking policy
//! - [`DataConfig`]      – dataset location, split, noise floor, checkpoint, output, device
//! - [`SimulatorConfig`] – initial coefficients of the built-in simulator
//! - [`RunConfig`]       – top-level wrapper used to load a run from YAML
//!
//! # YAML format
//!
//! ```yaml
//! mode: rollout
//!
//! engine:
//!   input_sequence_length: 5      # W, number of snapshots fed to the simulator
//!   predict_length: 1
//!   num_particle_types: 3
//!   kinematic_particle_id: 0      # anchor point
//!   kinematic_policy: ignore      # or follow_ground_truth
//!   rollout_steps: null           # default: derived from context or ground truth
//!
//! data:
//!   data_path: data/sintering
//!   eval_split: test
//!   noise_std: 6.7e-4
//!   output_path: rollouts
//!   checkpoint: checkpoints/model.json
//!   device: cpu
//!
//! simulator:
//!   damping: 0.0
//!   context_gain: 0.0
//!   neighbor_coupling: 0.0
//! ```
//!
//! The runner maps this configuration into its runtime settings
//! (`EngineSettings`, `ExtrapolationParams`, `Device`).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{RolloutError, RolloutResult};
use crate::simulation::extrapolation::ExtrapolationParams;
use crate::simulation::params::Device;

/// What the engine does with kinematic particles before feeding a prediction back
/// `kinematic_policy: "ignore"` or `kinematic_policy: "follow_ground_truth"`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KinematicPolicy {
    #[default]
    #[serde(rename = "ignore")] // keep the model output for every particle
    Ignore,

    #[serde(rename = "follow_ground_truth")] // overwrite kinematic particles with the ground-truth position
    FollowGroundTruth,
}

/// Run mode. Only rollout inference is supported.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Mode(pub String);

impl Mode {
    pub const ROLLOUT: &'static str = "rollout";
}

impl Default for Mode {
    fn default() -> Self {
        Mode(Mode::ROLLOUT.to_string())
    }
}

/// Engine-level configuration
#[derive(Deserialize, Debug, Clone)]
pub struct EngineConfig {
    pub input_sequence_length: usize, // W, snapshots per simulator input
    #[serde(default = "default_predict_length")]
    pub predict_length: usize, // snapshots returned per call, only the first is fed back
    #[serde(default = "default_num_particle_types")]
    pub num_particle_types: u8,
    #[serde(default)]
    pub kinematic_particle_id: u8,
    #[serde(default)]
    pub kinematic_policy: KinematicPolicy,
    #[serde(default)]
    pub rollout_steps: Option<usize>, // sizes contextless rollouts; with a context it must equal L - W
}

fn default_predict_length() -> usize {
    1
}

fn default_num_particle_types() -> u8 {
    3
}

/// Dataset, checkpoint and output locations
#[derive(Deserialize, Debug, Clone)]
pub struct DataConfig {
    pub data_path: PathBuf, // holds metadata.json and one directory per split
    pub eval_split: String,
    #[serde(default)]
    pub noise_std: f64, // folded into every normalization scale
    pub output_path: PathBuf,
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
    #[serde(default = "default_device")]
    pub device: String, // "cpu" or "cuda:<n>"
}

fn default_device() -> String {
    "cpu".to_string()
}

/// Initial coefficients of the built-in simulator, before the checkpoint is applied
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub damping: f64,
    #[serde(default)]
    pub context_gain: f64,
    #[serde(default)]
    pub neighbor_coupling: f64,
}

impl From<&SimulatorConfig> for ExtrapolationParams {
    fn from(cfg: &SimulatorConfig) -> Self {
        ExtrapolationParams {
            damping: cfg.damping,
            context_gain: cfg.context_gain,
            neighbor_coupling: cfg.neighbor_coupling,
        }
    }
}

/// Top-level run configuration loaded from YAML
#[derive(Deserialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: Mode,
    pub engine: EngineConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl RunConfig {
    pub fn from_yaml_str(text: &str) -> RolloutResult<Self> {
        serde_yaml::from_str(text).map_err(|e| RolloutError::Configuration(e.to_string()))
    }

    pub fn from_file(path: &Path) -> RolloutResult<Self> {
        let file = File::open(path).map_err(|e| RolloutError::io(path, e))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader)
            .map_err(|e| RolloutError::Configuration(format!("{}: {e}", path.display())))
    }

    /// Reject settings no rollout can run with
    pub fn validate(&self) -> RolloutResult<()> {
        if self.mode.0 != Mode::ROLLOUT {
            return Err(RolloutError::Configuration(format!("mode {:?} not implemented", self.mode.0)));
        }
        let e = &self.engine;
        if e.input_sequence_length < 2 {
            return Err(RolloutError::Configuration(
                "input_sequence_length must be at least 2 to derive a velocity".to_string(),
            ));
        }
        if e.predict_length == 0 {
            return Err(RolloutError::Configuration("predict_length must be at least 1".to_string()));
        }
        if e.kinematic_particle_id >= e.num_particle_types {
            return Err(RolloutError::Configuration(format!(
                "kinematic_particle_id {} is not one of {} particle types",
                e.kinematic_particle_id, e.num_particle_types
            )));
        }
        if !(self.data.noise_std >= 0.0) {
            return Err(RolloutError::Configuration(format!(
                "noise_std must be non-negative, got {}",
                self.data.noise_std
            )));
        }
        self.device()?;
        Ok(())
    }

    pub fn device(&self) -> RolloutResult<Device> {
        self.data.device.parse()
    }
}
