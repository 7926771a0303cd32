//! Normalization statistics and execution device
//!
//! `NormalizationStats` holds one `{mean, std}` pair per quantity:
//! - acceleration and velocity (per spatial dimension)
//! - global context (per context channel, absent for contextless datasets)
//!
//! Stats are built once from dataset metadata and never mutated afterwards;
//! the only allowed change is relocating them to another `Device`.

use std::fmt;
use std::str::FromStr;

use crate::error::{RolloutError, RolloutResult};

/// Opaque execution target. Simulators carry it; the engine never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(u32),
}

impl FromStr for Device {
    type Err = RolloutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "cpu" {
            return Ok(Device::Cpu);
        }
        if s == "cuda" {
            return Ok(Device::Cuda(0));
        }
        if let Some(idx) = s.strip_prefix("cuda:") {
            return idx
                .parse()
                .map(Device::Cuda)
                .map_err(|_| RolloutError::Configuration(format!("invalid device index in {s:?}")));
        }
        Err(RolloutError::Configuration(format!("unknown device {s:?}")))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(i) => write!(f, "cuda:{i}"),
        }
    }
}

/// Mean / scale pair for one quantity
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>, // always > 0
    device: Device,
}

impl Stats {
    /// Build from raw dataset statistics, folding in the training noise floor.
    /// Fails if any resulting scale is not strictly positive.
    pub fn new(mean: Vec<f64>, raw_std: &[f64], noise_std: f64) -> RolloutResult<Self> {
        if mean.is_empty() || mean.len() != raw_std.len() {
            return Err(RolloutError::Configuration(format!(
                "stats need matching non-empty mean/std, got {} and {} components",
                mean.len(),
                raw_std.len()
            )));
        }
        let std = combine_std(raw_std, noise_std);
        if let Some(bad) = std.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(RolloutError::Configuration(format!(
                "normalization scale must be positive, got {bad}"
            )));
        }
        Ok(Self {
            mean,
            std,
            device: Device::Cpu,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Relocate to another device
    pub fn to(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// `(x - mean) / std` for component `i` (wrapping on the component count)
    pub fn normalize(&self, i: usize, x: f64) -> f64 {
        let k = i % self.mean.len();
        (x - self.mean[k]) / self.std[k]
    }

    /// `x * std + mean` for component `i`
    pub fn denormalize(&self, i: usize, x: f64) -> f64 {
        let k = i % self.mean.len();
        x * self.std[k] + self.mean[k]
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Combine dataset std with the noise std: `sqrt(std^2 + noise^2)`
pub fn combine_std(std: &[f64], noise_std: f64) -> Vec<f64> {
    std.iter().map(|s| (s * s + noise_std * noise_std).sqrt()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    pub acceleration: Stats,
    pub velocity: Stats,
    pub context: Option<Stats>,
}

impl NormalizationStats {
    pub fn device(&self) -> Device {
        self.acceleration.device()
    }

    pub fn to(self, device: Device) -> Self {
        Self {
            acceleration: self.acceleration.to(device),
            velocity: self.velocity.to(device),
            context: self.context.map(|c| c.to(device)),
        }
    }
}
