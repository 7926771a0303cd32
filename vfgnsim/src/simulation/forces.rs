//! Acceleration contributors for the built-in simulator
//!
//! Each term implements [`Acceleration`] and adds its share into a
//! `particles × dims` buffer; an [`AccelSet`] sums them in registration order.

use crate::simulation::params::Stats;
use crate::simulation::states::{ContextVector, GraphTopology, Snapshot};

/// Inputs shared by every acceleration term for one step
pub struct AccelInput<'a> {
    pub velocity: &'a Snapshot, // per-step displacement of the newest snapshot
    pub topology: &'a GraphTopology,
    pub context: Option<&'a ContextVector>,
}

/// Collection of acceleration terms
/// Each term implements [`Acceleration`] and their contributions are summed
/// into a single acceleration per particle
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelSet {
    /// Create an empty acceleration set
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add an acceleration term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: Acceleration + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Compute total accelerations into `out` (zeroed first)
    pub fn accumulate_accels(&self, input: &AccelInput<'_>, out: &mut Snapshot) {
        out.fill(0.0);
        for term in &self.terms {
            term.acceleration(input, out);
        }
    }
}

/// Trait for acceleration sources; implementations add into `out[(i, d)]`
pub trait Acceleration {
    fn acceleration(&self, input: &AccelInput<'_>, out: &mut Snapshot);
}

/// Dataset mean acceleration, one value per spatial dimension
pub struct MeanAcceleration {
    pub mean: Vec<f64>,
}

impl Acceleration for MeanAcceleration {
    fn acceleration(&self, _input: &AccelInput<'_>, out: &mut Snapshot) {
        if self.mean.is_empty() {
            return;
        }
        for mut row in out.row_iter_mut() {
            for (d, a) in row.iter_mut().enumerate() {
                *a += self.mean[d % self.mean.len()];
            }
        }
    }
}

/// Linear drag against the current velocity
pub struct VelocityDamping {
    pub damping: f64,
}

impl Acceleration for VelocityDamping {
    fn acceleration(&self, input: &AccelInput<'_>, out: &mut Snapshot) {
        if self.damping == 0.0 {
            return;
        }
        *out -= input.velocity * self.damping;
    }
}

/// Uniform drive from the global context.
///
/// The padded context row is normalized with the context stats and averaged;
/// the result is scaled by `gain` and the acceleration std per dimension.
pub struct ContextDrive {
    pub gain: f64,
    pub context_stats: Stats,
    pub acceleration_stats: Stats,
}

impl Acceleration for ContextDrive {
    fn acceleration(&self, input: &AccelInput<'_>, out: &mut Snapshot) {
        let ctx = match input.context {
            Some(ctx) if self.gain != 0.0 && !ctx.is_empty() => ctx,
            _ => return,
        };
        let drive = ctx
            .iter()
            .enumerate()
            .map(|(i, c)| self.context_stats.normalize(i, *c))
            .sum::<f64>()
            / ctx.len() as f64;

        for mut row in out.row_iter_mut() {
            for (d, a) in row.iter_mut().enumerate() {
                *a += self.gain * drive * self.acceleration_stats.std[d % self.acceleration_stats.len()];
            }
        }
    }
}

/// Message passing along graph edges: each receiver is pulled towards the
/// mean velocity of its senders.
pub struct NeighborCoupling {
    pub strength: f64,
}

impl Acceleration for NeighborCoupling {
    fn acceleration(&self, input: &AccelInput<'_>, out: &mut Snapshot) {
        if self.strength == 0.0 {
            return;
        }
        let v = input.velocity;
        let n = v.nrows();

        let mut in_degree = vec![0usize; n];
        for (_, r) in input.topology.edges() {
            in_degree[r] += 1;
        }

        for (s, r) in input.topology.edges() {
            let weight = self.strength / in_degree[r] as f64;
            let dv = v.row(s) - v.row(r);
            let mut row = out.row_mut(r);
            row += dv * weight;
        }
    }
}
