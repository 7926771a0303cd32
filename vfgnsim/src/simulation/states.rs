//! Core state types for the rollout.
//!
//! - `Snapshot`: one position per particle, stored as a `particles × dims` matrix
//! - `PositionWindow`: the last `W` snapshots, oldest first
//! - `ParticleType`, `GraphTopology`, `GlobalContext`: per-example inputs that
//!   stay fixed for every step of a rollout

use std::collections::VecDeque;

use nalgebra::{DMatrix, RowDVector};

/// Positions of every particle at one instant (`particles × dims`)
pub type Snapshot = DMatrix<f64>;

/// Flattened context row handed to the simulator (`[1, (L - 1) * context_dim]`)
pub type ContextVector = RowDVector<f64>;

/// Integer particle label as stored in the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleType(pub u8);

impl ParticleType {
    pub const KINEMATIC: ParticleType = ParticleType(0); // anchor point
    pub const ANCHOR_PLANE: ParticleType = ParticleType(1);
    pub const METAL: ParticleType = ParticleType(2); // free particles

    pub fn id(self) -> u8 {
        self.0
    }
}

/// Message-passing edges of one example
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTopology {
    pub senders: Vec<usize>,
    pub receivers: Vec<usize>,
    pub n_particles_per_example: Vec<usize>,
    pub n_edges_per_example: Vec<usize>,
}

impl GraphTopology {
    /// Single-example topology; the per-example counts are derived from the inputs.
    pub fn new(n_particles: usize, senders: Vec<usize>, receivers: Vec<usize>) -> Self {
        let n_edges = senders.len();
        Self {
            senders,
            receivers,
            n_particles_per_example: vec![n_particles],
            n_edges_per_example: vec![n_edges],
        }
    }

    pub fn num_particles(&self) -> usize {
        self.n_particles_per_example.iter().sum()
    }

    pub fn num_edges(&self) -> usize {
        self.senders.len()
    }

    /// Iterate `(sender, receiver)` pairs
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.senders.iter().copied().zip(self.receivers.iter().copied())
    }
}

/// External driving signal, one row of `dim` values per absolute simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalContext {
    dim: usize,
    values: Vec<f64>, // row-major, steps × dim
    scalar: bool,     // read as a flat list rather than rows
}

impl GlobalContext {
    /// Build from per-step rows. Returns `None` if rows have mixed widths.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let dim = rows.first().map(|r| r.len()).unwrap_or(1);
        if dim == 0 || rows.iter().any(|r| r.len() != dim) {
            return None;
        }
        Some(Self {
            dim,
            values: rows.iter().flatten().copied().collect(),
            scalar: false,
        })
    }

    /// Scalar context, one value per step
    pub fn from_scalars(values: Vec<f64>) -> Self {
        Self {
            dim: 1,
            values,
            scalar: true,
        }
    }

    /// Number of steps `L`
    pub fn len(&self) -> usize {
        self.values.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `true` when built from one scalar per step
    pub fn is_scalar(&self) -> bool {
        self.scalar
    }

    /// Flat row-major values of the first `steps` steps, `None` past the end
    pub fn prefix(&self, steps: usize) -> Option<&[f64]> {
        self.values.get(..steps * self.dim)
    }

    /// Flat row-major values of every step
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.dim).map(|c| c.to_vec()).collect()
    }
}

/// Fixed-length history of the most recent snapshots, oldest → newest.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionWindow {
    snapshots: VecDeque<Snapshot>,
}

impl PositionWindow {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self {
            snapshots: snapshots.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn newest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// Snapshot `age` steps before the newest one (0 = newest)
    pub fn back(&self, age: usize) -> Option<&Snapshot> {
        let n = self.snapshots.len();
        if age >= n {
            return None;
        }
        self.snapshots.get(n - 1 - age)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Drop the oldest snapshot and append `next`; the length never changes.
    pub fn advance(&mut self, next: Snapshot) {
        self.snapshots.pop_front();
        self.snapshots.push_back(next);
    }

    /// `(particles, dims)` of the newest snapshot
    pub fn shape(&self) -> (usize, usize) {
        self.newest().map(|s| s.shape()).unwrap_or((0, 0))
    }
}

/// Convert a snapshot to nested rows for JSON output
pub fn snapshot_rows(s: &Snapshot) -> Vec<Vec<f64>> {
    s.row_iter().map(|r| r.iter().copied().collect()).collect()
}

/// Build a snapshot from per-particle rows. Returns `None` on ragged input.
pub fn snapshot_from_rows(rows: &[Vec<f64>]) -> Option<Snapshot> {
    let n = rows.len();
    let dims = rows.first().map(|r| r.len()).unwrap_or(0);
    if rows.iter().any(|r| r.len() != dims) {
        return None;
    }
    Some(DMatrix::from_fn(n, dims, |i, j| rows[i][j]))
}
