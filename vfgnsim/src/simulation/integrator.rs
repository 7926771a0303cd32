//! Unit-step position integrator for learned simulators
//!
//! Models predict per-step accelerations; positions advance with a
//! semi-implicit Euler update on a unit time step:
//! - `v_t     = x_t - x_{t-1}`
//! - `v_{t+1} = v_t + a_t`
//! - `x_{t+1} = x_t + v_{t+1}`

use crate::simulation::states::{PositionWindow, Snapshot};

/// Most recent per-step velocity `x_t - x_{t-1}`.
/// Needs at least two snapshots in the window.
pub fn finite_difference_velocity(window: &PositionWindow) -> Option<Snapshot> {
    let newest = window.back(0)?;
    let previous = window.back(1)?;
    Some(newest - previous)
}

/// Advance `position` by one step given its velocity and acceleration.
/// Returns `(next_position, next_velocity)`.
pub fn euler_step(position: &Snapshot, velocity: &Snapshot, acceleration: &Snapshot) -> (Snapshot, Snapshot) {
    // Kick: v_{t+1} = v_t + a_t
    let next_velocity = velocity + acceleration;
    // Drift: x_{t+1} = x_t + v_{t+1}
    let next_position = position + &next_velocity;
    (next_position, next_velocity)
}
