use std::time::Instant;

use crate::configuration::config::KinematicPolicy;
use crate::dataset::Example;
use crate::simulation::engine::{CancelToken, EngineSettings, RolloutEngine};
use crate::simulation::extrapolation::{ExtrapolationParams, ExtrapolationSimulator};
use crate::simulation::context::ContextWindowBuilder;
use crate::simulation::params::{NormalizationStats, Stats};
use crate::simulation::simulator::{Simulator, SimulatorInput};
use crate::simulation::states::{GlobalContext, GraphTopology, ParticleType, PositionWindow, Snapshot};

const WINDOW: usize = 5;

/// Square 2D lattice of `side * side` particles drifting along x, with
/// 4-neighbour edges and a linear temperature ramp as context.
pub fn lattice_example(side: usize, steps: usize) -> Example {
    let n = side * side;
    let positions = (0..WINDOW)
        .map(|t| {
            Snapshot::from_fn(n, 2, |i, d| {
                let (row, col) = (i / side, i % side);
                let base = if d == 0 { col as f64 } else { row as f64 };
                base + if d == 0 { 0.01 * t as f64 } else { 0.0 }
            })
        })
        .collect();

    let mut senders = Vec::new();
    let mut receivers = Vec::new();
    for i in 0..n {
        let (row, col) = (i / side, i % side);
        if col + 1 < side {
            senders.extend([i, i + 1]);
            receivers.extend([i + 1, i]);
        }
        if row + 1 < side {
            senders.extend([i, i + side]);
            receivers.extend([i + side, i]);
        }
    }

    let context = (0..WINDOW + steps).map(|t| 300.0 + 5.0 * t as f64).collect();

    Example {
        positions,
        particle_types: vec![ParticleType::METAL; n],
        topology: GraphTopology::new(n, senders, receivers),
        global_context: Some(GlobalContext::from_scalars(context)),
    }
}

fn bench_stats() -> Option<NormalizationStats> {
    Some(NormalizationStats {
        acceleration: Stats::new(vec![0.0, 0.0], &[1e-3, 1e-3], 6.7e-4).ok()?,
        velocity: Stats::new(vec![0.0, 0.0], &[1e-2, 1e-2], 6.7e-4).ok()?,
        context: Some(Stats::new(vec![500.0], &[200.0], 6.7e-4).ok()?),
    })
}

pub fn bench_rollout() {
    // Different lattice sides to test
    let sides = [8, 16, 32, 64];
    let steps = 50;

    let stats = match bench_stats() {
        Some(stats) => stats,
        None => return,
    };
    let settings = EngineSettings {
        input_sequence_length: WINDOW,
        predict_length: 1,
        num_particle_types: 3,
        kinematic_particle_id: 0,
        kinematic_policy: KinematicPolicy::Ignore,
        rollout_steps: None,
    };
    let engine = match RolloutEngine::new(settings) {
        Ok(engine) => engine,
        Err(e) => {
            println!("bench_rollout: {e}");
            return;
        }
    };

    for side in sides {
        let example = lattice_example(side, steps);
        let mut sim = ExtrapolationSimulator::new(
            stats.clone(),
            ExtrapolationParams {
                damping: 0.05,
                context_gain: 0.1,
                neighbor_coupling: 0.2,
            },
        );

        // Warm up
        let window = PositionWindow::new(example.positions.clone());
        let context = ContextWindowBuilder::new(example.global_context.as_ref(), WINDOW).warmup();
        let input = SimulatorInput {
            positions: &window,
            particle_types: &example.particle_types,
            topology: &example.topology,
            predict_length: 1,
            context: context.as_ref(),
        };
        if let Err(e) = sim.warmup(&input) {
            println!("bench_rollout: warmup failed for side {side}: {e}");
            continue;
        }

        // Time the full rollout
        let t0 = Instant::now();
        let result = engine.rollout(&sim, &example, &CancelToken::new());
        let dt = t0.elapsed().as_secs_f64();

        match result {
            Ok(rollout) => println!(
                "N = {:6}, edges = {:7}, steps = {}, total = {:8.6} s, per step = {:8.6} s",
                side * side,
                example.topology.num_edges(),
                rollout.predictions.len(),
                dt,
                dt / steps as f64
            ),
            Err(e) => println!("N = {:6}: rollout failed: {e}", side * side),
        }
    }
}
