pub mod simulation;
pub mod configuration;
pub mod dataset;
pub mod benchmark;
pub mod error;

pub use simulation::states::{Snapshot, ContextVector, ParticleType, GraphTopology, GlobalContext, PositionWindow};
pub use simulation::params::{Device, Stats, NormalizationStats};
pub use simulation::context::ContextWindowBuilder;
pub use simulation::simulator::{Simulator, SimulatorInput, Prediction, LoadReport};
pub use simulation::extrapolation::{ExtrapolationSimulator, ExtrapolationParams};
pub use simulation::engine::{RolloutEngine, EngineSettings, RolloutState, Rollout, CancelToken};
pub use simulation::record::{RecordedContext, RolloutRecord, TrajectoryWriter};
pub use simulation::runner::{RolloutRun, RolloutSummary};

pub use configuration::config::{RunConfig, EngineConfig, DataConfig, SimulatorConfig, KinematicPolicy};

pub use dataset::{Example, JsonExampleReader, DatasetMetadata, read_metadata};

pub use error::{RolloutError, SimulatorError, RolloutResult};

pub use benchmark::benchmark::{bench_rollout, lattice_example};
