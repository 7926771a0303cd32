pub mod states;
pub mod params;
pub mod context;
pub mod simulator;
pub mod forces;
pub mod integrator;
pub mod extrapolation;
pub mod engine;
pub mod record;
pub mod runner;
