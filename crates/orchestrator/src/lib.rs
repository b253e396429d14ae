//! Orchestration Layer
//!
//! This crate sets up and drives runs of the SPH fluid kernel:
//! - JSON run configuration loading and validation
//! - Initial particle layouts (scenes)
//! - Simulation runner with lifecycle management on a background thread

#![warn(missing_docs)]

pub mod config;
pub mod runner;
pub mod scene;

pub use config::{LoadError, RunConfig};
pub use runner::{RunLimits, RunnerError, RunnerState, SimulationRunner};
pub use scene::{Scene, MAX_SCENE_PARTICLES};

use std::path::Path;

use fluid_kernel::{SimError, Simulation};
use thiserror::Error;

/// Errors while setting up a run from a configuration file
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configuration could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The simulation rejected the generated particles
    #[error(transparent)]
    Simulation(#[from] SimError),
}

/// Build a simulation at time zero from an already loaded configuration
pub fn build_simulation(config: &RunConfig) -> Result<Simulation, SimError> {
    let records = config
        .scene
        .generate(config.params.domain_min, config.params.domain_max);
    Simulation::initialize(config.params.clone(), &records)
}

/// Create a complete simulation from a configuration file
///
/// This function performs the full simulation setup pipeline:
/// 1. Load and validate the configuration
/// 2. Generate the initial particles from the scene
/// 3. Initialize the simulation
/// 4. Wrap in a SimulationRunner for lifecycle management
///
/// # Example
/// ```no_run
/// use fluid_orchestrator::create_simulation;
///
/// let runner = create_simulation("config/dam_break.json")?;
/// runner.start();
/// // ... query status, pause, resume, etc.
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn create_simulation(config_path: impl AsRef<Path>) -> Result<SimulationRunner, SetupError> {
    let config_path = config_path.as_ref();
    tracing::info!("Creating simulation from config: {}", config_path.display());

    let config = RunConfig::load(config_path)?;
    tracing::info!("Configuration loaded: {}", config.name);

    let simulation = build_simulation(&config)?;

    let runner = SimulationRunner::new(
        simulation,
        RunLimits {
            max_steps: config.max_steps,
            max_time: config.max_time,
            retry_halvings: config.retry_halvings,
        },
    );

    tracing::info!("Simulation ready to start");
    Ok(runner)
}
