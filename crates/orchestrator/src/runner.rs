//! Simulation runner with lifecycle management
//!
//! This module provides the `SimulationRunner` which drives a [`Simulation`]
//! in a background thread, including start, pause, resume, stop and status
//! tracking. After every successful step the runner publishes a fresh
//! [`Snapshot`] that the host can read at any time without blocking the
//! simulation for longer than a pointer swap.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use fluid_kernel::{SimError, Simulation, SimulationParams, Snapshot, StepReport};
use thiserror::Error;

/// Runner state enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    /// Simulation created but not yet started
    Created,
    /// Simulation actively running
    Running,
    /// Simulation paused
    Paused,
    /// Simulation finished (reached stopping condition or stopped by the host)
    Finished,
    /// Simulation encountered an error
    Error,
}

/// Stopping conditions and retry policy for a run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunLimits {
    /// Stop after this many timesteps
    pub max_steps: Option<u64>,
    /// Stop after this much simulated time (seconds)
    pub max_time: Option<f64>,
    /// How many times a failed step is retried with a halved time step
    pub retry_halvings: u32,
}

/// Errors from joining the runner thread
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The background thread panicked
    #[error("simulation thread panicked")]
    Panicked,
}

/// Shared state between the runner thread and control interface
struct SharedState {
    /// Current runner state
    state: RunnerState,
    /// Current simulation time (seconds)
    sim_time: f64,
    /// Number of timesteps executed
    timestep_count: u64,
    /// Time-step halvings used so far
    retries: u64,
    /// Most recent error message (if state is Error)
    error_message: Option<String>,
    /// Front buffer: state after the last successful step
    latest: Arc<Snapshot>,
}

/// Lock the shared state. A poisoned lock means the worker panicked while
/// holding it; the run is marked as failed and the state is still returned.
fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            let mut guard = poisoned.into_inner();
            if guard.state != RunnerState::Error {
                guard.state = RunnerState::Error;
                guard.error_message = Some("simulation thread panicked".to_string());
            }
            guard
        }
    }
}

/// Handle for controlling and querying a running simulation
pub struct SimulationRunner {
    /// Shared state (protected by mutex)
    shared: Arc<Mutex<SharedState>>,
    /// Handle to the background thread
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SimulationRunner {
    /// Create a new runner around an initialized simulation
    ///
    /// The background thread is spawned immediately but waits for
    /// [`start`](Self::start) before stepping.
    pub fn new(simulation: Simulation, limits: RunLimits) -> Self {
        let shared = Arc::new(Mutex::new(SharedState {
            state: RunnerState::Created,
            sim_time: simulation.time(),
            timestep_count: simulation.step_count(),
            retries: 0,
            error_message: None,
            latest: Arc::new(simulation.snapshot()),
        }));

        let shared_clone = Arc::clone(&shared);

        // Spawn background thread
        let thread_handle = thread::spawn(move || {
            run_simulation_loop(simulation, shared_clone, limits);
        });

        Self {
            shared,
            thread_handle: Some(thread_handle),
        }
    }

    /// Get current runner state
    pub fn state(&self) -> RunnerState {
        lock(&self.shared).state.clone()
    }

    /// Get current simulation time (seconds)
    pub fn sim_time(&self) -> f64 {
        lock(&self.shared).sim_time
    }

    /// Get current timestep count
    pub fn timestep_count(&self) -> u64 {
        lock(&self.shared).timestep_count
    }

    /// Number of time-step halvings used to recover failed steps
    pub fn retries(&self) -> u64 {
        lock(&self.shared).retries
    }

    /// Get error message if state is Error
    pub fn error_message(&self) -> Option<String> {
        lock(&self.shared).error_message.clone()
    }

    /// State after the most recent successful step
    pub fn latest_snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&lock(&self.shared).latest)
    }

    /// Pause the simulation
    pub fn pause(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Running {
            state.state = RunnerState::Paused;
        }
    }

    /// Resume the simulation
    pub fn resume(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Paused {
            state.state = RunnerState::Running;
        }
    }

    /// Start the simulation (transition from Created to Running)
    pub fn start(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Created {
            state.state = RunnerState::Running;
        }
    }

    /// Ask the simulation to stop after the current step
    pub fn stop(&self) {
        let mut state = lock(&self.shared);
        if matches!(
            state.state,
            RunnerState::Created | RunnerState::Running | RunnerState::Paused
        ) {
            state.state = RunnerState::Finished;
        }
    }

    /// Wait for the simulation thread to complete
    pub fn join(mut self) -> Result<(), RunnerError> {
        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| RunnerError::Panicked)?;
        }
        Ok(())
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        // Set state to Finished to signal thread to exit
        self.stop();
    }
}

/// Step once, halving the time step on a recoverable failure.
///
/// Returns the report and the number of halvings used. The configured time
/// step is restored afterwards whether or not the step succeeded.
fn step_with_retry(
    simulation: &mut Simulation,
    base: &SimulationParams,
    retry_halvings: u32,
) -> Result<(StepReport, u32), SimError> {
    let mut halvings = 0;
    let result = loop {
        match simulation.step() {
            Ok(report) => break Ok(report),
            Err(err) if err.is_recoverable() && halvings < retry_halvings => {
                halvings += 1;
                let mut params = simulation.params().clone();
                params.time_step *= 0.5;
                tracing::warn!(
                    "{}; retrying with dt={} ({} of {})",
                    err,
                    params.time_step,
                    halvings,
                    retry_halvings
                );
                if let Err(config_err) = simulation.reconfigure(params) {
                    break Err(config_err);
                }
            }
            Err(err) => break Err(err),
        }
    };

    if halvings > 0 {
        simulation.reconfigure(base.clone())?;
    }
    result.map(|report| (report, halvings))
}

/// Main simulation loop executed in background thread
fn run_simulation_loop(mut simulation: Simulation, shared: Arc<Mutex<SharedState>>, limits: RunLimits) {
    // Wait for start signal
    loop {
        let state = lock(&shared).state.clone();

        match state {
            RunnerState::Created => {
                // Wait a bit and check again
                thread::sleep(Duration::from_millis(10));
            }
            RunnerState::Running => break,
            _ => return, // Exit if finished or error
        }
    }

    let start_wall_time = Instant::now();
    let base_params = simulation.params().clone();
    let mut totals = StepReport::default();

    tracing::info!(
        "Simulation thread started: {} particles, max_steps={:?}, max_time={:?}",
        simulation.particle_count(),
        limits.max_steps,
        limits.max_time
    );

    loop {
        // Check state
        let current_state = lock(&shared).state.clone();

        match current_state {
            RunnerState::Running => {
                // Execute one timestep
                match step_with_retry(&mut simulation, &base_params, limits.retry_halvings) {
                    Ok((report, halvings)) => {
                        totals.merge(report);
                        let snapshot = Arc::new(simulation.snapshot());
                        let mut guard = lock(&shared);
                        guard.sim_time = simulation.time();
                        guard.timestep_count = simulation.step_count();
                        guard.retries += halvings as u64;
                        guard.latest = snapshot;
                    }
                    Err(err) => {
                        tracing::error!("Simulation stopped: {}", err);
                        let mut guard = lock(&shared);
                        guard.state = RunnerState::Error;
                        guard.error_message = Some(err.to_string());
                        break;
                    }
                }

                let timestep_count = simulation.step_count();
                let sim_time = simulation.time();

                // Check stopping conditions
                if let Some(max_steps) = limits.max_steps {
                    if timestep_count >= max_steps {
                        tracing::info!("Simulation finished: reached max_steps = {}", max_steps);
                        lock(&shared).state = RunnerState::Finished;
                        break;
                    }
                }

                if let Some(max_t) = limits.max_time {
                    if sim_time >= max_t {
                        tracing::info!("Simulation finished: reached max_time = {:.3}s", max_t);
                        lock(&shared).state = RunnerState::Finished;
                        break;
                    }
                }

                // Log progress periodically
                if timestep_count % 100 == 0 {
                    let wall_time = start_wall_time.elapsed().as_secs_f64();
                    tracing::debug!(
                        "Step {}: sim_time={:.4}s, wall_time={:.2}s, collisions={}, clamped={}",
                        timestep_count,
                        sim_time,
                        wall_time,
                        totals.collisions,
                        totals.clamped,
                    );
                }
            }
            RunnerState::Paused => {
                // Wait while paused
                thread::sleep(Duration::from_millis(20));
            }
            RunnerState::Finished | RunnerState::Error | RunnerState::Created => {
                // Exit loop
                break;
            }
        }
    }

    tracing::info!(
        "Simulation thread exiting: {} timesteps, {:.4}s simulated, {:.2}s wall time",
        simulation.step_count(),
        simulation.time(),
        start_wall_time.elapsed().as_secs_f64()
    );
}
