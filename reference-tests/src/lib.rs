//! Reference test framework for fluid simulation validation
//!
//! A [`ReferenceTest`] runs a configured scene for a fixed number of steps
//! and validates the final state (and, for rebound checks, the trajectory of
//! one particle) against analytical expectations.

pub mod analytical;
pub mod scenarios;


use fluid_kernel::{Diagnostics, SimError, Snapshot};
use fluid_orchestrator::{build_simulation, RunConfig};

/// Expected result criteria for a reference test
#[derive(Debug, Clone, Default)]
pub struct ExpectedResult {
    /// Particle position bounds validation
    pub position_bounds: Option<PositionBoundsCheck>,
    /// Conservation metrics validation
    pub conservation: Option<ConservationCheck>,
    /// Position of one particle against a known value
    pub trajectory: Option<TrajectoryCheck>,
    /// Rebound height of one particle after its first floor contact
    pub rebound: Option<ReboundCheck>,
    /// Upper bound on particle speed
    pub max_speed: Option<MaxSpeedCheck>,
}

/// Check that particles remain within specified bounds
#[derive(Debug, Clone)]
pub struct PositionBoundsCheck {
    /// Minimum allowed position [x, y, z]
    pub min: [f32; 3],
    /// Maximum allowed position [x, y, z]
    pub max: [f32; 3],
}

/// Check conservation metrics
#[derive(Debug, Clone)]
pub struct ConservationCheck {
    /// Maximum allowed relative mass error (0.0 to 1.0)
    pub max_mass_error: f64,
    /// Maximum allowed absolute momentum drift per axis, if momentum should be conserved
    pub max_momentum_drift: Option<f64>,
}

/// Check one particle's final position
#[derive(Debug, Clone)]
pub struct TrajectoryCheck {
    /// Particle index
    pub particle: usize,
    /// Expected final position
    pub expected: [f32; 3],
    /// Allowed distance from the expected position
    pub tolerance: f32,
}

/// Check the apex of one particle's first rebound
#[derive(Debug, Clone)]
pub struct ReboundCheck {
    /// Particle index
    pub particle: usize,
    /// Floor height
    pub floor_y: f32,
    /// Expected apex height above the floor
    pub expected_apex: f32,
    /// Relative tolerance (0.0 to 1.0)
    pub tolerance: f32,
}

/// Check that no particle moves faster than a limit
#[derive(Debug, Clone)]
pub struct MaxSpeedCheck {
    /// Largest allowed speed
    pub limit: f32,
}

/// Result of running a reference test
#[derive(Debug)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Whether test passed
    pub passed: bool,
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// Final diagnostics
    pub diagnostics: Diagnostics,
    /// Number of timesteps executed
    pub timesteps: u64,
    /// Simulated time (seconds)
    pub sim_time: f64,
}

/// Result of an individual validation check
#[derive(Debug)]
pub struct CheckResult {
    /// Check name
    pub name: String,
    /// Whether check passed
    pub passed: bool,
    /// Detail message
    pub message: Option<String>,
}

impl CheckResult {
    fn pass(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: Some(message),
        }
    }

    fn fail(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: Some(message),
        }
    }
}

/// A reference test case
#[derive(Debug, Clone)]
pub struct ReferenceTest {
    /// Test name
    pub name: String,
    /// Run configuration (parameters and scene)
    pub config: RunConfig,
    /// Number of timesteps to run
    pub timesteps: u64,
    /// Expected results to validate
    pub expected: ExpectedResult,
}

impl ReferenceTest {
    /// Run the reference test and return results
    pub fn run(&self) -> Result<TestResult, SimError> {
        tracing::info!("Running reference test: {}", self.name);

        let mut simulation = build_simulation(&self.config)?;
        let initial = simulation.diagnostics();
        tracing::info!(
            "Initialized: {} particles, h={}",
            simulation.particle_count(),
            simulation.params().smoothing_radius,
        );

        // Heights of the tracked particle, one per step
        let tracked = self.expected.rebound.as_ref().map(|check| check.particle);
        let mut history = Vec::new();

        tracing::info!("Running {} timesteps...", self.timesteps);
        for step in 0..self.timesteps {
            simulation.step()?;
            if let Some(particle) = tracked {
                history.push(simulation.snapshot().positions[particle][1]);
            }

            // Log progress every 10% of steps
            if (step + 1) % (self.timesteps / 10).max(1) == 0 {
                let progress = ((step + 1) as f32 / self.timesteps as f32) * 100.0;
                tracing::info!("Progress: {:.0}% ({}/{})", progress, step + 1, self.timesteps);
            }
        }
        tracing::info!(
            "Simulation complete: {} steps, {:.6}s simulated",
            simulation.step_count(),
            simulation.time()
        );

        let snapshot = simulation.snapshot();
        let diagnostics = simulation.diagnostics();

        let mut checks = Vec::new();
        if let Some(ref bounds) = self.expected.position_bounds {
            checks.push(validate_position_bounds(&snapshot, bounds));
        }
        if let Some(ref conservation) = self.expected.conservation {
            checks.push(validate_conservation(&initial, &diagnostics, conservation));
        }
        if let Some(ref trajectory) = self.expected.trajectory {
            checks.push(validate_trajectory(&snapshot, trajectory));
        }
        if let Some(ref rebound) = self.expected.rebound {
            checks.push(validate_rebound(&history, rebound));
        }
        if let Some(ref speed) = self.expected.max_speed {
            checks.push(validate_max_speed(&diagnostics, speed));
        }

        Ok(TestResult {
            name: self.name.clone(),
            passed: checks.iter().all(|c| c.passed),
            checks,
            diagnostics,
            timesteps: simulation.step_count(),
            sim_time: simulation.time(),
        })
    }
}

/// Validate that particles remain within specified bounds
fn validate_position_bounds(snapshot: &Snapshot, bounds: &PositionBoundsCheck) -> CheckResult {
    let mut violations = 0;
    let mut max_violation = 0.0_f32;

    for pos in &snapshot.positions {
        for axis in 0..3 {
            let below = bounds.min[axis] - pos[axis];
            let above = pos[axis] - bounds.max[axis];
            if below > 0.0 || above > 0.0 || pos[axis].is_nan() {
                violations += 1;
                max_violation = max_violation.max(below.max(above));
            }
        }
    }

    if violations == 0 {
        CheckResult::pass(
            "Position Bounds",
            format!("all {} particles inside", snapshot.len()),
        )
    } else {
        CheckResult::fail(
            "Position Bounds",
            format!(
                "{} coordinates out of bounds (max violation: {:.6} m)",
                violations, max_violation
            ),
        )
    }
}

/// Validate conservation metrics against the initial state
fn validate_conservation(initial: &Diagnostics, current: &Diagnostics, check: &ConservationCheck) -> CheckResult {
    let mass_error = if initial.total_mass.abs() > 1.0e-12 {
        ((current.total_mass - initial.total_mass) / initial.total_mass).abs()
    } else {
        (current.total_mass - initial.total_mass).abs()
    };
    let momentum_drift = (0..3)
        .map(|axis| (current.momentum[axis] - initial.momentum[axis]).abs())
        .fold(0.0_f64, f64::max);

    let mut issues = Vec::new();
    if mass_error > check.max_mass_error {
        issues.push(format!(
            "Mass: {:.3}% (limit: {:.3}%)",
            mass_error * 100.0,
            check.max_mass_error * 100.0
        ));
    }
    if let Some(limit) = check.max_momentum_drift {
        if momentum_drift > limit {
            issues.push(format!("Momentum drift: {:.3e} (limit: {:.3e})", momentum_drift, limit));
        }
    }

    if issues.is_empty() {
        CheckResult::pass(
            "Conservation",
            format!("Mass: {:.3}%, momentum drift: {:.3e}", mass_error * 100.0, momentum_drift),
        )
    } else {
        CheckResult::fail("Conservation", issues.join(", "))
    }
}

/// Validate one particle's final position
fn validate_trajectory(snapshot: &Snapshot, check: &TrajectoryCheck) -> CheckResult {
    let Some(pos) = snapshot.positions.get(check.particle) else {
        return CheckResult::fail("Trajectory", format!("no particle {}", check.particle));
    };
    let distance = (0..3)
        .map(|a| (pos[a] - check.expected[a]).powi(2))
        .sum::<f32>()
        .sqrt();
    let message = format!(
        "particle {} at {:?}, expected {:?} (distance {:.3e}, tolerance {:.3e})",
        check.particle, pos, check.expected, distance, check.tolerance
    );
    if distance <= check.tolerance {
        CheckResult::pass("Trajectory", message)
    } else {
        CheckResult::fail("Trajectory", message)
    }
}

/// Validate the apex reached after the first floor contact
fn validate_rebound(history: &[f32], check: &ReboundCheck) -> CheckResult {
    let Some(contact) = history.iter().position(|&y| y <= check.floor_y) else {
        return CheckResult::fail("Rebound", "particle never reached the floor".to_string());
    };
    // Apex of the first rebound: highest point before the next contact
    let apex = history[contact + 1..]
        .iter()
        .take_while(|&&y| y > check.floor_y)
        .fold(check.floor_y, |max, &y| max.max(y))
        - check.floor_y;

    let error = (apex - check.expected_apex).abs() / check.expected_apex.abs().max(1.0e-9);
    let message = format!(
        "contact at step {}, apex {:.5} m, expected {:.5} m (error {:.2}%, tolerance {:.1}%)",
        contact + 1,
        apex,
        check.expected_apex,
        error * 100.0,
        check.tolerance * 100.0
    );
    if error <= check.tolerance {
        CheckResult::pass("Rebound", message)
    } else {
        CheckResult::fail("Rebound", message)
    }
}

/// Validate the largest particle speed
fn validate_max_speed(diagnostics: &Diagnostics, check: &MaxSpeedCheck) -> CheckResult {
    let message = format!("max speed {:.3e} (limit {:.3e})", diagnostics.max_speed, check.limit);
    if diagnostics.max_speed <= check.limit {
        CheckResult::pass("Max Speed", message)
    } else {
        CheckResult::fail("Max Speed", message)
    }
}

impl TestResult {
    /// Print a summary of the test result
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("Test: {}", self.name);
        println!("{}", "=".repeat(80));
        println!("Status: {}", if self.passed { "PASSED" } else { "FAILED" });
        println!("Timesteps: {}", self.timesteps);
        println!("Simulated time: {:.6} s", self.sim_time);
        println!("\nDiagnostics:");
        println!("  Max density variation: {:.2}%", self.diagnostics.max_density_variation * 100.0);
        println!("  Max speed: {:.4} m/s", self.diagnostics.max_speed);
        println!("  Kinetic energy: {:.6e} J", self.diagnostics.kinetic_energy);
        println!("  Total mass: {:.6} kg", self.diagnostics.total_mass);
        println!("\nValidation Checks:");
        for check in &self.checks {
            let status = if check.passed { "PASS" } else { "FAIL" };
            print!("  [{}] {}", status, check.name);
            if let Some(ref msg) = check.message {
                print!(" - {}", msg);
            }
            println!();
        }
        println!("{}", "=".repeat(80));
    }
}

/// Pass/fail tally over a whole suite run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteSummary {
    /// Scenarios that ran to completion
    pub completed: usize,
    /// Completed scenarios whose checks all passed
    pub passed: usize,
    /// Scenarios aborted by a simulation error
    pub errored: usize,
}

impl SuiteSummary {
    /// Tally completed results plus the number of scenarios that errored out
    pub fn new(results: &[TestResult], errored: usize) -> Self {
        Self {
            completed: results.len(),
            passed: results.iter().filter(|r| r.passed).count(),
            errored,
        }
    }

    /// Scenarios that failed a check or errored out
    pub fn failed(&self) -> usize {
        self.completed - self.passed + self.errored
    }

    /// Whether every scenario ran and passed
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// One-line verdict for logs and the console
    pub fn verdict(&self) -> String {
        let status = if self.all_passed() { "ok" } else { "FAILED" };
        format!(
            "suite {}: {} of {} scenarios passed, {} failed checks, {} errors",
            status,
            self.passed,
            self.completed + self.errored,
            self.completed - self.passed,
            self.errored
        )
    }
}
