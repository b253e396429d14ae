//! Reference test binary entry point
//!
//! Runs every reference scenario at full length and exits non-zero if any
//! check fails.

use fluid_reference_tests::{scenarios, SuiteSummary, TestResult};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    tracing::info!("SPH Reference Test Suite");

    let tests = scenarios::all();
    tracing::info!("Found {} reference tests", tests.len());

    let mut results: Vec<TestResult> = Vec::new();
    let mut errored = 0;

    for test in tests {
        match test.run() {
            Ok(result) => {
                result.print_summary();
                results.push(result);
            }
            Err(e) => {
                tracing::error!("Scenario {} aborted: {}", test.name, e);
                errored += 1;
            }
        }
    }

    let summary = SuiteSummary::new(&results, errored);
    println!("\n{}", summary.verdict());

    if !summary.all_passed() {
        std::process::exit(1);
    }
}
