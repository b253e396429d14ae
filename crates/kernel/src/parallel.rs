//! Per-particle stage execution, sequential or on the rayon pool.
//!
//! Every stage computes one output per particle from state the previous stage
//! has finished writing. `map_particles` returns only once all outputs exist,
//! which is the barrier between stages.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How per-particle stage work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Single thread, in index order.
    #[default]
    Sequential,
    /// Split particle indices across the rayon thread pool.
    Parallel,
}

impl ExecutionMode {
    /// Evaluate `f(i)` for every particle index `0..n`, collecting results in index order.
    pub fn map_particles<T, F>(self, n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ExecutionMode::Sequential => (0..n).map(f).collect(),
            ExecutionMode::Parallel => (0..n).into_par_iter().map(f).collect(),
        }
    }
}
