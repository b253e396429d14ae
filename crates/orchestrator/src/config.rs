//! Run configuration parsing and validation

use std::fs;
use std::path::{Path, PathBuf};

use fluid_kernel::{ConfigError, SimulationParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::{Scene, MAX_SCENE_PARTICLES};

/// Everything needed to set up and drive one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Human-readable run name
    pub name: String,
    /// Physical and numerical parameters
    #[serde(default)]
    pub params: SimulationParams,
    /// Initial particle layout
    pub scene: Scene,
    /// Stop after this many timesteps
    #[serde(default)]
    pub max_steps: Option<u64>,
    /// Stop after this much simulated time (seconds)
    #[serde(default)]
    pub max_time: Option<f64>,
    /// How many times a failed step is retried with a halved time step
    #[serde(default = "default_retry_halvings")]
    pub retry_halvings: u32,
}

fn default_retry_halvings() -> u32 {
    3
}

/// Errors while loading a run configuration
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration JSON
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// Simulation parameters are invalid
    #[error(transparent)]
    Params(#[from] ConfigError),
    /// Run-level settings are invalid
    #[error("invalid run settings: {0}")]
    Invalid(String),
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(contents: &str) -> Result<Self, LoadError> {
        let config: RunConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LoadError> {
        self.params.validate()?;

        if let Some(max_steps) = self.max_steps {
            if max_steps == 0 {
                return Err(LoadError::Invalid("max_steps must be at least 1".to_string()));
            }
        }

        if let Some(max_time) = self.max_time {
            if !(max_time.is_finite() && max_time > 0.0) {
                return Err(LoadError::Invalid("max_time must be positive".to_string()));
            }
        }

        match self.scene {
            Scene::Block {
                min,
                max,
                spacing,
                density,
            } => {
                let ordered = |a: usize| min[a].is_finite() && max[a].is_finite() && min[a] < max[a];
                if let Some(axis) = (0..3).find(|&a| !ordered(a)) {
                    return Err(LoadError::Invalid(format!(
                        "block min must be below max on axis {axis} (min {}, max {})",
                        min[axis], max[axis]
                    )));
                }
                if !(spacing.is_finite() && spacing > 0.0) {
                    return Err(LoadError::Invalid("block spacing must be positive".to_string()));
                }
                if !(density.is_finite() && density > 0.0) {
                    return Err(LoadError::Invalid("block density must be positive".to_string()));
                }
            }
            Scene::Explosion { max_speed, .. } => {
                if !(max_speed.is_finite() && max_speed >= 0.0) {
                    return Err(LoadError::Invalid(
                        "explosion max_speed must be non-negative".to_string(),
                    ));
                }
            }
            Scene::Line { .. } | Scene::TwoLines { .. } | Scene::Uniform { .. } => {}
        }

        match self.scene.particle_count() {
            Some(count) if count <= MAX_SCENE_PARTICLES => {}
            Some(count) => {
                return Err(LoadError::Invalid(format!(
                    "scene has {count} particles, limit is {MAX_SCENE_PARTICLES}"
                )));
            }
            None => {
                return Err(LoadError::Invalid("scene particle count overflows".to_string()));
            }
        }

        Ok(())
    }
}
