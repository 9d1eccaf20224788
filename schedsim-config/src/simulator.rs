//! Simulator configuration.
//!
//! Every constant the model uses is injected from here, so a harness can vary
//! any of them between runs.
use std::path::Path;
use std::path::PathBuf;

use figment::providers::Format;
use figment::providers::Yaml;
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;
use crate::ConfigError;

/// Parameters of a single simulation run.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Number of processes the arrival generator creates.
    #[validate(range(min = 1))]
    pub process_count: usize,
    /// Mean of the exponential interarrival time.
    #[validate(range(exclusive_min = 0.0))]
    pub mean_interarrival: f64,
    /// Instructions executed per time unit.
    #[validate(range(exclusive_min = 0.0))]
    pub cpu_speed: f64,
    /// Units in the memory pool.
    #[validate(range(min = 1))]
    pub memory_capacity: u64,
    /// Instructions dispatched per processor turn.
    #[validate(range(min = 1))]
    pub quantum: u32,
    /// Seed for deterministic simulation.
    pub seed: u64,
    /// Initial remaining work of a process, drawn uniformly.
    #[validate(nested)]
    pub work_range: InclusiveRange,
    /// Memory requirement of a process, drawn uniformly on every (re)entry.
    #[validate(nested)]
    pub memory_range: InclusiveRange,
    /// One-time delay after memory is granted.
    #[validate(range(min = 0.0))]
    pub allocation_delay: f64,
    /// Duration of an I/O wait.
    #[validate(range(min = 0.0))]
    pub io_wait: f64,
    /// Faces of the die rolled after an unfinished slice. Face 1 waits for
    /// I/O, face 2 goes back to ready, the rest stay ready.
    #[validate(range(min = 2))]
    pub preemption_die: u32,
    /// Resumptions after which a run is declared stuck.
    #[validate(range(min = 1))]
    pub max_events: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            process_count: 25,
            mean_interarrival: 10.0,
            cpu_speed: 1.0,
            memory_capacity: 100,
            quantum: 3,
            seed: 42,
            work_range: InclusiveRange { min: 1, max: 10 },
            memory_range: InclusiveRange { min: 1, max: 10 },
            allocation_delay: 1.0,
            io_wait: 1.0,
            preemption_die: 21,
            max_events: 50_000_000,
        }
    }
}

impl SimulatorConfig {
    /// Runs field validation followed by the cross-field checks.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        validation::check_simulator(self)
    }

    /// Time one instruction takes at the configured speed.
    pub fn instruction_time(&self) -> f64 {
        1.0 / self.cpu_speed
    }

    /// Load only SimulatorConfig from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::new()
            .merge(Yaml::file(path))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.check()?;
                Ok(config)
            })
    }
}

/// Closed integer interval `min..=max`.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, Copy, PartialEq, Eq)]
pub struct InclusiveRange {
    #[validate(range(min = 1))]
    pub min: u64,
    #[validate(range(min = 1))]
    pub max: u64,
}

impl InclusiveRange {
    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}
