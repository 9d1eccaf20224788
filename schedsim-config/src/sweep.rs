//! Parameter sweep configuration.
//!
//! A sweep runs the simulator for every (interval, process count) pair a
//! fixed number of times and aggregates the per-run means.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;
use crate::ConfigError;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    /// Process counts to simulate.
    #[validate(length(min = 1))]
    pub process_counts: Vec<usize>,
    /// Mean interarrival times to simulate.
    #[validate(length(min = 1))]
    pub intervals: Vec<f64>,
    /// Runs per (interval, process count) pair. Run `i` uses seed `seed + i`.
    #[validate(range(min = 1))]
    pub repetitions: usize,
    /// Runs executed concurrently.
    #[serde(default = "default_workers")]
    #[validate(range(min = 1))]
    pub workers: usize,
}

fn default_workers() -> usize {
    num_cpus::get()
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            process_counts: vec![25, 50, 100, 150, 200],
            intervals: vec![10.0, 5.0, 1.0],
            repetitions: 5,
            workers: default_workers(),
        }
    }
}

impl SweepConfig {
    /// Runs field validation followed by the cross-field checks.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        validation::check_sweep(self)
    }

    /// Number of simulations the sweep performs.
    pub fn total_runs(&self) -> usize {
        self.process_counts.len() * self.intervals.len() * self.repetitions
    }
}
