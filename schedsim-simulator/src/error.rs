use thiserror::Error;
use tokio::task::JoinError;

use schedsim_config::ConfigError;
use schedsim_core::SimulationError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Memory ledger unbalanced after the run: acquired {acquired}, released {released}")]
    Unbalanced { acquired: u64, released: u64 },

    #[error("Sweep worker failed: {0}")]
    Worker(String),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JoinError> for RunError {
    fn from(err: JoinError) -> Self {
        RunError::Worker(err.to_string())
    }
}
