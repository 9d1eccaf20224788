use thiserror::Error;

use schedsim_telemetry::MetricsError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("State digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Metrics unavailable: {0}")]
    Metrics(#[from] MetricsError),
}
