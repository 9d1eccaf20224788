//! # schedsim telemetry
//!
//! Logging setup and Prometheus metrics for simulation runs.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;

pub use prometheus::Error as MetricsError;
