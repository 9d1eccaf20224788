//! ## schedsim-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Installs the process-wide subscriber and provides the span used to report
//! finished runs.

use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
    ///
    /// # Panics
    /// If a global subscriber is already installed.
    pub fn init() {
        Self::builder().init()
    }

    /// Like [`EventLogger::init`], but leaves an existing subscriber in place.
    pub fn try_init() -> bool {
        Self::builder().try_init().is_ok()
    }

    fn builder() -> fmt::SubscriberBuilder<
        fmt::format::DefaultFields,
        fmt::format::Format,
        EnvFilter,
    > {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .with_span_events(FmtSpan::CLOSE)
    }

    /// Reports the summary statistics of one finished run.
    pub fn log_run_summary(
        seed: u64,
        process_count: usize,
        mean_interarrival: f64,
        completed: usize,
        mean_total_time: f64,
        mean_waiting_time: f64,
    ) {
        let span = info_span!(
            "run_summary",
            seed,
            process_count,
            mean_interarrival,
        );
        let _enter = span.enter();

        tracing::info!(
            completed,
            mean_total_time,
            mean_waiting_time,
            "Simulation run finished"
        );
    }
}
