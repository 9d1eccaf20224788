/*!
# schedsim simulator

Process-level model of an operating-system scheduler on top of the
`schedsim-core` engine: processes arrive as a Poisson stream, queue for
memory, take turns on a single processor in fixed quanta, and occasionally
wait for I/O or restart their lifecycle.

## Key Components:
- **Process Task:** per-process lifecycle state machine (`process`)
- **Arrival Generator:** exponential interarrival spawner (`arrival`)
- **Metrics Sink:** completion reports, summaries and the Prometheus bridge (`sink`)
- **State Digest:** BLAKE3 fingerprint for bit-identical reproducibility (`digest`)
- **Sweep Harness:** repeated runs over a parameter grid (`sweep`)
*/

use tracing::{error, instrument};

use schedsim_config::SimulatorConfig;
use schedsim_core::{Engine, RunStats};
use schedsim_telemetry::{EventLogger, MetricsRecorder};

pub mod arrival;
pub mod digest;
pub mod error;
pub mod process;
pub mod sink;
pub mod sweep;

pub use arrival::ArrivalGenerator;
pub use error::RunError;
pub use process::{ProcessParams, ProcessTask};
pub use sink::{CompletionLog, MetricsSink, ProcessReport, RunSinks, RunSummary};

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    /// Completed processes, in completion order.
    pub reports: Vec<ProcessReport>,
    pub stats: RunStats,
    /// Hex BLAKE3 digest of `reports` and the final clock.
    pub digest: String,
}

/// One configured simulation. Each call to [`Simulator::run`] builds a fresh
/// engine, so runs never share clock, resources or random state.
pub struct Simulator {
    config: SimulatorConfig,
    recorder: Option<MetricsRecorder>,
}

impl Simulator {
    /// Validates `config`; a malformed configuration never reaches the engine.
    pub fn new(config: SimulatorConfig) -> Result<Self, RunError> {
        config.check()?;
        Ok(Self {
            config,
            recorder: None,
        })
    }

    /// Forwards every completion to a Prometheus recorder as well.
    pub fn with_metrics(mut self, recorder: MetricsRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    #[instrument(
        skip(self),
        fields(
            seed = self.config.seed,
            processes = self.config.process_count,
            interval = self.config.mean_interarrival
        )
    )]
    pub fn run(&self) -> Result<RunOutcome, RunError> {
        let config = &self.config;
        let mut engine = Engine::new(config.memory_capacity, config.seed)?
            .with_step_limit(config.max_events);
        engine.spawn(Box::new(ArrivalGenerator::new(
            config.process_count,
            config.mean_interarrival,
            config.work_range,
            ProcessParams::from_config(config),
        )))?;

        let mut sinks = RunSinks {
            log: CompletionLog::default(),
            recorder: self.recorder.clone(),
        };
        let stats = engine.run(&mut sinks).inspect_err(|err| {
            error!(%err, "simulation aborted");
        })?;

        if !stats.memory.is_balanced() {
            return Err(RunError::Unbalanced {
                acquired: stats.memory.acquired_total(),
                released: stats.memory.released_total(),
            });
        }

        let reports = sinks.log.into_reports();
        let summary = sink::summarize(&reports);
        let digest = digest::state_digest(&reports, stats.final_time);

        EventLogger::log_run_summary(
            config.seed,
            config.process_count,
            config.mean_interarrival,
            summary.completed,
            summary.mean_total_time,
            summary.mean_waiting_time,
        );

        Ok(RunOutcome {
            summary,
            reports,
            stats,
            digest,
        })
    }
}

/// Runs the default model with the given population and arrival rate.
pub fn run_simulation(
    process_count: usize,
    mean_interarrival: f64,
) -> Result<RunSummary, RunError> {
    let config = SimulatorConfig {
        process_count,
        mean_interarrival,
        ..SimulatorConfig::default()
    };
    Ok(Simulator::new(config)?.run()?.summary)
}
