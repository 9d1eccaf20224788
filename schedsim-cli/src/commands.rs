use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use schedsim_config::{SchedsimConfig, SimulatorConfig};
use schedsim_simulator::sweep::run_sweep_parallel;
use schedsim_simulator::{digest, Simulator};
use schedsim_telemetry::MetricsRecorder;

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "schedsim", version, about)]
pub struct Cli {
    /// Configuration file; defaults to `config/schedsim.yaml` and `config/<SCHEDSIM_ENV>.yaml`
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one simulation and print its summary statistics
    Run(RunArgs),
    /// Run the parameter sweep and report aggregated statistics
    Sweep(SweepArgs),
    /// Print the resolved configuration
    Config,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Number of processes to create
    #[arg(short, long)]
    pub processes: Option<usize>,
    /// Mean interarrival time
    #[arg(short, long)]
    pub interval: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Fail unless the run reproduces this state digest
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Print the Prometheus exposition after the run
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// Write the YAML report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<SchedsimConfig> {
    match path {
        Some(path) => SchedsimConfig::load_from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => SchedsimConfig::load().context("loading configuration"),
    }
}

/// Command-line flags take precedence over every configuration layer.
pub fn apply_overrides(mut config: SimulatorConfig, args: &RunArgs) -> SimulatorConfig {
    if let Some(processes) = args.processes {
        config.process_count = processes;
    }
    if let Some(interval) = args.interval {
        config.mean_interarrival = interval;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Run(args) => run_mode(config, args).await,
        Commands::Sweep(args) => sweep_mode(config, args).await,
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

async fn run_mode(config: SchedsimConfig, args: RunArgs) -> anyhow::Result<()> {
    let simulator_config = apply_overrides(config.simulator, &args);
    let recorder = if args.metrics {
        Some(MetricsRecorder::new().map_err(CliError::from)?)
    } else {
        None
    };

    let mut simulator = Simulator::new(simulator_config).context("invalid run configuration")?;
    if let Some(recorder) = recorder.clone() {
        simulator = simulator.with_metrics(recorder);
    }
    let outcome = tokio::task::spawn_blocking(move || simulator.run())
        .await
        .context("simulation worker panicked")?
        .context("simulation failed")?;

    info!(digest = %outcome.digest, "Simulation complete");
    if let Some(expected) = args.validate_hash.as_deref() {
        if !digest::matches(&outcome.digest, expected) {
            return Err(CliError::DigestMismatch {
                expected: expected.to_string(),
                actual: outcome.digest,
            }
            .into());
        }
        info!("State digest validated");
    }

    print!("{}", serde_yaml::to_string(&outcome.summary)?);
    println!("digest: {}", outcome.digest);
    if let Some(recorder) = recorder {
        print!("{}", recorder.gather_metrics().map_err(CliError::from)?);
    }
    Ok(())
}

async fn sweep_mode(config: SchedsimConfig, args: SweepArgs) -> anyhow::Result<()> {
    info!(
        runs = config.sweep.total_runs(),
        workers = config.sweep.workers,
        "Starting sweep"
    );
    let report = run_sweep_parallel(&config.simulator, &config.sweep)
        .await
        .context("sweep failed")?;

    match args.output {
        Some(path) => {
            report
                .write_yaml(&path)
                .with_context(|| format!("writing sweep report to {}", path.display()))?;
            info!(path = %path.display(), rows = report.rows.len(), "Sweep report written");
        }
        None => print!("{}", report.to_yaml()?),
    }
    Ok(())
}
