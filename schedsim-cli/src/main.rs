//! ## schedsim-cli
//! **Command-line front end of the scheduler simulation**
//!
//! - `run`: one simulation, summary statistics and state digest
//! - `sweep`: repeated runs over the configured parameter grid
//! - `config`: the configuration after every layer is merged

use clap::Parser;
use schedsim_telemetry::EventLogger;

mod commands;
mod error;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    EventLogger::init();
    let cli = Cli::parse();
    commands::run_command(cli).await
}
