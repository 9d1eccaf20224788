//! Parameter sweep: repeated independent runs over a grid of interarrival
//! means and process counts, aggregated into one row per grid point.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

use schedsim_config::{SimulatorConfig, SweepConfig};

use crate::sink::mean_std;
use crate::{RunError, RunSummary, Simulator};

/// One simulation of the sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepCase {
    pub interval: f64,
    pub process_count: usize,
    pub repetition: usize,
}

/// Grid points in report order: intervals outermost, then process counts,
/// then repetitions.
pub fn plan(sweep: &SweepConfig) -> Vec<SweepCase> {
    let mut cases = Vec::with_capacity(sweep.total_runs());
    for &interval in &sweep.intervals {
        for &process_count in &sweep.process_counts {
            for repetition in 0..sweep.repetitions {
                cases.push(SweepCase {
                    interval,
                    process_count,
                    repetition,
                });
            }
        }
    }
    cases
}

/// The base configuration specialised to one case. Repetition `i` runs with
/// seed `base.seed + i`.
pub fn case_config(base: &SimulatorConfig, case: &SweepCase) -> SimulatorConfig {
    SimulatorConfig {
        process_count: case.process_count,
        mean_interarrival: case.interval,
        seed: base.seed.wrapping_add(case.repetition as u64),
        ..base.clone()
    }
}

/// Aggregate over the repetitions of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub interval: f64,
    pub process_count: usize,
    pub runs: usize,
    /// Mean and standard deviation of the per-run mean service time.
    pub mean_total_time: f64,
    pub std_total_time: f64,
    pub mean_waiting_time: f64,
    pub std_waiting_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub generated_at: DateTime<Utc>,
    pub base_seed: u64,
    pub repetitions: usize,
    pub rows: Vec<SweepRow>,
}

impl SweepReport {
    pub fn to_yaml(&self) -> Result<String, RunError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn write_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), RunError> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

/// Folds per-run summaries, given in [`plan`] order, into rows.
fn aggregate(
    base: &SimulatorConfig,
    sweep: &SweepConfig,
    results: &[(SweepCase, RunSummary)],
) -> SweepReport {
    let rows = results
        .chunks(sweep.repetitions.max(1))
        .filter_map(|chunk| {
            let first = chunk.first()?;
            let totals: Vec<f64> = chunk.iter().map(|(_, s)| s.mean_total_time).collect();
            let waits: Vec<f64> = chunk.iter().map(|(_, s)| s.mean_waiting_time).collect();
            let (mean_total_time, std_total_time) = mean_std(&totals);
            let (mean_waiting_time, std_waiting_time) = mean_std(&waits);
            Some(SweepRow {
                interval: first.0.interval,
                process_count: first.0.process_count,
                runs: chunk.len(),
                mean_total_time,
                std_total_time,
                mean_waiting_time,
                std_waiting_time,
            })
        })
        .collect();

    SweepReport {
        generated_at: Utc::now(),
        base_seed: base.seed,
        repetitions: sweep.repetitions,
        rows,
    }
}

fn run_case(base: &SimulatorConfig, case: SweepCase) -> Result<(SweepCase, RunSummary), RunError> {
    let summary = Simulator::new(case_config(base, &case))?.run()?.summary;
    debug!(?case, mean_total_time = summary.mean_total_time, "sweep case finished");
    Ok((case, summary))
}

/// Runs every case on the calling thread.
#[instrument(skip_all, fields(runs = sweep.total_runs()))]
pub fn run_sweep(base: &SimulatorConfig, sweep: &SweepConfig) -> Result<SweepReport, RunError> {
    sweep.check()?;
    let results = plan(sweep)
        .into_iter()
        .map(|case| run_case(base, case))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(aggregate(base, sweep, &results))
}

/// Runs cases on blocking worker threads, at most `sweep.workers` at a time.
///
/// Every run owns its engine and seed, so the report equals that of
/// [`run_sweep`] apart from the timestamp.
#[instrument(skip_all, fields(runs = sweep.total_runs(), workers = sweep.workers))]
pub async fn run_sweep_parallel(
    base: &SimulatorConfig,
    sweep: &SweepConfig,
) -> Result<SweepReport, RunError> {
    sweep.check()?;
    let permits = Arc::new(Semaphore::new(sweep.workers.max(1)));
    let mut handles = Vec::with_capacity(sweep.total_runs());

    for case in plan(sweep) {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .map_err(|e| RunError::Worker(e.to_string()))?;
        let config = base.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run_case(&config, case)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await??);
    }

    info!(rows = sweep.process_counts.len() * sweep.intervals.len(), "sweep finished");
    Ok(aggregate(base, sweep, &results))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_sweep() -> SweepConfig {
        SweepConfig {
            process_counts: vec![5, 10],
            intervals: vec![4.0, 1.0],
            repetitions: 3,
            workers: 2,
        }
    }

    #[test]
    fn plan_orders_intervals_then_counts_then_repetitions() {
        let cases = plan(&small_sweep());
        assert_eq!(cases.len(), 12);
        assert_eq!(
            cases[0],
            SweepCase {
                interval: 4.0,
                process_count: 5,
                repetition: 0
            }
        );
        assert_eq!(cases[3].process_count, 10);
        assert_eq!(cases[6].interval, 1.0);
    }

    #[test]
    fn repetitions_use_consecutive_seeds() {
        let base = SimulatorConfig {
            seed: 100,
            ..SimulatorConfig::default()
        };
        let case = SweepCase {
            interval: 2.0,
            process_count: 7,
            repetition: 4,
        };
        let config = case_config(&base, &case);
        assert_eq!(config.seed, 104);
        assert_eq!(config.process_count, 7);
        assert_eq!(config.mean_interarrival, 2.0);
        assert_eq!(config.quantum, base.quantum);
    }

    #[test]
    fn sequential_sweep_has_one_row_per_grid_point() {
        let report = run_sweep(&SimulatorConfig::default(), &small_sweep()).unwrap();
        assert_eq!(report.rows.len(), 4);
        for row in &report.rows {
            assert_eq!(row.runs, 3);
            assert!(row.mean_total_time >= 2.0);
            assert!(row.std_total_time >= 0.0);
        }
        let yaml = report.to_yaml().unwrap();
        assert!(yaml.contains("generated_at"));
        assert!(yaml.contains("process_count: 10"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn parallel_sweep_matches_sequential() {
        let base = SimulatorConfig::default();
        let sweep = small_sweep();
        let sequential = run_sweep(&base, &sweep).unwrap();
        let parallel = run_sweep_parallel(&base, &sweep).await.unwrap();
        assert_eq!(sequential.rows, parallel.rows);
    }

    #[test]
    fn empty_grid_is_a_config_error() {
        let sweep = SweepConfig {
            intervals: vec![],
            ..small_sweep()
        };
        assert!(matches!(
            run_sweep(&SimulatorConfig::default(), &sweep),
            Err(RunError::Config(_))
        ));
    }
}
