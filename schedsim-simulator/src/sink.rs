//! Completion records and the sinks they are delivered to.

use serde::{Deserialize, Serialize};

use schedsim_core::SimTime;
use schedsim_telemetry::MetricsRecorder;

/// What a process reports when it reaches DONE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub pid: u64,
    /// Clock at completion minus the start time of the final lifecycle.
    pub total_time: SimTime,
    pub waiting_time: SimTime,
    pub restarts: u32,
    pub io_waits: u32,
    pub slices: u32,
    pub completed_at: SimTime,
}

/// Receives every completed process, in completion order.
pub trait MetricsSink {
    fn record(&mut self, report: &ProcessReport);
}

/// Keeps every report for summary statistics and digests.
#[derive(Debug, Default, Clone)]
pub struct CompletionLog {
    reports: Vec<ProcessReport>,
}

impl CompletionLog {
    pub fn reports(&self) -> &[ProcessReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<ProcessReport> {
        self.reports
    }
}

impl MetricsSink for CompletionLog {
    fn record(&mut self, report: &ProcessReport) {
        self.reports.push(report.clone());
    }
}

impl MetricsSink for MetricsRecorder {
    fn record(&mut self, report: &ProcessReport) {
        self.observe_completion(
            report.total_time,
            report.waiting_time,
            report.restarts,
            report.io_waits,
        );
    }
}

/// Run-wide task state: the completion log plus an optional Prometheus recorder.
#[derive(Default)]
pub struct RunSinks {
    pub log: CompletionLog,
    pub recorder: Option<MetricsRecorder>,
}

impl MetricsSink for RunSinks {
    fn record(&mut self, report: &ProcessReport) {
        self.log.record(report);
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(report);
        }
    }
}

/// Summary statistics of one run over its completed processes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub mean_total_time: f64,
    pub std_total_time: f64,
    pub mean_waiting_time: f64,
    pub std_waiting_time: f64,
    pub completed: usize,
}

impl RunSummary {
    pub fn is_finite(&self) -> bool {
        [
            self.mean_total_time,
            self.std_total_time,
            self.mean_waiting_time,
            self.std_waiting_time,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Mean and population standard deviation; `(0, 0)` for no samples.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub fn summarize(reports: &[ProcessReport]) -> RunSummary {
    let totals: Vec<f64> = reports.iter().map(|r| r.total_time).collect();
    let waits: Vec<f64> = reports.iter().map(|r| r.waiting_time).collect();
    let (mean_total_time, std_total_time) = mean_std(&totals);
    let (mean_waiting_time, std_waiting_time) = mean_std(&waits);
    RunSummary {
        mean_total_time,
        std_total_time,
        mean_waiting_time,
        std_waiting_time,
        completed: reports.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(pid: u64, total_time: f64, waiting_time: f64) -> ProcessReport {
        ProcessReport {
            pid,
            total_time,
            waiting_time,
            restarts: 0,
            io_waits: 0,
            slices: 1,
            completed_at: total_time,
        }
    }

    #[test]
    fn population_std() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
    }

    #[test]
    fn empty_run_summarizes_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary, RunSummary::default());
        assert!(summary.is_finite());
    }

    #[test]
    fn summary_over_reports() {
        let summary = summarize(&[report(0, 4.0, 0.0), report(1, 6.0, 2.0)]);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.mean_total_time, 5.0);
        assert_eq!(summary.std_total_time, 1.0);
        assert_eq!(summary.mean_waiting_time, 1.0);
        assert_eq!(summary.std_waiting_time, 1.0);
    }

    #[test]
    fn run_sinks_forward_to_recorder() {
        let mut sinks = RunSinks {
            log: CompletionLog::default(),
            recorder: Some(MetricsRecorder::new().unwrap()),
        };
        sinks.record(&report(3, 5.0, 1.0));
        assert_eq!(sinks.log.reports().len(), 1);
        let recorder = sinks.recorder.as_ref().unwrap();
        assert_eq!(recorder.completed_processes.get(), 1.0);
    }
}
