//! ## schedsim-telemetry::metrics
//! **Prometheus registry for process completions**
//!
//! Each recorder owns its own registry, so concurrent runs in one process do
//! not collide on metric names.

use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};

/// Buckets in simulation time units.
const TIME_BUCKETS: [f64; 10] = [1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0];

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub completed_processes: Counter,
    pub ready_restarts: Counter,
    pub io_waits: Counter,
    pub service_time: Histogram,
    pub waiting_time: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let completed_processes = Counter::new(
            "schedsim_completed_processes_total",
            "Processes that reached the done state",
        )?;
        let ready_restarts = Counter::new(
            "schedsim_ready_restarts_total",
            "Times a process went back to memory acquisition",
        )?;
        let io_waits = Counter::new("schedsim_io_waits_total", "I/O waits taken by processes")?;

        let service_time = Histogram::with_opts(
            HistogramOpts::new(
                "schedsim_service_time",
                "Total service time of completed processes",
            )
            .buckets(TIME_BUCKETS.to_vec()),
        )?;
        let waiting_time = Histogram::with_opts(
            HistogramOpts::new(
                "schedsim_waiting_time",
                "Accumulated I/O waiting time of completed processes",
            )
            .buckets(TIME_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(completed_processes.clone()))?;
        registry.register(Box::new(ready_restarts.clone()))?;
        registry.register(Box::new(io_waits.clone()))?;
        registry.register(Box::new(service_time.clone()))?;
        registry.register(Box::new(waiting_time.clone()))?;

        Ok(Self {
            registry,
            completed_processes,
            ready_restarts,
            io_waits,
            service_time,
            waiting_time,
        })
    }

    /// Records one completed process.
    pub fn observe_completion(&self, total_time: f64, waiting_time: f64, restarts: u32, io_waits: u32) {
        self.completed_processes.inc();
        self.service_time.observe(total_time);
        self.waiting_time.observe(waiting_time);
        self.ready_restarts.inc_by(f64::from(restarts));
        self.io_waits.inc_by(f64::from(io_waits));
    }

    /// Renders the registry in the text exposition format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
