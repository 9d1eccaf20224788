//! Poisson arrivals: spawns the configured number of processes, sleeping an
//! exponentially distributed interval between consecutive creations.

use std::num::NonZeroU64;

use rand::Rng;
use tracing::{debug, trace};

use schedsim_config::InclusiveRange;
use schedsim_core::{Context, SimTime, SimulationError, Step, Task};

use crate::process::{ProcessParams, ProcessTask};
use crate::sink::MetricsSink;

/// Draws the initial remaining work of a new process.
///
/// Ranges are validated to start at 1, the lower bound is clamped anyway so
/// a process can never be created with nothing to do.
pub fn draw_work<R: Rng + ?Sized>(rng: &mut R, range: InclusiveRange) -> NonZeroU64 {
    let low = range.min.max(1);
    let high = range.max.max(low);
    let drawn = rng.random_range(low..=high);
    NonZeroU64::new(drawn).unwrap_or(NonZeroU64::MIN)
}

/// Inverse-CDF sample of an exponential distribution with the given mean.
pub fn exponential<R: Rng + ?Sized>(rng: &mut R, mean: SimTime) -> SimTime {
    // `random` is in [0, 1), so 1 - u is in (0, 1] and the log is finite.
    let u: f64 = rng.random();
    -mean * (1.0 - u).ln()
}

pub struct ArrivalGenerator {
    remaining: usize,
    next_pid: u64,
    mean_interarrival: SimTime,
    work_range: InclusiveRange,
    params: ProcessParams,
}

impl ArrivalGenerator {
    pub fn new(
        process_count: usize,
        mean_interarrival: SimTime,
        work_range: InclusiveRange,
        params: ProcessParams,
    ) -> Self {
        Self {
            remaining: process_count,
            next_pid: 0,
            mean_interarrival,
            work_range,
            params,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl<S: MetricsSink + 'static> Task<S> for ArrivalGenerator {
    fn resume(&mut self, cx: &mut Context<'_, S>) -> Result<Step, SimulationError> {
        if self.remaining == 0 {
            return Ok(Step::Exit);
        }

        let work = draw_work(cx.rng(), self.work_range);
        let pid = self.next_pid;
        let id = cx.spawn(Box::new(ProcessTask::new(pid, work, self.params)))?;
        debug!(pid, task = %id, work = work.get(), at = cx.now(), "process arrived");

        self.next_pid += 1;
        self.remaining -= 1;
        if self.remaining == 0 {
            return Ok(Step::Exit);
        }

        let gap = exponential(cx.rng(), self.mean_interarrival);
        trace!(gap, "next arrival scheduled");
        Ok(Step::Sleep(gap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CompletionLog;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use schedsim_core::Engine;

    #[test]
    fn exponential_mean_is_close() {
        let mut rng = SmallRng::seed_from_u64(5);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| exponential(&mut rng, 10.0)).sum();
        let mean = total / f64::from(n);
        assert!((mean - 10.0).abs() < 0.5, "sample mean {mean}");
    }

    #[test]
    fn exponential_is_never_negative() {
        let mut rng = SmallRng::seed_from_u64(9);
        assert!((0..10_000).all(|_| exponential(&mut rng, 1.0) >= 0.0));
    }

    #[test]
    fn spawns_every_process_once() {
        let mut engine = Engine::new(100, 42).unwrap();
        let mut log = CompletionLog::default();
        engine
            .spawn(Box::new(ArrivalGenerator::new(
                12,
                2.0,
                InclusiveRange { min: 1, max: 10 },
                ProcessParams::default(),
            )))
            .unwrap();
        let stats = engine.run(&mut log).unwrap();

        // Generator plus twelve processes.
        assert_eq!(stats.tasks_spawned, 13);
        let mut pids: Vec<u64> = log.reports().iter().map(|r| r.pid).collect();
        pids.sort_unstable();
        assert_eq!(pids, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn zero_processes_exit_immediately() {
        let mut engine = Engine::new(100, 1).unwrap();
        let mut log = CompletionLog::default();
        engine
            .spawn(Box::new(ArrivalGenerator::new(
                0,
                1.0,
                InclusiveRange { min: 1, max: 10 },
                ProcessParams::default(),
            )))
            .unwrap();
        let stats = engine.run(&mut log).unwrap();
        assert_eq!(stats.final_time, 0.0);
        assert!(log.reports().is_empty());
    }

    proptest! {
        #[test]
        fn generated_work_is_never_zero(seed in any::<u64>(), min in 0u64..20, span in 0u64..20) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let range = InclusiveRange { min, max: min + span };
            for _ in 0..64 {
                let work = draw_work(&mut rng, range).get();
                prop_assert!(work >= 1);
                prop_assert!(work <= (min + span).max(1));
            }
        }
    }
}
