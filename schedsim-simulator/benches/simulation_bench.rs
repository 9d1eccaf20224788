#[macro_use]
extern crate criterion;

use criterion::{black_box, BenchmarkId, Criterion};
use schedsim_config::SimulatorConfig;
use schedsim_simulator::Simulator;

/// Full runs at increasing load; the shortest interval keeps the memory
/// queue longest.
fn benchmark_simulation_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_run");
    for (process_count, interval) in [(25, 10.0), (100, 5.0), (200, 1.0)] {
        let simulator = match Simulator::new(SimulatorConfig {
            process_count,
            mean_interarrival: interval,
            ..SimulatorConfig::default()
        }) {
            Ok(simulator) => simulator,
            Err(err) => panic!("benchmark config rejected: {err}"),
        };
        group.bench_with_input(
            BenchmarkId::new(format!("interval_{interval}"), process_count),
            &simulator,
            |b, simulator| b.iter(|| black_box(simulator.run())),
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_simulation_throughput);
criterion_main!(benches);
