//! Criterion benchmarks for qsweep_core sweeps
//!
//! Run with: cargo bench -p qsweep_core

use std::collections::BTreeMap;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qsweep_core::{
    DIMENSION_KEY, ExecutionConfig, PointOutputs, Registry, Result, Simulation, SweepAxis,
    SweepPoint, SystemBuilder, Value,
};

/// Qubit plus cavity; the composite artifact is a dense diagonal of length
/// `size` so rebuild cost grows with the swept dimension
fn create_system() -> Registry<Vec<f64>> {
    SystemBuilder::new()
        .leaf("qubit", 2)
        .leaf("cavity", 4)
        .composite("system", ["qubit", "cavity"])
        .param("qubit", "frequency", 5.0)
        .param("cavity", "frequency", 7.0)
        .rebuild("qubit", |view| {
            let f = view.f64("frequency")?;
            Ok((0..view.size()).map(|n| f * n as f64).collect())
        })
        .rebuild("cavity", |view| {
            let f = view.f64("frequency")?;
            Ok((0..view.size()).map(|n| f * n as f64).collect())
        })
        .rebuild("system", |view| {
            let members = view.members();
            let mut diagonal = vec![0.0];
            for &member in members {
                let levels = view.upstream_artifact(member)?;
                diagonal = diagonal
                    .iter()
                    .flat_map(|d| levels.iter().map(move |l| d + l))
                    .collect();
            }
            Ok(diagonal)
        })
        .build()
        .expect("benchmark system")
}

fn create_simulation(points: usize, execution: ExecutionConfig) -> Simulation<Vec<f64>> {
    let registry = create_system();
    let qubit = registry.lookup("qubit").expect("qubit");
    let cavity = registry.lookup("cavity").expect("cavity");

    let mut simulation = Simulation::new(registry);
    simulation
        .add_axis(SweepAxis::range(qubit, "frequency", 4.0, 4.0 + points as f64 - 1.0, 1.0))
        .expect("frequency axis");
    simulation
        .add_axis(SweepAxis::new(
            cavity,
            DIMENSION_KEY,
            [8, 16, 32].into_iter().map(Value::Int).collect(),
        ))
        .expect("dimension axis");
    simulation.set_execution(execution).expect("execution");
    simulation
}

fn evaluate(registry: &mut Registry<Vec<f64>>, _point: &SweepPoint) -> Result<PointOutputs> {
    let system = registry.lookup("system")?;
    let diagonal = registry.artifact(system)?;
    let ground = diagonal.iter().copied().fold(f64::INFINITY, f64::min);
    let trace: f64 = diagonal.iter().sum();
    Ok(BTreeMap::from([
        ("ground".to_string(), vec![ground]),
        ("trace".to_string(), vec![trace]),
    ]))
}

fn bench_sequential(c: &mut Criterion) {
    let mut simulation = create_simulation(20, ExecutionConfig::sequential());

    c.bench_function("sequential_60_points", |b| {
        b.iter(|| simulation.run(black_box(evaluate)))
    });
}

fn bench_parallel_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel");

    for workers in [1, 2, 4].iter() {
        let mut simulation = create_simulation(20, ExecutionConfig::parallel(*workers));
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, _| {
            b.iter(|| simulation.run(black_box(evaluate)))
        });
    }

    group.finish();
}

fn bench_rebuild_only(c: &mut Criterion) {
    let mut registry = create_system();
    let qubit = registry.lookup("qubit").expect("qubit");
    let system = registry.lookup("system").expect("system");

    c.bench_function("invalidate_and_rebuild", |b| {
        b.iter(|| {
            registry.write(qubit, "frequency", black_box(5.5)).expect("write");
            registry.artifact(system).map(Vec::len)
        })
    });
}

criterion_group!(
    benches,
    bench_sequential,
    bench_parallel_workers,
    bench_rebuild_only,
);
criterion_main!(benches);
