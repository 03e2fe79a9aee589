//! Embedding optimiser benchmarks.
//!
//! Runs a fixed number of SGD iterations over synthetic blob graphs, once on
//! the calling thread and once on the rayon pool.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
#![expect(
    clippy::shadow_reuse,
    reason = "Criterion bench_with_input closures rebind parameter names"
)]
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use largevis_benches::{
    error::BenchSetupError,
    params::EmbeddingBenchParams,
    source::{SyntheticGraph, SyntheticGraphConfig},
};
use largevis_core::RunToCompletion;
use largevis_core::embedding::{EmbeddingParams, ExecutionStrategy, optimize_embedding};

/// Seed used for all synthetic data generation in this benchmark.
const SEED: u64 = 42;

/// Dataset sizes to benchmark.
const POINT_COUNTS: &[usize] = &[500, 2_000];

/// SGD iterations per point.
const BATCHES_PER_POINT: usize = 50;

/// Output dimensionality.
const DIMENSIONS: usize = 2;

fn sgd_impl(
    c: &mut Criterion,
    group_name: &str,
    execution: ExecutionStrategy,
) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group(group_name);
    group.sample_size(10);

    for &point_count in POINT_COUNTS {
        let synthetic = SyntheticGraph::generate(&SyntheticGraphConfig {
            point_count,
            dimensions: 8,
            cluster_count: 5,
            neighbours: 10,
            separation: 12.0,
            seed: SEED,
        })?;
        let edges = synthetic.affinity_edges()?;
        let initial = synthetic.initial_coordinates(DIMENSIONS, SEED)?;
        let batches = point_count.saturating_mul(BATCHES_PER_POINT);
        let params = EmbeddingParams::builder()
            .with_batches(batches)
            .with_execution(execution)
            .with_rng_seed(SEED)
            .build()?;
        let bench_params = EmbeddingBenchParams {
            point_count,
            dimensions: DIMENSIONS,
            batches,
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(&bench_params),
            &(&edges, &params),
            |b, &(edges, params)| {
                b.iter(|| optimize_embedding(initial.clone(), edges, params, &RunToCompletion));
            },
        );
    }

    group.finish();
    Ok(())
}

fn sgd_single_threaded(c: &mut Criterion) {
    if let Err(err) = sgd_impl(c, "sgd_single_threaded", ExecutionStrategy::SingleThreaded) {
        panic!("sgd_single_threaded benchmark setup failed: {err}");
    }
}

fn sgd_parallel(c: &mut Criterion) {
    if let Err(err) = sgd_impl(c, "sgd_parallel", ExecutionStrategy::Parallel) {
        panic!("sgd_parallel benchmark setup failed: {err}");
    }
}

criterion_group!(benches, sgd_single_threaded, sgd_parallel);
criterion_main!(benches);
