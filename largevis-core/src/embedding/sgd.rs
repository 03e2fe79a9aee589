//! Asynchronous SGD with negative sampling.
//!
//! The iteration space is cut into blocks of [`BLOCK_SIZE`] iterations. Blocks
//! run in parallel (or in order, single-threaded), each with its own random
//! stream. Every iteration samples an edge by weight, pulls its endpoints
//! together, samples negatives by `degree^0.75`, and pushes them away, writing
//! straight into the shared coordinates.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rand::rngs::SmallRng;
#[cfg(feature = "cpu")]
use rayon::prelude::*;

use super::alias::AliasTable;
use super::coords::{MAX_DIMENSIONS, SharedCoordinates};
use super::edges::EdgeList;
use super::gradient::{ForceLaw, Gradient};
use super::rng::block_rng;
use super::{EmbeddingError, EmbeddingParams};
use crate::progress::Progress;

/// Iterations handled by one random stream.
pub(crate) const BLOCK_SIZE: u64 = 1024;

/// Counters gathered over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SgdStats {
    pub(crate) completed: u64,
    pub(crate) rejections: u64,
    pub(crate) cancelled: bool,
}

struct Scratch {
    y_i: [f32; MAX_DIMENSIONS],
    y_other: [f32; MAX_DIMENSIONS],
    gradient: [f32; MAX_DIMENSIONS],
    accumulated: [f32; MAX_DIMENSIONS],
}

impl Scratch {
    fn new() -> Self {
        Self {
            y_i: [0.0; MAX_DIMENSIONS],
            y_other: [0.0; MAX_DIMENSIONS],
            gradient: [0.0; MAX_DIMENSIONS],
            accumulated: [0.0; MAX_DIMENSIONS],
        }
    }
}

pub(crate) struct SgdRun<'a, L, P: ?Sized> {
    edges: &'a EdgeList,
    positive: AliasTable,
    negative: AliasTable,
    gradient: Gradient<L>,
    coords: &'a SharedCoordinates,
    params: &'a EmbeddingParams,
    progress: &'a P,
    total: u64,
    stop: AtomicBool,
    completed: AtomicU64,
    rejections: AtomicU64,
}

impl<'a, L: ForceLaw, P: Progress + ?Sized> SgdRun<'a, L, P> {
    pub(crate) fn new(
        edges: &'a EdgeList,
        law: L,
        coords: &'a SharedCoordinates,
        params: &'a EmbeddingParams,
        progress: &'a P,
        total: u64,
    ) -> Result<Self, EmbeddingError> {
        let positive = AliasTable::new(edges.weights().iter().copied())?;
        let negative = AliasTable::new(
            edges
                .out_degrees()
                .into_iter()
                .map(|degree| (degree as f64).powf(0.75)),
        )?;
        Ok(Self {
            edges,
            positive,
            negative,
            gradient: Gradient::new(law, params.gamma()),
            coords,
            params,
            progress,
            total,
            stop: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
        })
    }

    /// Runs every block, in parallel when `parallel` is set.
    pub(crate) fn run(&self, parallel: bool) -> SgdStats {
        let blocks = self.total.div_ceil(BLOCK_SIZE);
        if parallel {
            self.run_parallel(blocks);
        } else {
            for block in 0..blocks {
                if self.stop.load(Ordering::Relaxed) {
                    break;
                }
                self.run_block(block);
            }
        }
        SgdStats {
            completed: self.completed.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            cancelled: self.stop.load(Ordering::Relaxed),
        }
    }

    #[cfg(feature = "cpu")]
    fn run_parallel(&self, blocks: u64) {
        (0..blocks).into_par_iter().for_each(|block| self.run_block(block));
    }

    #[cfg(not(feature = "cpu"))]
    fn run_parallel(&self, blocks: u64) {
        // Parallel execution is rejected at configuration time without
        // rayon; fall back to ordered blocks.
        for block in 0..blocks {
            self.run_block(block);
        }
    }

    fn run_block(&self, block: u64) {
        let start = block * BLOCK_SIZE;
        let end = (start + BLOCK_SIZE).min(self.total);
        let mut rng = block_rng(self.params.rng_seed(), block);
        let mut scratch = Scratch::new();
        let mut done = 0_u64;
        let mut rejections = 0_u64;
        for iteration in start..end {
            if self.stop.load(Ordering::Relaxed) || !self.progress.should_continue() {
                self.stop.store(true, Ordering::Relaxed);
                break;
            }
            rejections += self.step(iteration, &mut rng, &mut scratch);
            done += 1;
        }
        self.completed.fetch_add(done, Ordering::Relaxed);
        self.rejections.fetch_add(rejections, Ordering::Relaxed);
    }

    /// Learning rate for `iteration`, decaying linearly from `rho` towards
    /// `min_rho`.
    fn learning_rate(&self, iteration: u64) -> f32 {
        let rho = self.params.rho();
        let min_rho = self.params.min_rho();
        let progress = iteration as f64 / self.total as f64;
        rho - (rho - min_rho) * progress as f32
    }

    /// Performs one update and returns the number of rejected negatives.
    fn step(&self, iteration: u64, rng: &mut SmallRng, scratch: &mut Scratch) -> u64 {
        let dims = self.coords.dimensions();
        let rate = self.learning_rate(iteration);
        let edge = self.positive.sample_with(rng);
        let i = self.edges.sources()[edge];
        let j = self.edges.targets()[edge];

        let y_i = &mut scratch.y_i[..dims];
        let y_other = &mut scratch.y_other[..dims];
        let gradient = &mut scratch.gradient[..dims];
        let accumulated = &mut scratch.accumulated[..dims];

        self.coords.load(i, y_i);
        self.coords.load(j, y_other);
        self.gradient.positive(y_i, y_other, gradient);
        self.coords.add_scaled(j, gradient, -rate);
        accumulated.copy_from_slice(gradient);

        let y_i = &*y_i;
        let rejected = self.sample_negatives(i, j, rng, |k| {
            self.coords.load(k, y_other);
            self.gradient.negative(y_i, y_other, gradient);
            self.coords.add_scaled(k, gradient, -rate);
            for (sum, g) in accumulated.iter_mut().zip(gradient.iter()) {
                *sum += g;
            }
        });

        self.coords.add_scaled(i, accumulated, rate);
        rejected
    }

    /// Draws negatives for the edge `i -> j`, passing each accepted node to
    /// `accept`, and returns the number of rejected draws.
    ///
    /// Endpoints and neighbours of `i` are rejected. Sampling stops after
    /// `negative_samples` acceptances or a run of
    /// `max_consecutive_rejections` rejections.
    fn sample_negatives(
        &self,
        i: usize,
        j: usize,
        rng: &mut SmallRng,
        mut accept: impl FnMut(usize),
    ) -> u64 {
        let mut accepted = 0;
        let mut consecutive = 0;
        let mut rejected = 0_u64;
        while accepted < self.params.negative_samples() {
            let k = self.negative.sample_with(rng);
            if k == i || k == j || self.edges.is_neighbour(i, k) {
                rejected += 1;
                consecutive += 1;
                if consecutive >= self.params.max_consecutive_rejections() {
                    break;
                }
                continue;
            }
            consecutive = 0;
            accepted += 1;
            accept(k);
        }
        rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunToCompletion;
    use crate::embedding::coords::Coordinates;
    use crate::embedding::gradient::{AlphaOneLaw, ExponentialLaw};
    use crate::embedding::{EmbeddingParams, ExecutionStrategy};

    fn params(batches: usize, negatives: usize) -> EmbeddingParams {
        EmbeddingParams::builder()
            .with_batches(batches)
            .with_negative_samples(negatives)
            .with_gamma(1.0)
            .with_rho(0.1)
            .with_execution(ExecutionStrategy::SingleThreaded)
            .build()
            .expect("valid parameters")
    }

    #[test]
    fn learning_rate_decays_linearly() {
        let edges = EdgeList::new(2, vec![0], vec![1], vec![0, 1, 1], vec![1.0]).expect("valid");
        let coords = SharedCoordinates::new(Coordinates::new(vec![0.0, 1.0], 1).expect("valid"));
        let params = EmbeddingParams::builder()
            .with_rho(1.0)
            .with_min_rho(0.2)
            .with_batches(10)
            .build()
            .expect("valid");
        let run = SgdRun::new(&edges, AlphaOneLaw, &coords, &params, &RunToCompletion, 10)
            .expect("valid tables");
        assert_eq!(run.learning_rate(0), 1.0);
        assert!((run.learning_rate(5) - 0.6).abs() < 1e-6);
        assert!(run.learning_rate(9) > 0.2);
    }

    #[test]
    fn attraction_only_pulls_the_pair_together() {
        let edges = EdgeList::new(2, vec![0], vec![1], vec![0, 1, 1], vec![1.0]).expect("valid");
        let coords =
            SharedCoordinates::new(Coordinates::new(vec![0.0, 0.0, 3.0, 4.0], 2).expect("valid"));
        let params = params(100, 0);
        let run = SgdRun::new(&edges, ExponentialLaw, &coords, &params, &RunToCompletion, 100)
            .expect("valid tables");
        let stats = run.run(false);
        assert_eq!(stats.completed, 100);
        assert_eq!(stats.rejections, 0);
        assert!(!stats.cancelled);
        let result = coords.into_coordinates();
        assert!(result.distance_squared(0, 1) < 25.0);
    }

    #[test]
    fn negatives_skip_endpoints_and_neighbours() {
        // Node 0 is adjacent to every other node, so every negative drawn for
        // an edge leaving node 0 is rejected.
        let edges = EdgeList::new(
            3,
            vec![0, 0, 1, 2],
            vec![1, 2, 0, 0],
            vec![0, 2, 3, 4],
            vec![1.0, 1.0, 0.0, 0.0],
        )
        .expect("valid");
        let coords = SharedCoordinates::new(
            Coordinates::new(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0], 2).expect("valid"),
        );
        let params = params(50, 3);
        let run = SgdRun::new(&edges, AlphaOneLaw, &coords, &params, &RunToCompletion, 50)
            .expect("valid tables");
        let stats = run.run(false);
        assert_eq!(stats.completed, 50);
        assert_eq!(
            stats.rejections,
            50 * params.max_consecutive_rejections() as u64
        );
    }

    /// Edge `0 -> 1` carries all the positive weight. Node 0's only neighbour
    /// is node 1, so nodes 2 and 3 are the valid negatives.
    fn sparse_neighbourhood() -> EdgeList {
        EdgeList::new(
            4,
            vec![0, 1, 2, 3],
            vec![1, 0, 3, 2],
            vec![0, 1, 2, 3, 4],
            vec![1.0, 0.0, 0.0, 0.0],
        )
        .expect("valid")
    }

    #[test]
    fn negatives_accept_only_non_neighbours() {
        let edges = sparse_neighbourhood();
        let coords = SharedCoordinates::new(
            Coordinates::new(vec![0.0, 0.0, 1.0, 0.0, 0.0, 2.0, -2.0, 0.0], 2).expect("valid"),
        );
        let params = params(200, 3);
        let run = SgdRun::new(&edges, AlphaOneLaw, &coords, &params, &RunToCompletion, 200)
            .expect("valid tables");
        let mut rng = block_rng(params.rng_seed(), 0);

        let mut seen = [0_usize; 4];
        let mut rejected = 0;
        for _ in 0..200 {
            let mut accepted = Vec::new();
            rejected += run.sample_negatives(0, 1, &mut rng, |k| accepted.push(k));
            assert!(accepted.len() <= params.negative_samples());
            for k in accepted {
                seen[k] += 1;
            }
        }
        assert_eq!(seen[0], 0, "the source is never a negative");
        assert_eq!(seen[1], 0, "a neighbour is never a negative");
        assert!(seen[2] > 0 && seen[3] > 0);
        assert!(rejected > 0);
    }

    #[test]
    fn neighbour_moves_only_by_attraction() {
        let edges = sparse_neighbourhood();
        let start = vec![0.0, 0.0, 1.0, 0.0, 0.0, 2.0, -2.0, 0.0];
        let coords = SharedCoordinates::new(Coordinates::new(start.clone(), 2).expect("valid"));
        let params = params(50, 3);
        let run = SgdRun::new(&edges, AlphaOneLaw, &coords, &params, &RunToCompletion, 50)
            .expect("valid tables");
        let mut rng = block_rng(params.rng_seed(), 0);
        let mut scratch = Scratch::new();

        for iteration in 0..50 {
            let mut y_0 = [0.0_f32; 2];
            let mut y_1 = [0.0_f32; 2];
            let mut pull = [0.0_f32; 2];
            coords.load(0, &mut y_0);
            coords.load(1, &mut y_1);
            run.gradient.positive(&y_0, &y_1, &mut pull);
            let rate = run.learning_rate(iteration);

            run.step(iteration, &mut rng, &mut scratch);

            let mut moved = [0.0_f32; 2];
            coords.load(1, &mut moved);
            for d in 0..2 {
                let expected = y_1[d] - rate * pull[d];
                assert!(
                    (moved[d] - expected).abs() < 1e-6,
                    "node 1 moved by more than attraction at iteration {iteration}"
                );
            }
        }

        let result = coords.into_coordinates();
        assert_ne!(result.row(2), &start[4..6], "node 2 was never repelled");
        assert_ne!(result.row(3), &start[6..8], "node 3 was never repelled");
    }

    #[test]
    fn cancellation_stops_between_iterations() {
        let edges = EdgeList::new(2, vec![0], vec![1], vec![0, 1, 1], vec![1.0]).expect("valid");
        let coords = SharedCoordinates::new(Coordinates::new(vec![0.0, 1.0], 1).expect("valid"));
        let params = params(5_000, 0);
        let calls = AtomicU64::new(0);
        let progress = || calls.fetch_add(1, Ordering::Relaxed) < 1_500;
        let run = SgdRun::new(&edges, AlphaOneLaw, &coords, &params, &progress, 5_000)
            .expect("valid tables");
        let stats = run.run(false);
        assert!(stats.cancelled);
        assert_eq!(stats.completed, 1_500);
    }
}
