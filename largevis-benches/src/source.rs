//! Synthetic neighbour graphs for benchmarking.
//!
//! Points are drawn from Gaussian blobs placed on a circle, then linked to
//! their `neighbours` nearest points by brute force. The resulting graph is
//! symmetric and stores Euclidean distances.

use std::collections::BTreeMap;
use std::f32::consts::PI;

use largevis_core::embedding::{Coordinates, EdgeList, EmbeddingError};
use largevis_core::{GraphError, SparseGraph};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Errors that may occur while preparing benchmark graphs.
#[derive(Debug, thiserror::Error)]
pub enum SyntheticError {
    /// The requested point count was zero.
    #[error("point count must be greater than zero")]
    ZeroPoints,
    /// The requested dimension count was zero.
    #[error("dimension count must be greater than zero")]
    ZeroDimensions,
    /// The requested cluster count was zero.
    #[error("cluster count must be greater than zero")]
    ZeroClusters,
    /// Every point needs at least one neighbour.
    #[error("neighbour count must be greater than zero")]
    ZeroNeighbours,
    /// Neighbours must be distinct points.
    #[error("neighbour count ({neighbours}) must be below point count ({point_count})")]
    TooManyNeighbours {
        /// Requested neighbours per point.
        neighbours: usize,
        /// Number of points.
        point_count: usize,
    },
    /// The requested `point_count * dimensions` overflowed `usize`.
    #[error("point_count * dimensions overflows usize")]
    Overflow,
    /// The generated graph was rejected.
    #[error("generated graph is invalid: {0}")]
    Graph(#[from] GraphError),
}

/// Configuration for a blob-structured neighbour graph.
#[derive(Clone, Debug)]
pub struct SyntheticGraphConfig {
    /// Number of points to generate.
    pub point_count: usize,
    /// Dimensionality of the generating vectors.
    pub dimensions: usize,
    /// Number of Gaussian blobs.
    pub cluster_count: usize,
    /// Neighbours linked per point.
    pub neighbours: usize,
    /// Radius of the circle the blob centroids sit on.
    pub separation: f32,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// A neighbour graph with the blob label of every node.
#[derive(Clone, Debug)]
pub struct SyntheticGraph {
    graph: SparseGraph,
    labels: Vec<usize>,
}

impl SyntheticGraph {
    /// Generates the blobs and their neighbour graph.
    ///
    /// # Errors
    /// Returns [`SyntheticError`] when a count is zero, the neighbour count
    /// is not below the point count, or the buffer size overflows.
    pub fn generate(config: &SyntheticGraphConfig) -> Result<Self, SyntheticError> {
        validate(config)?;
        let (points, labels) = blob_points(config)?;
        let graph = knn_graph(&points, config.dimensions, config.neighbours)?;
        Ok(Self { graph, labels })
    }

    /// The distance graph.
    #[must_use]
    pub fn graph(&self) -> &SparseGraph {
        &self.graph
    }

    /// Blob index of every node.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of nodes.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.labels.len()
    }

    /// Converts the stored distances into affinities `exp(-d)` for the
    /// embedding optimiser.
    ///
    /// # Errors
    /// Propagates [`EmbeddingError`] from edge-list validation.
    #[expect(
        clippy::float_arithmetic,
        reason = "affinities are computed from distances"
    )]
    pub fn affinity_edges(&self) -> Result<EdgeList, EmbeddingError> {
        let distances = EdgeList::from_graph(&self.graph)?;
        let weights = distances.weights().iter().map(|d| (-d).exp()).collect();
        EdgeList::new(
            distances.node_count(),
            distances.sources().to_vec(),
            distances.targets().to_vec(),
            distances.row_offsets().to_vec(),
            weights,
        )
    }

    /// Uniform random starting coordinates in `[-1, 1)`.
    ///
    /// # Errors
    /// Returns [`EmbeddingError::InvalidDimensions`] for an unsupported
    /// dimensionality.
    pub fn initial_coordinates(
        &self,
        dimensions: usize,
        seed: u64,
    ) -> Result<Coordinates, EmbeddingError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let values = (0..self.point_count().saturating_mul(dimensions))
            .map(|_| rng.gen_range(-1.0_f32..1.0_f32))
            .collect();
        Coordinates::new(values, dimensions)
    }
}

fn validate(config: &SyntheticGraphConfig) -> Result<(), SyntheticError> {
    if config.point_count == 0 {
        return Err(SyntheticError::ZeroPoints);
    }
    if config.dimensions == 0 {
        return Err(SyntheticError::ZeroDimensions);
    }
    if config.cluster_count == 0 {
        return Err(SyntheticError::ZeroClusters);
    }
    if config.neighbours == 0 {
        return Err(SyntheticError::ZeroNeighbours);
    }
    if config.neighbours >= config.point_count {
        return Err(SyntheticError::TooManyNeighbours {
            neighbours: config.neighbours,
            point_count: config.point_count,
        });
    }
    Ok(())
}

#[expect(
    clippy::float_arithmetic,
    reason = "Gaussian data generation requires floating-point arithmetic"
)]
#[expect(
    clippy::cast_precision_loss,
    reason = "cluster indices are small"
)]
fn blob_points(config: &SyntheticGraphConfig) -> Result<(Vec<f32>, Vec<usize>), SyntheticError> {
    let total = config
        .point_count
        .checked_mul(config.dimensions)
        .ok_or(SyntheticError::Overflow)?;
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let centroids: Vec<Vec<f32>> = (0..config.cluster_count)
        .map(|cluster| {
            let angle = cluster as f32 / config.cluster_count as f32 * (2.0 * PI);
            let mut centroid = vec![0.0_f32; config.dimensions];
            if let Some(value) = centroid.get_mut(0) {
                *value = config.separation * angle.cos();
            }
            if let Some(value) = centroid.get_mut(1) {
                *value = config.separation * angle.sin();
            }
            centroid
        })
        .collect();

    let mut points = Vec::with_capacity(total);
    let mut labels = Vec::with_capacity(config.point_count);
    for (label, centroid) in centroids
        .iter()
        .enumerate()
        .cycle()
        .take(config.point_count)
    {
        labels.push(label);
        for &centre in centroid {
            points.push(centre + standard_normal(&mut rng));
        }
    }
    Ok((points, labels))
}

#[expect(
    clippy::float_arithmetic,
    reason = "Box-Muller transform requires floating-point arithmetic"
)]
fn standard_normal(rng: &mut SmallRng) -> f32 {
    let u1 = rng.gen_range(f32::EPSILON..1.0_f32);
    let u2 = rng.gen_range(0.0_f32..1.0_f32);
    (-2.0_f32 * u1.ln()).sqrt() * (2.0_f32 * PI * u2).cos()
}

#[expect(
    clippy::float_arithmetic,
    reason = "Euclidean distances require floating-point arithmetic"
)]
fn knn_graph(
    points: &[f32],
    dimensions: usize,
    neighbours: usize,
) -> Result<SparseGraph, SyntheticError> {
    let rows: Vec<&[f32]> = points.chunks_exact(dimensions).collect();
    let distance = |a: &[f32], b: &[f32]| {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    };

    let mut edges = BTreeMap::new();
    let mut candidates = Vec::with_capacity(rows.len());
    for (i, &row) in rows.iter().enumerate() {
        candidates.clear();
        candidates.extend(
            rows.iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, &other)| (distance(row, other), j)),
        );
        candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for &(weight, j) in candidates.iter().take(neighbours) {
            edges.insert((i.min(j), i.max(j)), weight);
        }
    }

    let edges: Vec<_> = edges.into_iter().map(|((a, b), w)| (a, b, w)).collect();
    Ok(SparseGraph::from_undirected_edges(rows.len(), &edges)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config() -> SyntheticGraphConfig {
        SyntheticGraphConfig {
            point_count: 60,
            dimensions: 4,
            cluster_count: 3,
            neighbours: 5,
            separation: 20.0,
            seed: 7,
        }
    }

    #[rstest]
    fn generates_a_symmetric_graph() {
        let synthetic = SyntheticGraph::generate(&config()).expect("valid config");
        let graph = synthetic.graph();
        assert_eq!(graph.node_count(), 60);
        assert_eq!(synthetic.labels().len(), 60);
        for node in 0..graph.node_count() {
            assert!(graph.column(node).len() >= 5);
            for (row, weight) in graph.column(node) {
                assert!(graph.column(row).any(|(back, w)| back == node && w == weight));
            }
        }
    }

    #[rstest]
    fn generation_is_deterministic() {
        let first = SyntheticGraph::generate(&config()).expect("valid config");
        let second = SyntheticGraph::generate(&config()).expect("valid config");
        assert_eq!(first.graph(), second.graph());
    }

    #[rstest]
    #[case(SyntheticGraphConfig { point_count: 0, ..config() })]
    #[case(SyntheticGraphConfig { dimensions: 0, ..config() })]
    #[case(SyntheticGraphConfig { cluster_count: 0, ..config() })]
    #[case(SyntheticGraphConfig { neighbours: 0, ..config() })]
    #[case(SyntheticGraphConfig { neighbours: 60, ..config() })]
    fn rejects_degenerate_configs(#[case] config: SyntheticGraphConfig) {
        assert!(SyntheticGraph::generate(&config).is_err());
    }

    #[rstest]
    fn affinities_and_coordinates_match_the_graph() {
        let synthetic = SyntheticGraph::generate(&config()).expect("valid config");
        let edges = synthetic.affinity_edges().expect("edges are valid");
        assert_eq!(edges.len(), synthetic.graph().entry_count());
        assert!(edges.weights().iter().all(|w| *w > 0.0 && *w <= 1.0));
        let coords = synthetic
            .initial_coordinates(2, 3)
            .expect("two dimensions are supported");
        assert_eq!(coords.len(), 60);
    }
}
