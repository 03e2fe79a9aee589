//! Benchmark parameter types rendered as Criterion benchmark ids.

use std::fmt;

/// Parameters for a clustering benchmark run.
#[derive(Clone, Debug)]
pub struct ClusteringBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Minimum cluster size.
    pub min_pts: usize,
}

impl fmt::Display for ClusteringBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},min={}", self.point_count, self.min_pts)
    }
}

/// Parameters for an embedding benchmark run.
#[derive(Clone, Debug)]
pub struct EmbeddingBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Output dimensionality.
    pub dimensions: usize,
    /// SGD iterations per run.
    pub batches: usize,
}

impl fmt::Display for EmbeddingBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={},d={},batches={}",
            self.point_count, self.dimensions, self.batches
        )
    }
}
