//! Flat clustering results.
//!
//! A [`FlatClustering`] assigns every node either a cluster or noise, together
//! with the density level (lambda) at which the node left its cluster.
//! Cluster identifiers are dense, starting at zero.

use std::collections::HashSet;

use thiserror::Error;

/// Identifier assigned to a cluster.
///
/// # Examples
/// ```
/// use largevis_core::ClusterId;
///
/// let id = ClusterId::new(4);
/// assert_eq!(id.get(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(u64);

impl ClusterId {
    /// Creates a new cluster identifier.
    #[rustfmt::skip]
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Returns the underlying numeric identifier.
    #[rustfmt::skip]
    #[must_use]
    pub fn get(self) -> u64 { self.0 }
}

/// Cluster membership of a single node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    cluster: Option<ClusterId>,
    lambda: f32,
}

impl Assignment {
    /// Creates an assignment to `cluster` that ends at density `lambda`.
    #[must_use]
    pub fn clustered(cluster: ClusterId, lambda: f32) -> Self {
        Self {
            cluster: Some(cluster),
            lambda,
        }
    }

    /// Creates a noise assignment.
    #[must_use]
    pub fn noise() -> Self {
        Self {
            cluster: None,
            lambda: 0.0,
        }
    }

    /// Cluster the node belongs to, or `None` for noise.
    #[must_use]
    pub fn cluster(&self) -> Option<ClusterId> {
        self.cluster
    }

    /// Density level at which the node dropped out of its cluster; zero for
    /// noise.
    #[must_use]
    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    /// Returns `true` when the node is noise.
    #[must_use]
    pub fn is_noise(&self) -> bool {
        self.cluster.is_none()
    }
}

/// Error returned when cluster identifiers are not contiguous starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NonContiguousClusterIds {
    /// The assignments do not include cluster `0`.
    #[error("cluster identifiers must include 0")]
    MissingZero,
    /// The assignments skip identifiers.
    #[error("cluster identifiers must be contiguous without gaps")]
    Gap,
    /// The assignments require identifiers beyond the host pointer width.
    #[error("cluster identifiers exceed or reach the host pointer-width limit")]
    Overflow,
}

/// Flat clustering of every node in a graph.
///
/// # Examples
/// ```
/// use largevis_core::{Assignment, ClusterId, FlatClustering};
///
/// let clustering = FlatClustering::try_from_assignments(vec![
///     Assignment::clustered(ClusterId::new(0), 2.0),
///     Assignment::noise(),
///     Assignment::clustered(ClusterId::new(0), 1.5),
/// ])?;
/// assert_eq!(clustering.cluster_count(), 1);
/// assert_eq!(clustering.noise_count(), 1);
/// assert_eq!(clustering.members(ClusterId::new(0)), vec![0, 2]);
/// # Ok::<(), largevis_core::NonContiguousClusterIds>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlatClustering {
    assignments: Vec<Assignment>,
    cluster_count: usize,
}

impl FlatClustering {
    /// Builds a clustering in which every node is noise.
    #[must_use]
    pub fn all_noise(node_count: usize) -> Self {
        Self {
            assignments: vec![Assignment::noise(); node_count],
            cluster_count: 0,
        }
    }

    /// Builds a clustering whose labels are already known to be dense.
    pub(crate) fn from_dense(assignments: Vec<Assignment>, cluster_count: usize) -> Self {
        debug_assert!(
            assignments
                .iter()
                .filter_map(Assignment::cluster)
                .all(|id| id.get() < cluster_count as u64)
        );
        Self {
            assignments,
            cluster_count,
        }
    }

    /// Builds a clustering from per-node assignments.
    ///
    /// The identifiers in use must form `0..cluster_count`. Noise entries are
    /// ignored by this check, so an all-noise clustering is accepted.
    ///
    /// # Errors
    /// Returns [`NonContiguousClusterIds::MissingZero`] when cluster `0` is
    /// absent, [`NonContiguousClusterIds::Gap`] when identifiers skip values
    /// and [`NonContiguousClusterIds::Overflow`] when identifiers exceed the
    /// host pointer width.
    pub fn try_from_assignments(
        assignments: Vec<Assignment>,
    ) -> Result<Self, NonContiguousClusterIds> {
        let mut seen = HashSet::new();
        let mut max_id = None::<u64>;
        for id in assignments.iter().filter_map(Assignment::cluster) {
            let value = id.get();
            if value >= usize::MAX as u64 {
                return Err(NonContiguousClusterIds::Overflow);
            }
            seen.insert(value);
            max_id = Some(max_id.map_or(value, |max| max.max(value)));
        }

        let Some(max_id) = max_id else {
            return Ok(Self {
                assignments,
                cluster_count: 0,
            });
        };
        if !seen.contains(&0) {
            return Err(NonContiguousClusterIds::MissingZero);
        }
        if seen.len() as u64 != max_id + 1 {
            return Err(NonContiguousClusterIds::Gap);
        }
        Ok(Self {
            assignments,
            cluster_count: seen.len(),
        })
    }

    /// Per-node assignments in node order.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Per-node cluster labels, `None` for noise.
    #[must_use]
    pub fn labels(&self) -> Vec<Option<ClusterId>> {
        self.assignments.iter().map(Assignment::cluster).collect()
    }

    /// Number of distinct clusters.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Number of nodes labelled as noise.
    #[must_use]
    pub fn noise_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_noise()).count()
    }

    /// Nodes assigned to `cluster`, ascending.
    #[must_use]
    pub fn members(&self, cluster: ClusterId) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter_map(|(node, a)| (a.cluster() == Some(cluster)).then_some(node))
            .collect()
    }
}
