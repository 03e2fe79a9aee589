//! HDBSCAN-style density clustering over a sparse neighbour graph.
//!
//! The pipeline runs in stages:
//!
//! 1. core distances (the K-th smallest incident edge weight per node);
//! 2. mutual-reachability distances over the stored edges;
//! 3. a minimum spanning tree grown with Prim's algorithm;
//! 4. a single-linkage dendrogram recovered from the tree;
//! 5. condensation by `min_pts`;
//! 6. stability-based selection and labelling.
//!
//! Each stage is available on its own; [`Hdbscan::process`] chains them and
//! honours cooperative cancellation between and within stages.

mod condense;
mod core_distance;
mod dendrogram;
mod mutual_reachability;
mod prim;
mod priority_queue;
mod select;
mod union_find;


use std::num::NonZeroUsize;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use self::condense::{CondensedEvent, CondensedTree, condense};
pub use self::core_distance::compute_core_distances;
pub use self::dendrogram::{Dendrogram, DendrogramNode, build_dendrogram};
pub use self::mutual_reachability::{MutualReachability, StartNode, build_mutual_reachability};
pub use self::prim::{SpanningTree, build_spanning_tree};
pub use self::select::{HierarchyReport, TieBreak};

use crate::error::define_error_codes;
use crate::progress::{Cancelled, Progress, RunStatus};
use crate::result::FlatClustering;
use crate::{SparseGraph, telemetry};

/// Errors returned when configuring or running the clustering engine.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HdbscanError {
    /// The neighbour count for core distances must be positive.
    #[error("K must be at least 1 (got {got})")]
    InvalidK {
        /// The rejected value.
        got: usize,
    },
    /// The minimum cluster size must be positive.
    #[error("min_pts must be at least 1 (got {got})")]
    InvalidMinPts {
        /// The rejected value.
        got: usize,
    },
    /// The graph is too small to hold a single cluster.
    #[error("min_pts {min_pts} exceeds node_count {node_count}")]
    MinPtsExceedsNodes {
        /// Configured minimum cluster size.
        min_pts: usize,
        /// Nodes in the graph.
        node_count: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`HdbscanError`] variants.
    enum HdbscanErrorCode for HdbscanError {
        /// K was zero.
        InvalidK => InvalidK { .. } => "HDBSCAN_INVALID_K",
        /// min_pts was zero.
        InvalidMinPts => InvalidMinPts { .. } => "HDBSCAN_INVALID_MIN_PTS",
        /// min_pts exceeded the number of nodes.
        MinPtsExceedsNodes => MinPtsExceedsNodes { .. } => "HDBSCAN_MIN_PTS_EXCEEDS_NODES",
    }
}

/// Configures and constructs [`Hdbscan`] instances.
///
/// # Examples
/// ```
/// use largevis_core::hdbscan::{HdbscanBuilder, TieBreak};
///
/// let engine = HdbscanBuilder::new()
///     .with_k(3)
///     .with_min_pts(4)
///     .with_tie_break(TieBreak::PreferChildren)
///     .build()?;
/// assert_eq!(engine.k().get(), 3);
/// assert_eq!(engine.min_pts().get(), 4);
/// # Ok::<(), largevis_core::hdbscan::HdbscanError>(())
/// ```
#[derive(Clone, Debug)]
pub struct HdbscanBuilder {
    k: usize,
    min_pts: usize,
    tie_break: TieBreak,
}

impl Default for HdbscanBuilder {
    fn default() -> Self {
        Self {
            k: 5,
            min_pts: 20,
            tie_break: TieBreak::default(),
        }
    }
}

impl HdbscanBuilder {
    /// Creates a builder with `K = 5`, `min_pts = 20` and parent-preferring
    /// ties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the neighbour rank used for core distances.
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the minimum cluster size.
    #[must_use]
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    /// Sets how equal parent and children stability is resolved.
    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`HdbscanError::InvalidK`] or [`HdbscanError::InvalidMinPts`]
    /// when either parameter is zero.
    pub fn build(self) -> Result<Hdbscan, HdbscanError> {
        let k = NonZeroUsize::new(self.k).ok_or(HdbscanError::InvalidK { got: self.k })?;
        let min_pts = NonZeroUsize::new(self.min_pts).ok_or(HdbscanError::InvalidMinPts {
            got: self.min_pts,
        })?;
        Ok(Hdbscan {
            k,
            min_pts,
            tie_break: self.tie_break,
        })
    }
}

/// A validated clustering configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hdbscan {
    k: NonZeroUsize,
    min_pts: NonZeroUsize,
    tie_break: TieBreak,
}

/// Everything a clustering run produces.
///
/// A cancelled run carries an all-noise clustering and an empty report. Its
/// spanning tree is present only when Prim's algorithm finished before the
/// stop.
#[derive(Clone, Debug, PartialEq)]
pub struct HdbscanOutput {
    /// Whether the run finished.
    pub status: RunStatus,
    /// Flat clustering with per-node lambdas.
    pub clusters: FlatClustering,
    /// Minimum spanning tree over mutual-reachability distances.
    pub tree: Option<SpanningTree>,
    /// Core distance of every node; empty when cancelled before they were
    /// all computed.
    pub core_distances: Vec<f32>,
    /// Condensed hierarchy report.
    pub hierarchy: HierarchyReport,
}

impl HdbscanOutput {
    fn cancelled(node_count: usize, core_distances: Vec<f32>, tree: Option<SpanningTree>) -> Self {
        Self {
            status: RunStatus::Cancelled,
            clusters: FlatClustering::all_noise(node_count),
            tree,
            core_distances,
            hierarchy: HierarchyReport::default(),
        }
    }
}

impl Hdbscan {
    /// Neighbour rank used for core distances.
    #[must_use]
    pub fn k(&self) -> NonZeroUsize {
        self.k
    }

    /// Minimum cluster size.
    #[must_use]
    pub fn min_pts(&self) -> NonZeroUsize {
        self.min_pts
    }

    /// Tie policy for stability selection.
    #[must_use]
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Clusters `graph`, whose column `j` lists the neighbour distances of
    /// node `j`.
    ///
    /// # Errors
    /// Returns [`HdbscanError::MinPtsExceedsNodes`] when the graph has fewer
    /// nodes than `min_pts`. Cancellation is not an error; it is reported
    /// through [`HdbscanOutput::status`].
    ///
    /// # Examples
    /// ```
    /// use largevis_core::{RunToCompletion, SparseGraph, hdbscan::HdbscanBuilder};
    ///
    /// // Two tight pairs joined by a long edge.
    /// let graph = SparseGraph::from_undirected_edges(
    ///     4,
    ///     &[(0, 1, 0.5), (2, 3, 0.5), (1, 2, 2.0)],
    /// )?;
    /// let engine = HdbscanBuilder::new().with_k(1).with_min_pts(2).build()?;
    /// let output = engine.process(&graph, &RunToCompletion)?;
    /// assert!(output.status.is_completed());
    /// assert_eq!(output.clusters.cluster_count(), 2);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[instrument(
        name = "hdbscan.process",
        err,
        skip_all,
        fields(
            nodes = graph.node_count(),
            entries = graph.entry_count(),
            k = self.k.get(),
            min_pts = self.min_pts.get(),
        ),
    )]
    pub fn process<P: Progress + ?Sized>(
        &self,
        graph: &SparseGraph,
        progress: &P,
    ) -> Result<HdbscanOutput, HdbscanError> {
        let node_count = graph.node_count();
        if node_count < self.min_pts.get() {
            return Err(HdbscanError::MinPtsExceedsNodes {
                min_pts: self.min_pts.get(),
                node_count,
            });
        }

        let mut core_slot = Vec::new();
        let mut tree_slot = None;
        match self.run_stages(graph, progress, &mut core_slot, &mut tree_slot) {
            Ok(output) => {
                info!(
                    clusters = output.clusters.cluster_count(),
                    noise = output.clusters.noise_count(),
                    "clustering completed"
                );
                Ok(output)
            }
            Err(Cancelled) => {
                warn!(
                    tree_complete = tree_slot.is_some(),
                    "clustering cancelled by progress callback"
                );
                Ok(HdbscanOutput::cancelled(node_count, core_slot, tree_slot))
            }
        }
    }

    fn run_stages<P: Progress + ?Sized>(
        &self,
        graph: &SparseGraph,
        progress: &P,
        core_slot: &mut Vec<f32>,
        tree_slot: &mut Option<SpanningTree>,
    ) -> Result<HdbscanOutput, Cancelled> {
        *core_slot = compute_core_distances(graph, self.k, progress)?;
        debug!(nodes = core_slot.len(), "core distances computed");

        let mrd = build_mutual_reachability(graph, core_slot, progress)?;
        let tree = tree_slot.insert(build_spanning_tree(&mrd, progress)?);
        debug!(edges = tree.edge_count(), "spanning tree built");

        let dendrogram = build_dendrogram(tree, progress)?;
        let condensed = condense(&dendrogram, self.min_pts);
        crate::progress::checkpoint(progress)?;
        debug!(
            clusters = condensed.cluster_count(),
            "dendrogram condensed"
        );

        let selection = select::select_clusters(&condensed, self.tie_break);
        let (clusters, hierarchy) = select::label_points(&condensed, &selection);
        telemetry::record_clusters_selected(selection.selected_count());

        Ok(HdbscanOutput {
            status: RunStatus::Completed,
            clusters,
            tree: tree_slot.take(),
            core_distances: std::mem::take(core_slot),
            hierarchy,
        })
    }
}

/// Clusters `graph` with the given parameters and parent-preferring ties.
///
/// # Errors
/// Returns [`HdbscanError`] when `k` or `min_pts` is zero, or when `min_pts`
/// exceeds the node count.
pub fn hdbscan<P: Progress + ?Sized>(
    graph: &SparseGraph,
    k: usize,
    min_pts: usize,
    progress: &P,
) -> Result<HdbscanOutput, HdbscanError> {
    HdbscanBuilder::new()
        .with_k(k)
        .with_min_pts(min_pts)
        .build()?
        .process(graph, progress)
}
