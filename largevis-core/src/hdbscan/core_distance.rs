//! Core distances: the K-th smallest incident edge weight of each node.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::num::NonZeroUsize;

#[cfg(feature = "cpu")]
use rayon::prelude::*;

use crate::SparseGraph;
use crate::progress::{Cancelled, Progress};

/// Totally ordered wrapper so distances can live in a [`BinaryHeap`].
#[derive(Clone, Copy, Debug)]
struct Distance(f32);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Distance {}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Returns the `k`-th smallest of `weights`.
///
/// With fewer than `k` weights the largest one is used, and a node without
/// neighbours has core distance zero.
fn kth_smallest(weights: impl Iterator<Item = f32>, k: NonZeroUsize) -> f32 {
    // Max-heap of the k smallest weights seen so far.
    let mut smallest: BinaryHeap<Distance> = BinaryHeap::with_capacity(k.get());
    for weight in weights {
        if smallest.len() < k.get() {
            smallest.push(Distance(weight));
        } else if smallest
            .peek()
            .is_some_and(|largest| Distance(weight) < *largest)
        {
            smallest.pop();
            smallest.push(Distance(weight));
        }
    }
    smallest.peek().map_or(0.0, |largest| largest.0)
}

/// Computes the core distance of every node.
///
/// Column `j` of `graph` lists the neighbours of node `j`; self-loops are
/// ignored. Polls `progress` once per node.
///
/// # Errors
/// Returns [`Cancelled`] when `progress` requests a stop.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use largevis_core::{RunToCompletion, SparseGraph, hdbscan::compute_core_distances};
///
/// let graph = SparseGraph::from_undirected_edges(3, &[(0, 1, 1.0), (1, 2, 3.0)])?;
/// let k = NonZeroUsize::new(2).expect("non-zero");
/// let core = compute_core_distances(&graph, k, &RunToCompletion)?;
/// assert_eq!(core, vec![1.0, 3.0, 3.0]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn compute_core_distances<P: Progress + ?Sized>(
    graph: &SparseGraph,
    k: NonZeroUsize,
    progress: &P,
) -> Result<Vec<f32>, Cancelled> {
    let core_of = |node: usize| -> Option<f32> {
        progress.should_continue().then(|| {
            let incident = graph
                .column(node)
                .filter(|&(neighbour, _)| neighbour != node)
                .map(|(_, weight)| weight);
            kth_smallest(incident, k)
        })
    };

    #[cfg(feature = "cpu")]
    let per_node: Vec<Option<f32>> = (0..graph.node_count())
        .into_par_iter()
        .map(core_of)
        .collect();
    #[cfg(not(feature = "cpu"))]
    let per_node: Vec<Option<f32>> = (0..graph.node_count()).map(core_of).collect();

    per_node.into_iter().collect::<Option<Vec<_>>>().ok_or(Cancelled)
}
