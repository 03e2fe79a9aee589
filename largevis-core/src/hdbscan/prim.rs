//! Prim's minimum spanning tree over mutual-reachability distances.

use tracing::{debug, instrument};

use super::mutual_reachability::MutualReachability;
use super::priority_queue::IndexedMinQueue;
use crate::progress::{Cancelled, Progress, checkpoint};

/// A minimum spanning tree (or forest) stored as parent pointers.
///
/// The root, and every node in a component the root cannot reach, has no
/// parent and an infinite distance.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanningTree {
    parents: Vec<Option<usize>>,
    distances: Vec<f32>,
    root: usize,
}

impl SpanningTree {
    /// Parent of every node.
    #[must_use]
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    /// Distance from every node to its parent.
    #[must_use]
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Node the tree was grown from.
    #[must_use]
    pub fn root(&self) -> usize {
        self.root
    }

    /// Number of nodes covered by the tree arrays.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    /// Iterates tree edges as `(child, parent, distance)`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.parents
            .iter()
            .zip(&self.distances)
            .enumerate()
            .filter_map(|(child, (parent, &distance))| parent.map(|p| (child, p, distance)))
    }

    /// Number of tree edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.parents.iter().filter(|p| p.is_some()).count()
    }

    /// Sum of all tree edge distances.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.edges().map(|(_, _, d)| f64::from(d)).sum()
    }
}

/// Grows a minimum spanning tree from the start node of `mrd`.
///
/// Each extracted vertex relaxes the entries of its row. Vertices the start
/// node cannot reach keep no parent. Polls `progress` once per extracted
/// vertex.
///
/// # Errors
/// Returns [`Cancelled`] when `progress` requests a stop.
#[instrument(
    name = "hdbscan.prim",
    skip_all,
    fields(nodes = mrd.graph().node_count(), start = mrd.start().node),
)]
pub fn build_spanning_tree<P: Progress + ?Sized>(
    mrd: &MutualReachability,
    progress: &P,
) -> Result<SpanningTree, Cancelled> {
    // Column v of the transpose holds row v of the distance matrix.
    let rows = mrd.graph().transpose();
    let n = rows.node_count();
    let root = mrd.start().node;

    let mut parents = vec![None; n];
    let mut distances = vec![f32::INFINITY; n];
    let mut queue = IndexedMinQueue::new(n);
    for node in 0..n {
        let key = if node == root { -1.0 } else { f32::INFINITY };
        queue.insert(node, key);
    }

    while let Some((vertex, key)) = queue.delete_min() {
        checkpoint(progress)?;
        if key == f32::INFINITY {
            // Everything left is unreachable from the root.
            break;
        }
        for (neighbour, distance) in rows.column(vertex) {
            if queue.decrease_key(neighbour, distance) {
                parents[neighbour] = Some(vertex);
                distances[neighbour] = distance;
            }
        }
    }

    let tree = SpanningTree {
        parents,
        distances,
        root,
    };
    let unreached = n - 1 - tree.edge_count();
    if unreached > 0 {
        debug!(unreached, "spanning tree does not cover every node");
    }
    Ok(tree)
}
