//! Mutual-reachability distances over the stored edges of a graph.

#[cfg(feature = "cpu")]
use rayon::prelude::*;

use crate::SparseGraph;
use crate::progress::{Cancelled, Progress};

/// The node Prim's algorithm starts from, and the distance that chose it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartNode {
    /// Node id.
    pub node: usize,
    /// Smallest mutual-reachability distance in the graph, or infinity when
    /// the graph has no edges.
    pub distance: f32,
}

/// A graph whose values are mutual-reachability distances.
#[derive(Clone, Debug, PartialEq)]
pub struct MutualReachability {
    graph: SparseGraph,
    start: StartNode,
}

impl MutualReachability {
    /// The graph with identical sparsity to the input and rewritten values.
    #[must_use]
    pub fn graph(&self) -> &SparseGraph {
        &self.graph
    }

    /// Start node for the spanning tree.
    #[must_use]
    pub fn start(&self) -> StartNode {
        self.start
    }
}

/// Rewrites every stored `(i, j, d)` as `max(core[i], core[j], d)`.
///
/// The start node is the column of the smallest resulting value among
/// non-self entries. Ties resolve to the first entry in column-major order,
/// so the result does not depend on thread scheduling. Polls `progress` once
/// per column.
///
/// # Errors
/// Returns [`Cancelled`] when `progress` requests a stop.
///
/// # Panics
/// Panics if `core.len()` differs from the graph's node count.
pub fn build_mutual_reachability<P: Progress + ?Sized>(
    graph: &SparseGraph,
    core: &[f32],
    progress: &P,
) -> Result<MutualReachability, Cancelled> {
    assert_eq!(core.len(), graph.node_count(), "one core distance per node");

    let column_values = |column: usize| -> Option<Vec<f32>> {
        progress.should_continue().then(|| {
            graph
                .column(column)
                .map(|(row, weight)| weight.max(core[row]).max(core[column]))
                .collect()
        })
    };

    #[cfg(feature = "cpu")]
    let columns: Vec<Option<Vec<f32>>> = (0..graph.node_count())
        .into_par_iter()
        .map(column_values)
        .collect();
    #[cfg(not(feature = "cpu"))]
    let columns: Vec<Option<Vec<f32>>> = (0..graph.node_count()).map(column_values).collect();

    let mut values = Vec::with_capacity(graph.entry_count());
    for column in columns {
        values.extend(column.ok_or(Cancelled)?);
    }
    let mrd = graph.with_values(values);

    let mut start = StartNode {
        node: 0,
        distance: f32::INFINITY,
    };
    for (row, column, distance) in mrd.entries() {
        if row != column && distance < start.distance {
            start = StartNode {
                node: column,
                distance,
            };
        }
    }
    Ok(MutualReachability { graph: mrd, start })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunToCompletion;

    #[test]
    fn takes_the_maximum_of_core_distances_and_weight() {
        let graph = SparseGraph::from_undirected_edges(3, &[(0, 1, 1.0), (1, 2, 2.0)])
            .expect("valid graph");
        let mrd = build_mutual_reachability(&graph, &[3.0, 0.5, 1.0], &RunToCompletion)
            .expect("runs");
        let entries: Vec<_> = mrd.graph().entries().collect();
        assert_eq!(
            entries,
            vec![(1, 0, 3.0), (0, 1, 3.0), (2, 1, 2.0), (1, 2, 2.0)]
        );
        assert_eq!(mrd.start(), StartNode { node: 1, distance: 2.0 });
    }

    #[test]
    fn start_tie_goes_to_first_column() {
        let graph = SparseGraph::from_undirected_edges(4, &[(2, 3, 1.0), (0, 1, 1.0)])
            .expect("valid graph");
        let mrd =
            build_mutual_reachability(&graph, &[0.0; 4], &RunToCompletion).expect("runs");
        assert_eq!(mrd.start(), StartNode { node: 0, distance: 1.0 });
    }

    #[test]
    fn edgeless_graph_starts_at_node_zero() {
        let graph = SparseGraph::from_triplets(2, []).expect("valid graph");
        let mrd =
            build_mutual_reachability(&graph, &[0.0, 0.0], &RunToCompletion).expect("runs");
        assert_eq!(mrd.start().node, 0);
        assert!(mrd.start().distance.is_infinite());
    }

    #[test]
    fn self_loops_never_choose_the_start() {
        let graph = SparseGraph::from_triplets(2, [(0, 0, 0.0), (0, 1, 5.0), (1, 0, 5.0)])
            .expect("valid graph");
        let mrd =
            build_mutual_reachability(&graph, &[0.0, 0.0], &RunToCompletion).expect("runs");
        assert_eq!(mrd.start(), StartNode { node: 0, distance: 5.0 });
    }
}
