//! Weighted edge lists consumed by the embedding optimiser.

use super::EmbeddingError;
use crate::SparseGraph;

/// Directed weighted edges grouped by source node.
///
/// Edges `row_offsets[i]..row_offsets[i + 1]` all start at node `i`, and
/// their targets are strictly increasing, so membership of a target among a
/// node's neighbours is a binary search.
///
/// # Examples
/// ```
/// use largevis_core::embedding::EdgeList;
///
/// // 0 -> 1, 1 -> 0, 1 -> 2
/// let edges = EdgeList::new(3, vec![0, 1, 1], vec![1, 0, 2], vec![0, 1, 3, 3], vec![1.0, 1.0, 0.5])?;
/// assert_eq!(edges.len(), 3);
/// assert!(edges.is_neighbour(1, 2));
/// assert!(!edges.is_neighbour(2, 1));
/// assert_eq!(edges.out_degrees(), vec![1, 2, 0]);
/// # Ok::<(), largevis_core::embedding::EmbeddingError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeList {
    node_count: usize,
    sources: Vec<usize>,
    targets: Vec<usize>,
    row_offsets: Vec<usize>,
    weights: Vec<f32>,
}

impl EdgeList {
    /// Validates and wraps the parallel edge arrays.
    ///
    /// # Errors
    /// Returns [`EmbeddingError::EmptyEdges`] for an edge-free graph,
    /// [`EmbeddingError::EdgeArrayLength`] or
    /// [`EmbeddingError::MalformedOffsets`] for inconsistent arrays,
    /// [`EmbeddingError::EdgeOutOfBounds`] for unknown nodes,
    /// [`EmbeddingError::SourceMismatch`] when a source disagrees with its
    /// offset range, [`EmbeddingError::UnsortedTargets`] for unsorted
    /// targets, and [`EmbeddingError::InvalidEdgeWeight`] for negative or
    /// non-finite weights or an all-zero total.
    pub fn new(
        node_count: usize,
        sources: Vec<usize>,
        targets: Vec<usize>,
        row_offsets: Vec<usize>,
        weights: Vec<f32>,
    ) -> Result<Self, EmbeddingError> {
        let edge_count = weights.len();
        if edge_count == 0 {
            return Err(EmbeddingError::EmptyEdges);
        }
        if sources.len() != edge_count || targets.len() != edge_count {
            return Err(EmbeddingError::EdgeArrayLength {
                sources: sources.len(),
                targets: targets.len(),
                weights: edge_count,
            });
        }
        if row_offsets.len() != node_count + 1
            || row_offsets.first() != Some(&0)
            || row_offsets.last() != Some(&edge_count)
        {
            return Err(EmbeddingError::MalformedOffsets { node: 0 });
        }

        if let Some(node) = row_offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(EmbeddingError::MalformedOffsets { node });
        }

        let mut total = 0.0_f64;
        for (node, window) in row_offsets.windows(2).enumerate() {
            for edge in window[0]..window[1] {
                if sources[edge] != node {
                    return Err(EmbeddingError::SourceMismatch {
                        edge,
                        expected: node,
                        got: sources[edge],
                    });
                }
                let target = targets[edge];
                if target >= node_count {
                    return Err(EmbeddingError::EdgeOutOfBounds { edge, node_count });
                }
                if edge > window[0] && targets[edge - 1] >= target {
                    return Err(EmbeddingError::UnsortedTargets { node });
                }
                let weight = weights[edge];
                if !weight.is_finite() || weight < 0.0 {
                    return Err(EmbeddingError::InvalidEdgeWeight { edge, weight });
                }
                total += f64::from(weight);
            }
        }
        if total <= 0.0 {
            return Err(EmbeddingError::InvalidEdgeWeight {
                edge: 0,
                weight: 0.0,
            });
        }

        Ok(Self {
            node_count,
            sources,
            targets,
            row_offsets,
            weights,
        })
    }

    /// Derives an edge list from a graph, taking column `j` as the outgoing
    /// edges of node `j`.
    ///
    /// # Errors
    /// Returns [`EmbeddingError::EmptyEdges`] when the graph stores no
    /// entries and [`EmbeddingError::InvalidEdgeWeight`] when every weight is
    /// zero.
    pub fn from_graph(graph: &SparseGraph) -> Result<Self, EmbeddingError> {
        let sources = (0..graph.node_count())
            .flat_map(|node| std::iter::repeat_n(node, graph.column(node).len()))
            .collect();
        Self::new(
            graph.node_count(),
            sources,
            graph.row_indices().to_vec(),
            graph.col_ptrs().to_vec(),
            graph.values().to_vec(),
        )
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Always `false`; construction rejects empty edge sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Source node of every edge.
    #[must_use]
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// Target node of every edge.
    #[must_use]
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Offsets of each node's edge range.
    #[must_use]
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// Weight of every edge.
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Number of outgoing edges per node.
    #[must_use]
    pub fn out_degrees(&self) -> Vec<usize> {
        self.row_offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Reports whether `target` is among the outgoing neighbours of `source`.
    #[must_use]
    pub fn is_neighbour(&self, source: usize, target: usize) -> bool {
        let range = self.row_offsets[source]..self.row_offsets[source + 1];
        self.targets[range].binary_search(&target).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingErrorCode;
    use rstest::rstest;

    #[test]
    fn derives_edges_from_graph_columns() {
        let graph = SparseGraph::from_undirected_edges(3, &[(0, 1, 1.0), (1, 2, 0.5)])
            .expect("valid graph");
        let edges = EdgeList::from_graph(&graph).expect("valid edges");
        assert_eq!(edges.sources(), &[0, 1, 1, 2]);
        assert_eq!(edges.targets(), &[1, 0, 2, 1]);
        assert_eq!(edges.row_offsets(), &[0, 1, 3, 4]);
        assert_eq!(edges.weights(), &[1.0, 1.0, 0.5, 0.5]);
        assert!(edges.is_neighbour(2, 1));
        assert!(!edges.is_neighbour(0, 2));
    }

    #[test]
    fn edgeless_graph_is_rejected() {
        let graph = SparseGraph::from_triplets(2, []).expect("valid graph");
        assert_eq!(EdgeList::from_graph(&graph), Err(EmbeddingError::EmptyEdges));
    }

    #[rstest]
    #[case::length(vec![0], vec![1, 0], vec![0, 2, 2], vec![1.0, 1.0], EmbeddingErrorCode::EdgeArrayLength)]
    #[case::offsets_len(vec![0], vec![1], vec![0, 1], vec![1.0], EmbeddingErrorCode::MalformedOffsets)]
    #[case::offsets_end(vec![0], vec![1], vec![0, 1, 2], vec![1.0], EmbeddingErrorCode::MalformedOffsets)]
    #[case::decreasing(vec![0, 1], vec![1, 0], vec![0, 2, 1], vec![1.0, 1.0], EmbeddingErrorCode::MalformedOffsets)]
    #[case::overshoot(vec![0, 0], vec![0, 1], vec![0, 5, 2], vec![1.0, 1.0], EmbeddingErrorCode::MalformedOffsets)]
    #[case::source(vec![1], vec![1], vec![0, 1, 1], vec![1.0], EmbeddingErrorCode::SourceMismatch)]
    #[case::target(vec![0], vec![7], vec![0, 1, 1], vec![1.0], EmbeddingErrorCode::EdgeOutOfBounds)]
    #[case::unsorted(vec![0, 0], vec![1, 1], vec![0, 2, 2], vec![1.0, 1.0], EmbeddingErrorCode::UnsortedTargets)]
    #[case::negative(vec![0], vec![1], vec![0, 1, 1], vec![-1.0], EmbeddingErrorCode::InvalidEdgeWeight)]
    #[case::zero_total(vec![0], vec![1], vec![0, 1, 1], vec![0.0], EmbeddingErrorCode::InvalidEdgeWeight)]
    fn rejects_malformed_edges(
        #[case] sources: Vec<usize>,
        #[case] targets: Vec<usize>,
        #[case] offsets: Vec<usize>,
        #[case] weights: Vec<f32>,
        #[case] expected: EmbeddingErrorCode,
    ) {
        let err = EdgeList::new(2, sources, targets, offsets, weights)
            .expect_err("edges are malformed");
        assert_eq!(err.code(), expected);
    }

    #[test]
    fn overshooting_offset_reports_its_node() {
        let err = EdgeList::new(2, vec![0, 0], vec![0, 1], vec![0, 5, 2], vec![1.0, 1.0])
            .expect_err("non-monotone offsets must be rejected");
        assert_eq!(err, EmbeddingError::MalformedOffsets { node: 1 });
    }
}
