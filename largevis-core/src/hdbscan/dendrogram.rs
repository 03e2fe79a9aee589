//! Single-linkage dendrogram recovered from the spanning tree.
//!
//! The spanning tree encodes the same hierarchy as the full
//! mutual-reachability graph. Sorting its edges by increasing distance
//! (decreasing lambda) and merging components with a union-find yields one
//! binary tree per connected component.

use super::prim::SpanningTree;
use super::union_find::DisjointSet;
use crate::progress::{Cancelled, Progress, checkpoint};

/// Converts a distance into a density level.
pub(crate) fn distance_to_lambda(distance: f32) -> f32 {
    if distance == 0.0 {
        f32::INFINITY
    } else {
        1.0 / distance
    }
}

/// A node of the dendrogram: a leaf holding one point, or a merge of two
/// subtrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DendrogramNode {
    /// The two merged subtrees, or `None` for a leaf.
    pub children: Option<(usize, usize)>,
    /// Density level of the merge; infinite for leaves.
    pub lambda: f32,
    /// Number of points below this node.
    pub size: usize,
    /// The point held by a leaf.
    pub point: Option<usize>,
}

/// Binary merge forest over the points of a spanning tree.
///
/// Nodes `0..leaf_count` are leaves for the matching points; merge nodes
/// follow in merge order.
#[derive(Clone, Debug, PartialEq)]
pub struct Dendrogram {
    nodes: Vec<DendrogramNode>,
    roots: Vec<usize>,
    leaf_count: usize,
}

impl Dendrogram {
    /// Number of points.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Number of merge nodes.
    #[must_use]
    pub fn merge_count(&self) -> usize {
        self.nodes.len() - self.leaf_count
    }

    /// All nodes, leaves first.
    #[must_use]
    pub fn nodes(&self) -> &[DendrogramNode] {
        &self.nodes
    }

    /// Top node of every connected component, ascending.
    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub(crate) fn node(&self, id: usize) -> &DendrogramNode {
        &self.nodes[id]
    }
}

/// Builds the dendrogram for `tree`, polling `progress` once per merge.
///
/// Edges with equal distance merge in child order, keeping the result
/// deterministic.
///
/// # Errors
/// Returns [`Cancelled`] when `progress` requests a stop.
pub fn build_dendrogram<P: Progress + ?Sized>(
    tree: &SpanningTree,
    progress: &P,
) -> Result<Dendrogram, Cancelled> {
    let leaf_count = tree.node_count();
    let mut nodes = Vec::with_capacity(leaf_count.saturating_mul(2).saturating_sub(1));
    nodes.extend((0..leaf_count).map(|point| DendrogramNode {
        children: None,
        lambda: f32::INFINITY,
        size: 1,
        point: Some(point),
    }));

    let mut edges: Vec<(usize, usize, f32)> = tree.edges().collect();
    edges.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));

    let mut set = DisjointSet::new(leaf_count);
    for (child, parent, distance) in edges {
        checkpoint(progress)?;
        let left_root = set.find(child);
        let right_root = set.find(parent);
        let left_node = set.component_node(left_root);
        let right_node = set.component_node(right_root);
        let Some(merged) = set.union(left_root, right_root, distance_to_lambda(distance)) else {
            continue;
        };
        let id = nodes.len();
        nodes.push(DendrogramNode {
            children: Some((left_node, right_node)),
            lambda: set.birth_lambda(merged),
            size: set.size(merged),
            point: None,
        });
        set.set_component_node(merged, id);
    }

    let mut roots: Vec<usize> = (0..leaf_count)
        .filter_map(|node| (set.find(node) == node).then(|| set.component_node(node)))
        .collect();
    roots.sort_unstable();

    Ok(Dendrogram {
        nodes,
        roots,
        leaf_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdbscan::mutual_reachability::build_mutual_reachability;
    use crate::hdbscan::prim::build_spanning_tree;
    use crate::{RunToCompletion, SparseGraph};

    fn dendrogram_for(n: usize, edges: &[(usize, usize, f32)]) -> Dendrogram {
        let graph = SparseGraph::from_undirected_edges(n, edges).expect("valid graph");
        let mrd = build_mutual_reachability(&graph, &vec![0.0; n], &RunToCompletion)
            .expect("runs");
        let tree = build_spanning_tree(&mrd, &RunToCompletion).expect("runs");
        build_dendrogram(&tree, &RunToCompletion).expect("runs")
    }

    #[test]
    fn connected_tree_has_one_fewer_merge_than_points() {
        let dendrogram = dendrogram_for(4, &[(0, 1, 1.0), (1, 2, 2.0), (2, 3, 4.0)]);
        assert_eq!(dendrogram.leaf_count(), 4);
        assert_eq!(dendrogram.merge_count(), 3);
        assert_eq!(dendrogram.roots(), &[6]);
        let root = dendrogram.node(6);
        assert_eq!(root.size, 4);
        assert_eq!(root.lambda, 0.25);
    }

    #[test]
    fn merges_happen_in_decreasing_lambda_order() {
        let dendrogram = dendrogram_for(4, &[(0, 1, 3.0), (1, 2, 1.0), (2, 3, 2.0)]);
        let lambdas: Vec<f32> = dendrogram.nodes()[4..].iter().map(|n| n.lambda).collect();
        assert_eq!(lambdas, vec![1.0, 0.5, 1.0 / 3.0]);
        assert_eq!(dendrogram.node(4).children, Some((2, 1)));
    }

    #[test]
    fn disconnected_tree_yields_a_forest() {
        let dendrogram = dendrogram_for(5, &[(0, 1, 1.0), (2, 3, 1.0)]);
        assert_eq!(dendrogram.merge_count(), 1);
        assert_eq!(dendrogram.roots().len(), 4);
    }

    #[test]
    fn zero_distance_merges_at_infinite_lambda() {
        let dendrogram = dendrogram_for(2, &[(0, 1, 0.0)]);
        assert!(dendrogram.node(2).lambda.is_infinite());
        assert_eq!(distance_to_lambda(4.0), 0.25);
    }
}
