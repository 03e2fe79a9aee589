//! Condensation of the dendrogram by minimum cluster size.
//!
//! Walking down from each component root:
//!
//! - When both branches of a merge hold at least `min_pts` points, the
//!   current cluster ends and two child clusters are born at the merge lambda.
//! - When only one branch is large enough, the cluster continues down it and
//!   the points of the small branch fall out at the merge lambda.
//! - When neither branch is large enough, every remaining point falls out.
//!
//! A point that reaches a leaf while still inside a cluster falls out at the
//! lambda of the split that isolated it. Stability accumulates as each point
//! or child cluster leaves.

use std::num::NonZeroUsize;

use super::dendrogram::Dendrogram;

/// Something leaving a condensed cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CondensedEvent {
    /// A single point fell out.
    Point {
        /// Point id.
        index: usize,
        /// Density level at which it left.
        lambda: f32,
    },
    /// A child cluster split off.
    ChildCluster {
        /// Condensed id of the child.
        cluster: usize,
        /// Density level of the split.
        lambda: f32,
        /// Points carried by the child.
        size: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CondensedCluster {
    pub(crate) parent: Option<usize>,
    pub(crate) birth_lambda: f32,
    pub(crate) stability: f32,
    pub(crate) events: Vec<CondensedEvent>,
    pub(crate) children: Vec<usize>,
}

impl CondensedCluster {
    fn new(parent: Option<usize>, birth_lambda: f32) -> Self {
        Self {
            parent,
            birth_lambda,
            stability: 0.0,
            events: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// The condensed cluster tree.
///
/// Cluster ids are assigned in creation order, so every parent id is smaller
/// than the ids of its children.
#[derive(Clone, Debug, PartialEq)]
pub struct CondensedTree {
    pub(crate) clusters: Vec<CondensedCluster>,
    roots: Vec<usize>,
    point_count: usize,
}

impl CondensedTree {
    /// Number of condensed clusters, including ones that never persist.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Clusters born at lambda zero, one per large-enough component.
    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Number of points in the underlying graph.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Parent of `cluster`.
    #[must_use]
    pub fn parent(&self, cluster: usize) -> Option<usize> {
        self.clusters[cluster].parent
    }

    /// Child clusters of `cluster`.
    #[must_use]
    pub fn children(&self, cluster: usize) -> &[usize] {
        &self.clusters[cluster].children
    }

    /// Density level at which `cluster` appeared.
    #[must_use]
    pub fn birth_lambda(&self, cluster: usize) -> f32 {
        self.clusters[cluster].birth_lambda
    }

    /// Accumulated stability of `cluster`.
    #[must_use]
    pub fn stability(&self, cluster: usize) -> f32 {
        self.clusters[cluster].stability
    }

    /// Events of `cluster` in the order they were recorded.
    #[must_use]
    pub fn events(&self, cluster: usize) -> &[CondensedEvent] {
        &self.clusters[cluster].events
    }

    /// A cluster persists when it spans a non-empty lambda range.
    #[must_use]
    pub fn persists(&self, cluster: usize) -> bool {
        self.clusters[cluster].stability > 0.0
    }
}

/// Condenses `dendrogram`, dropping branches smaller than `min_pts`.
///
/// Components with fewer than `min_pts` points produce no cluster at all.
#[must_use]
pub fn condense(dendrogram: &Dendrogram, min_pts: NonZeroUsize) -> CondensedTree {
    let mut builder = CondenseBuilder {
        dendrogram,
        min_pts: min_pts.get(),
        clusters: Vec::new(),
    };
    let mut roots = Vec::new();
    for &root in dendrogram.roots() {
        if dendrogram.node(root).size < builder.min_pts {
            continue;
        }
        let cluster = builder.clusters.len();
        builder.clusters.push(CondensedCluster::new(None, 0.0));
        roots.push(cluster);
        builder.condense_from(root, cluster);
    }
    CondensedTree {
        clusters: builder.clusters,
        roots,
        point_count: dendrogram.leaf_count(),
    }
}

struct CondenseBuilder<'a> {
    dendrogram: &'a Dendrogram,
    min_pts: usize,
    clusters: Vec<CondensedCluster>,
}

impl CondenseBuilder<'_> {
    fn condense_from(&mut self, root: usize, cluster: usize) {
        // (dendrogram node, owning cluster, lambda at which the node was reached)
        let mut pending = vec![(root, cluster, self.clusters[cluster].birth_lambda)];
        while let Some((node_id, cluster_id, arrival)) = pending.pop() {
            let node = self.dendrogram.node(node_id);
            let Some((left, right)) = node.children else {
                if let Some(point) = node.point {
                    self.record_point(cluster_id, point, arrival);
                }
                continue;
            };

            let lambda = node.lambda;
            let left_size = self.dendrogram.node(left).size;
            let right_size = self.dendrogram.node(right).size;
            match (left_size >= self.min_pts, right_size >= self.min_pts) {
                (true, true) => {
                    let left_cluster = self.create_child_cluster(cluster_id, lambda, left_size);
                    let right_cluster = self.create_child_cluster(cluster_id, lambda, right_size);
                    pending.push((right, right_cluster, lambda));
                    pending.push((left, left_cluster, lambda));
                }
                (true, false) => {
                    self.emit_pruned_points(right, cluster_id, lambda);
                    pending.push((left, cluster_id, lambda));
                }
                (false, true) => {
                    self.emit_pruned_points(left, cluster_id, lambda);
                    pending.push((right, cluster_id, lambda));
                }
                (false, false) => {
                    self.emit_pruned_points(left, cluster_id, lambda);
                    self.emit_pruned_points(right, cluster_id, lambda);
                }
            }
        }
    }

    fn create_child_cluster(&mut self, parent: usize, lambda: f32, size: usize) -> usize {
        let child_id = self.clusters.len();
        self.clusters
            .push(CondensedCluster::new(Some(parent), lambda));
        let parent_cluster = &mut self.clusters[parent];
        parent_cluster.children.push(child_id);
        parent_cluster.events.push(CondensedEvent::ChildCluster {
            cluster: child_id,
            lambda,
            size,
        });
        record_stability_increment(parent_cluster, lambda, size as f32);
        child_id
    }

    fn emit_pruned_points(&mut self, node_id: usize, cluster_id: usize, lambda: f32) {
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            let node = self.dendrogram.node(current);
            if let Some(point) = node.point {
                self.record_point(cluster_id, point, lambda);
                continue;
            }
            if let Some((left, right)) = node.children {
                stack.push(right);
                stack.push(left);
            }
        }
    }

    fn record_point(&mut self, cluster_id: usize, point: usize, lambda: f32) {
        let cluster = &mut self.clusters[cluster_id];
        cluster.events.push(CondensedEvent::Point {
            index: point,
            lambda,
        });
        record_stability_increment(cluster, lambda, 1.0);
    }
}

fn record_stability_increment(cluster: &mut CondensedCluster, lambda: f32, size: f32) {
    // Equal lambdas contribute nothing, even when both are infinite.
    if lambda > cluster.birth_lambda {
        cluster.stability += (lambda - cluster.birth_lambda) * size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdbscan::dendrogram::build_dendrogram;
    use crate::hdbscan::mutual_reachability::build_mutual_reachability;
    use crate::hdbscan::prim::build_spanning_tree;
    use crate::{RunToCompletion, SparseGraph};

    fn condensed_for(n: usize, edges: &[(usize, usize, f32)], min_pts: usize) -> CondensedTree {
        let graph = SparseGraph::from_undirected_edges(n, edges).expect("valid graph");
        let mrd = build_mutual_reachability(&graph, &vec![0.0; n], &RunToCompletion)
            .expect("runs");
        let tree = build_spanning_tree(&mrd, &RunToCompletion).expect("runs");
        let dendrogram = build_dendrogram(&tree, &RunToCompletion).expect("runs");
        condense(&dendrogram, NonZeroUsize::new(min_pts).expect("non-zero"))
    }

    fn two_pairs() -> Vec<(usize, usize, f32)> {
        vec![(0, 1, 0.5), (2, 3, 0.5), (1, 2, 2.0)]
    }

    #[test]
    fn split_into_two_large_branches_creates_children() {
        let tree = condensed_for(4, &two_pairs(), 2);
        assert_eq!(tree.cluster_count(), 3);
        assert_eq!(tree.roots(), &[0]);
        assert_eq!(tree.children(0), &[1, 2]);
        assert_eq!(tree.birth_lambda(1), 0.5);
        // Root: two children of size 2 leave at lambda 0.5.
        assert_eq!(tree.stability(0), 2.0);
        // Each child loses both points at lambda 2.
        assert_eq!(tree.stability(1), 3.0);
        assert!(tree.persists(1));
    }

    #[test]
    fn small_branches_fall_out_as_points() {
        let tree = condensed_for(4, &two_pairs(), 3);
        assert_eq!(tree.cluster_count(), 1);
        let points: Vec<_> = tree
            .events(0)
            .iter()
            .map(|event| match event {
                CondensedEvent::Point { index, lambda } => (*index, *lambda),
                CondensedEvent::ChildCluster { .. } => panic!("no child clusters expected"),
            })
            .collect();
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|&(_, lambda)| lambda == 0.5));
    }

    #[test]
    fn components_below_min_pts_are_skipped() {
        let tree = condensed_for(5, &[(0, 1, 1.0), (1, 2, 1.0)], 4);
        assert_eq!(tree.cluster_count(), 0);
        assert!(tree.roots().is_empty());
        assert_eq!(tree.point_count(), 5);
    }

    #[test]
    fn singleton_clusters_never_persist() {
        let tree = condensed_for(3, &[(0, 1, 1.0), (1, 2, 1.0)], 1);
        let leaves: Vec<_> = (0..tree.cluster_count())
            .filter(|&c| tree.children(c).is_empty())
            .collect();
        assert!(!leaves.is_empty());
        for leaf in leaves {
            assert!(!tree.persists(leaf), "leaf cluster {leaf} spans no lambda range");
        }
        assert!(tree.persists(0));
    }

    #[test]
    fn parents_precede_children() {
        let tree = condensed_for(6, &[(0, 1, 0.2), (1, 2, 0.3), (3, 4, 0.2), (4, 5, 0.3), (2, 3, 5.0)], 2);
        for cluster in 0..tree.cluster_count() {
            if let Some(parent) = tree.parent(cluster) {
                assert!(parent < cluster);
            }
        }
    }
}
