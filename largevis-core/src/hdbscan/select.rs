//! Stability-based cluster selection and labelling.
//!
//! Only persistent clusters (those spanning a non-empty lambda range) take
//! part. Each persistent cluster's parent is its nearest persistent ancestor.
//! Working bottom-up, a cluster keeps itself when its own stability beats the
//! best total its descendants can offer; otherwise the descendants' choice
//! propagates upwards. Selected clusters never nest.

use super::condense::{CondensedEvent, CondensedTree};
use crate::result::{Assignment, ClusterId, FlatClustering};

/// How to resolve a cluster whose stability equals its children's total.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TieBreak {
    /// Keep the parent cluster.
    #[default]
    PreferParent,
    /// Keep the children.
    PreferChildren,
}

/// Per-node and per-cluster view of the condensed hierarchy.
///
/// Cluster vectors are indexed by a dense id over persistent clusters,
/// ordered as they were created during condensation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HierarchyReport {
    /// Deepest persistent cluster containing each node.
    pub node_membership: Vec<Option<usize>>,
    /// Birth lambda of each node's cluster; zero for nodes without one.
    pub lambda: Vec<f32>,
    /// Lambda at which each node fell out of the hierarchy; zero for nodes
    /// in components below the minimum size.
    pub point_lambdas: Vec<f32>,
    /// Nearest persistent ancestor of each cluster.
    pub parent: Vec<Option<usize>>,
    /// Stability of each cluster.
    pub stability: Vec<f32>,
    /// Whether each cluster was selected for the flat clustering.
    pub selected: Vec<bool>,
}

impl HierarchyReport {
    /// Number of persistent clusters.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.stability.len()
    }

    /// Dense ids of the selected clusters, ascending.
    #[must_use]
    pub fn selected_clusters(&self) -> Vec<usize> {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(id, &chosen)| chosen.then_some(id))
            .collect()
    }
}

/// Persistent clusters and the selection made over them.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Selection {
    /// Condensed id of each dense cluster.
    condensed: Vec<usize>,
    /// Dense id of each condensed cluster, when it persists.
    dense: Vec<Option<usize>>,
    parent: Vec<Option<usize>>,
    stability: Vec<f32>,
    selected: Vec<bool>,
}

impl Selection {
    pub(crate) fn selected_count(&self) -> usize {
        self.selected.iter().filter(|&&chosen| chosen).count()
    }
}

/// Selects the flat clustering with maximal total stability.
pub(crate) fn select_clusters(tree: &CondensedTree, tie_break: TieBreak) -> Selection {
    let mut condensed = Vec::new();
    let mut dense = vec![None; tree.cluster_count()];
    // Nearest persistent ancestor-or-self, per condensed cluster.
    let mut persistent_self = vec![None::<usize>; tree.cluster_count()];
    let mut parent = Vec::new();
    let mut stability = Vec::new();

    for cluster in 0..tree.cluster_count() {
        let inherited = tree.parent(cluster).and_then(|p| persistent_self[p]);
        if tree.persists(cluster) {
            let id = condensed.len();
            condensed.push(cluster);
            dense[cluster] = Some(id);
            parent.push(inherited);
            stability.push(tree.stability(cluster));
            persistent_self[cluster] = Some(id);
        } else {
            persistent_self[cluster] = inherited;
        }
    }

    let count = condensed.len();
    let mut children_total = vec![0.0_f32; count];
    let mut has_children = vec![false; count];
    let mut keeps_self = vec![true; count];
    for id in (0..count).rev() {
        let prefer_children = has_children[id]
            && match tie_break {
                TieBreak::PreferParent => children_total[id] > stability[id],
                TieBreak::PreferChildren => children_total[id] >= stability[id],
            };
        keeps_self[id] = !prefer_children;
        let best = if prefer_children {
            children_total[id]
        } else {
            stability[id]
        };
        if let Some(p) = parent[id] {
            children_total[p] += best;
            has_children[p] = true;
        }
    }

    let mut selected = vec![false; count];
    let mut covered = vec![false; count];
    for id in 0..count {
        covered[id] = parent[id].is_some_and(|p| covered[p] || selected[p]);
        selected[id] = !covered[id] && keeps_self[id];
    }

    Selection {
        condensed,
        dense,
        parent,
        stability,
        selected,
    }
}

/// Labels every point from `selection`, returning the flat clustering and
/// the hierarchy report.
pub(crate) fn label_points(
    tree: &CondensedTree,
    selection: &Selection,
) -> (FlatClustering, HierarchyReport) {
    let clusters = tree.cluster_count();
    let flat_ids: Vec<Option<ClusterId>> = {
        let mut next = 0_u64;
        selection
            .selected
            .iter()
            .map(|&chosen| {
                chosen.then(|| {
                    let id = ClusterId::new(next);
                    next += 1;
                    id
                })
            })
            .collect()
    };

    // Nearest persistent and nearest selected ancestor-or-self, per condensed
    // cluster. Parents always precede children.
    let mut membership = vec![None::<usize>; clusters];
    let mut chosen = vec![None::<usize>; clusters];
    for cluster in 0..clusters {
        let parent = tree.parent(cluster);
        membership[cluster] = selection.dense[cluster].or_else(|| parent.and_then(|p| membership[p]));
        chosen[cluster] = selection.dense[cluster]
            .filter(|&id| selection.selected[id])
            .or_else(|| parent.and_then(|p| chosen[p]));
    }

    let points = tree.point_count();
    let mut assignments = vec![Assignment::noise(); points];
    let mut report = HierarchyReport {
        node_membership: vec![None; points],
        lambda: vec![0.0; points],
        point_lambdas: vec![0.0; points],
        parent: selection.parent.clone(),
        stability: selection.stability.clone(),
        selected: selection.selected.clone(),
    };

    for cluster in 0..clusters {
        for event in tree.events(cluster) {
            let CondensedEvent::Point { index, lambda } = *event else {
                continue;
            };
            report.point_lambdas[index] = lambda;
            if let Some(member_of) = membership[cluster] {
                report.node_membership[index] = Some(member_of);
                report.lambda[index] = tree.birth_lambda(selection.condensed[member_of]);
            }
            if let Some(flat) = chosen[cluster].and_then(|id| flat_ids[id]) {
                assignments[index] = Assignment::clustered(flat, lambda);
            }
        }
    }

    let clustering = FlatClustering::from_dense(assignments, selection.selected_count());
    (clustering, report)
}
