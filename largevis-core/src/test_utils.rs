//! Shared test utilities for `largevis-core`.

use largevis_test_support::proptest_profile::ProptestRunProfile;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use crate::SparseGraph;

/// Builds a standard proptest configuration from the shared profile.
///
/// This keeps property suites aligned on the same `PROGTEST_CASES` and
/// `LARGEVIS_PBT_FORK` interpretation.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// Random undirected graph: node count plus deduplicated weighted edges.
#[derive(Clone, Debug)]
pub(crate) struct GraphFixture {
    pub(crate) node_count: usize,
    pub(crate) edges: Vec<(usize, usize, f32)>,
}

impl GraphFixture {
    pub(crate) fn graph(&self) -> SparseGraph {
        SparseGraph::from_undirected_edges(self.node_count, &self.edges)
            .expect("fixture edges must form a valid graph")
    }

    /// Connected component id of every node, by flood fill.
    pub(crate) fn components(&self) -> Vec<usize> {
        let mut adjacency = vec![Vec::new(); self.node_count];
        for &(a, b, _) in &self.edges {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        let mut component = vec![usize::MAX; self.node_count];
        let mut next = 0;
        for start in 0..self.node_count {
            if component[start] != usize::MAX {
                continue;
            }
            let mut stack = vec![start];
            component[start] = next;
            while let Some(node) = stack.pop() {
                for &neighbour in &adjacency[node] {
                    if component[neighbour] == usize::MAX {
                        component[neighbour] = next;
                        stack.push(neighbour);
                    }
                }
            }
            next += 1;
        }
        component
    }
}

/// Generates graphs with up to `max_nodes` nodes and integer-valued weights,
/// so that tied distances are common.
pub(crate) fn graph_fixture(max_nodes: usize) -> impl Strategy<Value = GraphFixture> {
    (1..=max_nodes).prop_flat_map(|node_count| {
        let edge = (0..node_count, 0..node_count, 1_u8..=8);
        prop::collection::vec(edge, 0..node_count * 3).prop_map(move |raw| {
            let mut seen = std::collections::HashSet::new();
            let edges = raw
                .into_iter()
                .filter(|&(a, b, _)| a != b && seen.insert((a.min(b), a.max(b))))
                .map(|(a, b, w)| (a, b, f32::from(w)))
                .collect();
            GraphFixture { node_count, edges }
        })
    })
}
