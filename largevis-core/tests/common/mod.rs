use std::collections::BTreeMap;

use largevis_core::SparseGraph;
use serde::Deserialize;

/// Labelled one-dimensional points with the clustering parameters that
/// recover the labels.
#[derive(Clone, Debug, Deserialize)]
pub struct BlobFixture {
    #[allow(dead_code, reason = "documents the fixture file")]
    pub description: String,
    pub k: usize,
    pub min_pts: usize,
    pub points: Vec<f32>,
    pub labels: Vec<usize>,
}

impl BlobFixture {
    #[must_use]
    pub fn load() -> Self {
        let raw = include_str!("../fixtures/blobs_1d.json");
        serde_json::from_str(raw).unwrap_or_else(|err| panic!("invalid blob fixture: {err}"))
    }
}

/// Builds a symmetric `k`-nearest-neighbour distance graph over `points`.
///
/// Consecutive points in sorted order are always linked so the graph is
/// connected even when the blobs are far apart.
#[must_use]
pub fn knn_graph(points: &[f32], k: usize) -> SparseGraph {
    let mut edges = BTreeMap::new();
    let mut link = |a: usize, b: usize| {
        let key = (a.min(b), a.max(b));
        edges.insert(key, (points[a] - points[b]).abs());
    };

    for i in 0..points.len() {
        let mut others: Vec<usize> = (0..points.len()).filter(|&j| j != i).collect();
        others.sort_by(|&a, &b| {
            let da = (points[a] - points[i]).abs();
            let db = (points[b] - points[i]).abs();
            da.total_cmp(&db).then(a.cmp(&b))
        });
        for &j in others.iter().take(k) {
            link(i, j);
        }
    }

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| points[a].total_cmp(&points[b]));
    for pair in order.windows(2) {
        link(pair[0], pair[1]);
    }

    let edges: Vec<_> = edges.into_iter().map(|((a, b), w)| (a, b, w)).collect();
    SparseGraph::from_undirected_edges(points.len(), &edges)
        .unwrap_or_else(|err| panic!("fixture graph is invalid: {err}"))
}
