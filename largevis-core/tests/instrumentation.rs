//! Checks the tracing spans and events emitted by both engines.

use largevis_core::embedding::{
    Coordinates, EdgeList, EmbeddingParams, ExecutionStrategy, optimize_embedding,
};
use largevis_core::{CancellationToken, RunToCompletion, SparseGraph, hdbscan};
use largevis_test_support::recording::RecordingLayer;
use tracing::Level;

fn path_graph() -> SparseGraph {
    SparseGraph::from_undirected_edges(4, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)])
        .expect("valid graph")
}

#[test]
fn clustering_records_pipeline_spans() {
    let layer = RecordingLayer::default();
    let output = layer.capture(|| hdbscan(&path_graph(), 1, 1, &RunToCompletion));
    assert!(output.expect("valid configuration").status.is_completed());

    let process = layer.span("hdbscan.process").expect("pipeline span");
    assert_eq!(process.fields.get("nodes").map(String::as_str), Some("4"));
    assert_eq!(process.fields.get("min_pts").map(String::as_str), Some("1"));
    assert!(layer.span("hdbscan.prim").is_some());
    assert!(layer.has_event(Level::INFO, "clustering completed"));
}

#[test]
fn clustering_cancellation_is_a_warning() {
    let layer = RecordingLayer::default();
    let token = CancellationToken::new();
    token.cancel();
    let output = layer.capture(|| hdbscan(&path_graph(), 1, 1, &token));
    assert!(!output.expect("valid configuration").status.is_completed());
    assert!(layer.has_event(
        Level::WARN,
        "clustering cancelled by progress callback"
    ));
}

#[test]
fn embedding_records_its_span() {
    let layer = RecordingLayer::default();
    let edges = EdgeList::new(2, vec![0, 1], vec![1, 0], vec![0, 1, 2], vec![1.0, 1.0])
        .expect("valid edges");
    let coords = Coordinates::new(vec![0.0, 1.0], 1).expect("valid coordinates");
    let params = EmbeddingParams::builder()
        .with_batches(50)
        .with_execution(ExecutionStrategy::SingleThreaded)
        .build()
        .expect("valid params");

    let output = layer.capture(|| optimize_embedding(coords, &edges, &params, &RunToCompletion));
    assert_eq!(output.expect("embedding runs").batches_completed, 50);

    let span = layer.span("embedding.optimize").expect("optimiser span");
    assert_eq!(span.fields.get("edges").map(String::as_str), Some("2"));
    assert_eq!(span.fields.get("dimensions").map(String::as_str), Some("1"));
    assert!(layer.has_event(Level::INFO, "embedding completed"));
}

#[test]
fn embedding_errors_are_recorded() {
    let layer = RecordingLayer::default();
    let edges = EdgeList::new(2, vec![0], vec![1], vec![0, 1, 1], vec![1.0]).expect("valid edges");
    let coords = Coordinates::new(vec![0.0, 1.0, 2.0], 1).expect("valid coordinates");
    let params = EmbeddingParams::builder().build().expect("valid params");

    let result = layer.capture(|| optimize_embedding(coords, &edges, &params, &RunToCompletion));
    assert!(result.is_err());
    assert!(
        layer
            .events()
            .iter()
            .any(|event| event.level == Level::ERROR)
    );
}
