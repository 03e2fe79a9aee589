//! Optional counters exported through the `metrics` facade.
//!
//! Without the `metrics` feature every recorder compiles to a no-op.

#[cfg(feature = "metrics")]
pub(crate) fn record_clusters_selected(count: usize) {
    metrics::counter!("hdbscan_clusters_selected").increment(count as u64);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_clusters_selected(_count: usize) {}

#[cfg(feature = "metrics")]
pub(crate) fn record_batches_completed(count: u64) {
    metrics::counter!("embedding_batches_completed").increment(count);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_batches_completed(_count: u64) {}

#[cfg(feature = "metrics")]
pub(crate) fn record_negative_rejections(count: u64) {
    metrics::counter!("embedding_negative_rejections").increment(count);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_negative_rejections(_count: u64) {}
