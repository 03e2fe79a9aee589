//! Benchmark setup error type.
//!
//! Lets setup functions propagate failures with `?` instead of `.expect()`.

use largevis_core::Cancelled;
use largevis_core::embedding::EmbeddingError;
use largevis_core::hdbscan::HdbscanError;

use crate::source::SyntheticError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic data generation failed.
    #[error("synthetic graph generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Clustering configuration failed.
    #[error("clustering failed: {0}")]
    Hdbscan(#[from] HdbscanError),
    /// Embedding configuration failed.
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    /// A setup stage stopped early.
    #[error("setup stage was cancelled")]
    Cancelled(#[from] Cancelled),
    /// A zero value was passed where a non-zero integer was required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// A description of the parameter that was unexpectedly zero.
        context: &'static str,
    },
}
