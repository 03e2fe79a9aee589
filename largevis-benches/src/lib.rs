//! Benchmark support crate for largevis.
//!
//! Provides synthetic neighbour graphs and parameter types used by the
//! Criterion benchmarks for the clustering pipeline and the embedding
//! optimiser.

pub mod error;
pub mod params;
pub mod source;
