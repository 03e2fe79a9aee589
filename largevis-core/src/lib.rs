//! Graph clustering and graph embedding engines.
//!
//! Both engines consume a precomputed sparse nearest-neighbour graph:
//!
//! - [`hdbscan`](mod@hdbscan) turns edge distances into a density hierarchy and extracts
//!   the most stable flat clustering;
//! - [`embedding`] lays the nodes out in a low-dimensional space with
//!   LargeVis-style stochastic gradient descent.
//!
//! Long-running work polls a caller-supplied [`Progress`] and stops early,
//! reporting [`RunStatus::Cancelled`], when it returns `false`.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod graph;
mod progress;
mod result;
mod telemetry;

pub mod embedding;
pub mod hdbscan;

#[cfg(test)]
mod test_utils;

pub use crate::{
    embedding::optimize_embedding,
    error::{GraphError, GraphErrorCode},
    graph::SparseGraph,
    hdbscan::{Hdbscan, HdbscanBuilder, hdbscan},
    progress::{CancellationToken, Cancelled, Progress, RunStatus, RunToCompletion},
    result::{Assignment, ClusterId, FlatClustering, NonContiguousClusterIds},
};
