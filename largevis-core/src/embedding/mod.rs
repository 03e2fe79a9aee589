//! LargeVis-style graph embedding.
//!
//! Given a weighted neighbour graph and initial coordinates, the optimiser
//! runs asynchronous stochastic gradient descent: edges are sampled in
//! proportion to their weight, endpoints attract under the configured force
//! law, and negative samples drawn by `degree^0.75` repel. Workers update the
//! shared coordinates without locks.

mod alias;
mod coords;
mod edges;
mod gradient;
mod rng;
mod sgd;


use thiserror::Error;
use tracing::{info, instrument, warn};

pub use self::alias::{AliasError, AliasErrorCode, AliasTable};
pub use self::coords::{Coordinates, MAX_DIMENSIONS};
pub use self::edges::EdgeList;
pub use self::gradient::ForceLawKind;

use self::coords::SharedCoordinates;
use self::gradient::{AlphaLaw, AlphaOneLaw, ExponentialLaw, ForceLaw};
use self::sgd::{SgdRun, SgdStats};
use crate::error::define_error_codes;
use crate::progress::{Progress, RunStatus};
use crate::telemetry;

/// Default SGD iterations per node when no batch count is configured.
pub const DEFAULT_BATCHES_PER_NODE: usize = 10_000;

/// Errors returned when configuring or running the embedding engine.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EmbeddingError {
    /// Dimensionality must lie in `1..=max`.
    #[error("embedding dimensionality {got} is outside 1..={max}")]
    InvalidDimensions {
        /// Requested dimensionality.
        got: usize,
        /// Largest supported dimensionality.
        max: usize,
    },
    /// The coordinate buffer does not divide into whole rows.
    #[error("{len} coordinates do not form rows of {dimensions}")]
    RaggedCoordinates {
        /// Buffer length.
        len: usize,
        /// Requested dimensionality.
        dimensions: usize,
    },
    /// Initial coordinates must be finite.
    #[error("initial coordinates of node {node} are not finite")]
    NonFiniteCoordinate {
        /// First offending node.
        node: usize,
    },
    /// Coordinates and edges describe different node counts.
    #[error("coordinates cover {coordinates} nodes but edges cover {edges}")]
    NodeCountMismatch {
        /// Rows in the coordinate matrix.
        coordinates: usize,
        /// Nodes in the edge list.
        edges: usize,
    },
    /// At least one edge is required.
    #[error("edge list is empty")]
    EmptyEdges,
    /// The parallel edge arrays differ in length.
    #[error("edge arrays differ in length: {sources} sources, {targets} targets, {weights} weights")]
    EdgeArrayLength {
        /// Number of sources.
        sources: usize,
        /// Number of targets.
        targets: usize,
        /// Number of weights.
        weights: usize,
    },
    /// Row offsets must hold `node_count + 1` non-decreasing values from zero
    /// to the edge count.
    #[error("row offsets are malformed at node {node}")]
    MalformedOffsets {
        /// First node whose offsets are invalid.
        node: usize,
    },
    /// An edge's source disagrees with the offset range holding it.
    #[error("edge {edge} lists source {got} but lies in the range of node {expected}")]
    SourceMismatch {
        /// Offending edge.
        edge: usize,
        /// Node owning the offset range.
        expected: usize,
        /// Source stored on the edge.
        got: usize,
    },
    /// An edge targets a node outside the graph.
    #[error("edge {edge} targets a node outside 0..{node_count}")]
    EdgeOutOfBounds {
        /// Offending edge.
        edge: usize,
        /// Number of nodes.
        node_count: usize,
    },
    /// Targets within a node's range must be strictly increasing.
    #[error("targets of node {node} are unsorted or duplicated")]
    UnsortedTargets {
        /// Offending node.
        node: usize,
    },
    /// Edge weights must be finite, non-negative, and not all zero.
    #[error("edge {edge} has invalid weight {weight}")]
    InvalidEdgeWeight {
        /// Offending edge.
        edge: usize,
        /// The rejected weight.
        weight: f32,
    },
    /// A numeric parameter is out of range.
    #[error("parameter {name} has invalid value {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },
    /// The batch count must be positive.
    #[error("the number of SGD batches must be positive")]
    ZeroBatches,
    /// At least one rejection must be allowed before giving up on negatives.
    #[error("max_consecutive_rejections must be positive")]
    ZeroRejectionCap,
    /// The requested execution strategy is not compiled in.
    #[error("execution strategy {requested:?} is unavailable in this build")]
    BackendUnavailable {
        /// Strategy that was requested.
        requested: ExecutionStrategy,
    },
    /// A sampling table could not be built.
    #[error(transparent)]
    Alias {
        /// Underlying table error.
        #[from]
        source: AliasError,
    },
}

define_error_codes! {
    /// Stable codes describing [`EmbeddingError`] variants.
    enum EmbeddingErrorCode for EmbeddingError {
        /// Dimensionality out of range.
        InvalidDimensions => InvalidDimensions { .. } => "EMBEDDING_INVALID_DIMENSIONS",
        /// Coordinate buffer has a partial row.
        RaggedCoordinates => RaggedCoordinates { .. } => "EMBEDDING_RAGGED_COORDINATES",
        /// Initial coordinates were not finite.
        NonFiniteCoordinate => NonFiniteCoordinate { .. } => "EMBEDDING_NON_FINITE_COORDINATE",
        /// Coordinates and edges disagree on node count.
        NodeCountMismatch => NodeCountMismatch { .. } => "EMBEDDING_NODE_COUNT_MISMATCH",
        /// No edges were supplied.
        EmptyEdges => EmptyEdges => "EMBEDDING_EMPTY_EDGES",
        /// Edge arrays differ in length.
        EdgeArrayLength => EdgeArrayLength { .. } => "EMBEDDING_EDGE_ARRAY_LENGTH",
        /// Row offsets are malformed.
        MalformedOffsets => MalformedOffsets { .. } => "EMBEDDING_MALFORMED_OFFSETS",
        /// An edge source disagrees with its range.
        SourceMismatch => SourceMismatch { .. } => "EMBEDDING_SOURCE_MISMATCH",
        /// An edge target is out of range.
        EdgeOutOfBounds => EdgeOutOfBounds { .. } => "EMBEDDING_EDGE_OUT_OF_BOUNDS",
        /// Targets are unsorted.
        UnsortedTargets => UnsortedTargets { .. } => "EMBEDDING_UNSORTED_TARGETS",
        /// An edge weight is invalid.
        InvalidEdgeWeight => InvalidEdgeWeight { .. } => "EMBEDDING_INVALID_EDGE_WEIGHT",
        /// A numeric parameter is out of range.
        InvalidParameter => InvalidParameter { .. } => "EMBEDDING_INVALID_PARAMETER",
        /// The batch count was zero.
        ZeroBatches => ZeroBatches => "EMBEDDING_ZERO_BATCHES",
        /// The rejection cap was zero.
        ZeroRejectionCap => ZeroRejectionCap => "EMBEDDING_ZERO_REJECTION_CAP",
        /// The requested strategy is not compiled in.
        BackendUnavailable => BackendUnavailable { .. } => "EMBEDDING_BACKEND_UNAVAILABLE",
        /// A sampling table could not be built.
        Alias => Alias { .. } => "EMBEDDING_ALIAS",
    }
}

/// How SGD work is scheduled.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ExecutionStrategy {
    /// Parallel when the `cpu` feature is enabled, single-threaded otherwise.
    #[default]
    Auto,
    /// Lock-free parallel workers on the rayon pool.
    Parallel,
    /// Blocks in order on the calling thread; reproducible for a fixed seed.
    SingleThreaded,
}

impl ExecutionStrategy {
    fn resolve(self) -> Result<bool, EmbeddingError> {
        match self {
            Self::SingleThreaded => Ok(false),
            Self::Auto => Ok(cfg!(feature = "cpu")),
            #[cfg(feature = "cpu")]
            Self::Parallel => Ok(true),
            #[cfg(not(feature = "cpu"))]
            Self::Parallel => Err(EmbeddingError::BackendUnavailable {
                requested: Self::Parallel,
            }),
        }
    }
}

/// Validated embedding parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingParams {
    gamma: f32,
    rho: f32,
    min_rho: f32,
    batches: Option<usize>,
    negative_samples: usize,
    alpha: f32,
    max_consecutive_rejections: usize,
    execution: ExecutionStrategy,
    parallel: bool,
    rng_seed: u64,
}

impl EmbeddingParams {
    /// Starts a builder populated with defaults.
    #[must_use]
    pub fn builder() -> EmbeddingParamsBuilder {
        EmbeddingParamsBuilder::default()
    }

    /// Repulsion weight.
    #[must_use]
    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    /// Initial learning rate.
    #[must_use]
    pub fn rho(&self) -> f32 {
        self.rho
    }

    /// Final learning rate.
    #[must_use]
    pub fn min_rho(&self) -> f32 {
        self.min_rho
    }

    /// Configured batch count, if any.
    #[must_use]
    pub fn batches(&self) -> Option<usize> {
        self.batches
    }

    /// Batch count for a graph with `node_count` nodes.
    #[must_use]
    pub fn batches_for(&self, node_count: usize) -> usize {
        self.batches
            .unwrap_or_else(|| node_count.saturating_mul(DEFAULT_BATCHES_PER_NODE))
    }

    /// Negative samples per positive edge.
    #[must_use]
    pub fn negative_samples(&self) -> usize {
        self.negative_samples
    }

    /// Force-law shape parameter.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Force law selected by [`Self::alpha`].
    #[must_use]
    pub fn force_law(&self) -> ForceLawKind {
        ForceLawKind::from_alpha(self.alpha)
    }

    /// Consecutive rejected negatives after which an iteration gives up on
    /// the rest of its negative samples.
    #[must_use]
    pub fn max_consecutive_rejections(&self) -> usize {
        self.max_consecutive_rejections
    }

    /// Requested execution strategy.
    #[must_use]
    pub fn execution(&self) -> ExecutionStrategy {
        self.execution
    }

    /// Base seed for the per-block random streams.
    #[must_use]
    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }
}

/// Configures [`EmbeddingParams`].
///
/// # Examples
/// ```
/// use largevis_core::embedding::{EmbeddingParams, ExecutionStrategy, ForceLawKind};
///
/// let params = EmbeddingParams::builder()
///     .with_gamma(5.0)
///     .with_alpha(0.0)
///     .with_batches(1_000)
///     .with_execution(ExecutionStrategy::SingleThreaded)
///     .build()?;
/// assert_eq!(params.force_law(), ForceLawKind::Exponential);
/// assert_eq!(params.batches_for(10), 1_000);
/// # Ok::<(), largevis_core::embedding::EmbeddingError>(())
/// ```
#[derive(Clone, Debug)]
pub struct EmbeddingParamsBuilder {
    gamma: f32,
    rho: f32,
    min_rho: f32,
    batches: Option<usize>,
    negative_samples: usize,
    alpha: f32,
    max_consecutive_rejections: usize,
    execution: ExecutionStrategy,
    rng_seed: u64,
}

impl Default for EmbeddingParamsBuilder {
    fn default() -> Self {
        Self {
            gamma: 7.0,
            rho: 1.0,
            min_rho: 0.0,
            batches: None,
            negative_samples: 5,
            alpha: 1.0,
            max_consecutive_rejections: 10,
            execution: ExecutionStrategy::Auto,
            rng_seed: 0x5EED_CAFE,
        }
    }
}

impl EmbeddingParamsBuilder {
    /// Sets the repulsion weight.
    #[must_use]
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the initial learning rate.
    #[must_use]
    pub fn with_rho(mut self, rho: f32) -> Self {
        self.rho = rho;
        self
    }

    /// Sets the final learning rate.
    #[must_use]
    pub fn with_min_rho(mut self, min_rho: f32) -> Self {
        self.min_rho = min_rho;
        self
    }

    /// Sets the number of SGD iterations.
    #[must_use]
    pub fn with_batches(mut self, batches: usize) -> Self {
        self.batches = Some(batches);
        self
    }

    /// Sets the negative samples per edge.
    #[must_use]
    pub fn with_negative_samples(mut self, negative_samples: usize) -> Self {
        self.negative_samples = negative_samples;
        self
    }

    /// Sets the force-law shape parameter.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the consecutive-rejection cap for negative sampling.
    #[must_use]
    pub fn with_max_consecutive_rejections(mut self, cap: usize) -> Self {
        self.max_consecutive_rejections = cap;
        self
    }

    /// Sets the execution strategy.
    #[must_use]
    pub fn with_execution(mut self, execution: ExecutionStrategy) -> Self {
        self.execution = execution;
        self
    }

    /// Sets the base random seed.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`EmbeddingError::InvalidParameter`] for a negative or
    /// non-finite `gamma` or `alpha`, a non-positive `rho`, or a `min_rho`
    /// outside `0..=rho`; [`EmbeddingError::ZeroBatches`] and
    /// [`EmbeddingError::ZeroRejectionCap`] for zero counts; and
    /// [`EmbeddingError::BackendUnavailable`] when parallel execution is
    /// requested without the `cpu` feature.
    pub fn build(self) -> Result<EmbeddingParams, EmbeddingError> {
        let invalid = |name, value| EmbeddingError::InvalidParameter { name, value };
        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return Err(invalid("gamma", self.gamma));
        }
        if !self.rho.is_finite() || self.rho <= 0.0 {
            return Err(invalid("rho", self.rho));
        }
        if !self.min_rho.is_finite() || self.min_rho < 0.0 || self.min_rho > self.rho {
            return Err(invalid("min_rho", self.min_rho));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(invalid("alpha", self.alpha));
        }
        if self.batches == Some(0) {
            return Err(EmbeddingError::ZeroBatches);
        }
        if self.max_consecutive_rejections == 0 {
            return Err(EmbeddingError::ZeroRejectionCap);
        }
        let parallel = self.execution.resolve()?;
        Ok(EmbeddingParams {
            gamma: self.gamma,
            rho: self.rho,
            min_rho: self.min_rho,
            batches: self.batches,
            negative_samples: self.negative_samples,
            alpha: self.alpha,
            max_consecutive_rejections: self.max_consecutive_rejections,
            execution: self.execution,
            parallel,
            rng_seed: self.rng_seed,
        })
    }
}

/// Result of an embedding run.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingOutput {
    /// Final coordinates; partially optimised when cancelled.
    pub coordinates: Coordinates,
    /// Whether every batch ran.
    pub status: RunStatus,
    /// SGD iterations actually performed.
    pub batches_completed: u64,
    /// Negative samples rejected as endpoints or neighbours.
    pub negative_rejections: u64,
}

/// Optimises `coordinates` in place against `edges`.
///
/// Polls `progress` once per SGD iteration from every worker.
///
/// # Errors
/// Returns [`EmbeddingError::NodeCountMismatch`] when the coordinate rows and
/// edge list disagree, and [`EmbeddingError::Alias`] if a sampling table
/// cannot be built. Cancellation is reported through
/// [`EmbeddingOutput::status`].
///
/// # Examples
/// ```
/// use largevis_core::RunToCompletion;
/// use largevis_core::embedding::{Coordinates, EdgeList, EmbeddingParams, optimize_embedding};
///
/// let edges = EdgeList::new(2, vec![0, 1], vec![1, 0], vec![0, 1, 2], vec![1.0, 1.0])?;
/// let coords = Coordinates::new(vec![0.0, 0.0, 3.0, 4.0], 2)?;
/// let params = EmbeddingParams::builder()
///     .with_batches(200)
///     .with_negative_samples(0)
///     .with_rho(0.1)
///     .build()?;
/// let output = optimize_embedding(coords, &edges, &params, &RunToCompletion)?;
/// assert_eq!(output.batches_completed, 200);
/// assert!(output.coordinates.distance_squared(0, 1) < 25.0);
/// # Ok::<(), largevis_core::embedding::EmbeddingError>(())
/// ```
#[instrument(
    name = "embedding.optimize",
    err,
    skip_all,
    fields(
        nodes = coordinates.len(),
        dimensions = coordinates.dimensions(),
        edges = edges.len(),
        law = ?params.force_law(),
    ),
)]
pub fn optimize_embedding<P: Progress + ?Sized>(
    coordinates: Coordinates,
    edges: &EdgeList,
    params: &EmbeddingParams,
    progress: &P,
) -> Result<EmbeddingOutput, EmbeddingError> {
    if coordinates.len() != edges.node_count() {
        return Err(EmbeddingError::NodeCountMismatch {
            coordinates: coordinates.len(),
            edges: edges.node_count(),
        });
    }
    let total = params.batches_for(edges.node_count()) as u64;
    let shared = SharedCoordinates::new(coordinates);

    let stats = match params.force_law() {
        ForceLawKind::Exponential => run_with(ExponentialLaw, &shared, edges, params, progress, total),
        ForceLawKind::AlphaOne => run_with(AlphaOneLaw, &shared, edges, params, progress, total),
        ForceLawKind::Alpha(alpha) => {
            run_with(AlphaLaw { alpha }, &shared, edges, params, progress, total)
        }
    }?;

    telemetry::record_batches_completed(stats.completed);
    telemetry::record_negative_rejections(stats.rejections);
    let status = if stats.cancelled {
        warn!(
            completed = stats.completed,
            requested = total,
            "embedding cancelled by progress callback"
        );
        RunStatus::Cancelled
    } else {
        info!(
            completed = stats.completed,
            rejections = stats.rejections,
            "embedding completed"
        );
        RunStatus::Completed
    };

    Ok(EmbeddingOutput {
        coordinates: shared.into_coordinates(),
        status,
        batches_completed: stats.completed,
        negative_rejections: stats.rejections,
    })
}

fn run_with<L: ForceLaw, P: Progress + ?Sized>(
    law: L,
    shared: &SharedCoordinates,
    edges: &EdgeList,
    params: &EmbeddingParams,
    progress: &P,
    total: u64,
) -> Result<SgdStats, EmbeddingError> {
    let run = SgdRun::new(edges, law, shared, params, progress, total)?;
    Ok(run.run(params.parallel))
}
