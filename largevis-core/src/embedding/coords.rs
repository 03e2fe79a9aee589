//! Embedding coordinates and their lock-free shared form.
//!
//! During optimisation every worker reads and writes the coordinate matrix
//! without synchronisation. Each component is an `f32` stored as bits in an
//! `AtomicU32` and accessed with relaxed ordering: individual components never
//! tear, but a row may be observed mid-update by another worker. That bounded
//! staleness is part of the algorithm, so parallel runs are reproducible only
//! statistically.

use std::sync::atomic::{AtomicU32, Ordering};

use super::EmbeddingError;

/// Largest supported embedding dimensionality.
pub const MAX_DIMENSIONS: usize = 10;

/// A dense row-major `N x D` coordinate matrix.
///
/// # Examples
/// ```
/// use largevis_core::embedding::Coordinates;
///
/// let coords = Coordinates::new(vec![0.0, 1.0, 2.0, 3.0], 2)?;
/// assert_eq!(coords.len(), 2);
/// assert_eq!(coords.row(1), &[2.0, 3.0]);
/// # Ok::<(), largevis_core::embedding::EmbeddingError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Coordinates {
    values: Vec<f32>,
    dimensions: usize,
}

impl Coordinates {
    /// Wraps row-major `values` with `dimensions` columns.
    ///
    /// # Errors
    /// Returns [`EmbeddingError::InvalidDimensions`] unless
    /// `1 <= dimensions <= MAX_DIMENSIONS`,
    /// [`EmbeddingError::RaggedCoordinates`] when `values` does not divide
    /// into whole rows, and [`EmbeddingError::NonFiniteCoordinate`] for NaN or
    /// infinite input.
    pub fn new(values: Vec<f32>, dimensions: usize) -> Result<Self, EmbeddingError> {
        if dimensions == 0 || dimensions > MAX_DIMENSIONS {
            return Err(EmbeddingError::InvalidDimensions {
                got: dimensions,
                max: MAX_DIMENSIONS,
            });
        }
        if values.len() % dimensions != 0 {
            return Err(EmbeddingError::RaggedCoordinates {
                len: values.len(),
                dimensions,
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFiniteCoordinate {
                node: index / dimensions,
            });
        }
        Ok(Self { values, dimensions })
    }

    /// Number of rows (nodes).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len() / self.dimensions
    }

    /// Returns `true` when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of columns.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Coordinates of `node`.
    ///
    /// # Panics
    /// Panics when `node >= self.len()`.
    #[must_use]
    pub fn row(&self, node: usize) -> &[f32] {
        &self.values[node * self.dimensions..(node + 1) * self.dimensions]
    }

    /// Row-major view of all coordinates.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Consumes the matrix, returning its row-major values.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    /// Squared Euclidean distance between two rows.
    #[must_use]
    pub fn distance_squared(&self, a: usize, b: usize) -> f32 {
        self.row(a)
            .iter()
            .zip(self.row(b))
            .map(|(x, y)| (x - y) * (x - y))
            .sum()
    }
}

/// Coordinates shared by all SGD workers.
pub(crate) struct SharedCoordinates {
    cells: Vec<AtomicU32>,
    dimensions: usize,
}

impl SharedCoordinates {
    pub(crate) fn new(coords: Coordinates) -> Self {
        Self {
            cells: coords
                .values
                .into_iter()
                .map(|v| AtomicU32::new(v.to_bits()))
                .collect(),
            dimensions: coords.dimensions,
        }
    }

    pub(crate) fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Copies the current row of `node` into `out`.
    pub(crate) fn load(&self, node: usize, out: &mut [f32]) {
        let start = node * self.dimensions;
        for (slot, cell) in out.iter_mut().zip(&self.cells[start..start + self.dimensions]) {
            *slot = f32::from_bits(cell.load(Ordering::Relaxed));
        }
    }

    /// Adds `scale * delta` to the row of `node`.
    ///
    /// Each component is a separate load and store; concurrent updates to
    /// the same component may be lost.
    pub(crate) fn add_scaled(&self, node: usize, delta: &[f32], scale: f32) {
        let start = node * self.dimensions;
        for (cell, &d) in self.cells[start..start + self.dimensions].iter().zip(delta) {
            let current = f32::from_bits(cell.load(Ordering::Relaxed));
            cell.store((current + scale * d).to_bits(), Ordering::Relaxed);
        }
    }

    pub(crate) fn into_coordinates(self) -> Coordinates {
        Coordinates {
            values: self
                .cells
                .into_iter()
                .map(|cell| f32::from_bits(cell.into_inner()))
                .collect(),
            dimensions: self.dimensions,
        }
    }
}
