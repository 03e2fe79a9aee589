//! Sparse weighted graphs in compressed sparse column (CSC) layout.
//!
//! Both engines consume graphs in this form. The clustering engine reads the
//! values as distances; the embedding engine reads them as affinities. Entry
//! `(row, column)` is stored in column `column`, and rows within a column are
//! kept strictly increasing so lookups and neighbour scans are deterministic.

use crate::error::GraphError;

/// An `N x N` sparse matrix of non-negative, finite weights.
///
/// # Examples
/// ```
/// use largevis_core::SparseGraph;
///
/// let graph = SparseGraph::from_triplets(3, [(0, 1, 1.0), (1, 0, 1.0), (2, 1, 0.5)])?;
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.entry_count(), 3);
/// assert_eq!(graph.column(1).collect::<Vec<_>>(), vec![(0, 1.0), (2, 0.5)]);
/// # Ok::<(), largevis_core::GraphError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SparseGraph {
    node_count: usize,
    col_ptrs: Vec<usize>,
    row_indices: Vec<usize>,
    values: Vec<f32>,
}

impl SparseGraph {
    /// Builds a graph from raw CSC arrays.
    ///
    /// `col_ptrs` must hold `node_count + 1` non-decreasing offsets starting at
    /// zero and ending at `row_indices.len()`.
    ///
    /// # Errors
    /// Returns [`GraphError`] when the arrays are inconsistent, reference nodes
    /// outside the graph, contain unsorted rows, or carry negative or
    /// non-finite weights.
    pub fn from_csc(
        node_count: usize,
        col_ptrs: Vec<usize>,
        row_indices: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<Self, GraphError> {
        if node_count == 0 {
            return Err(GraphError::EmptyGraph);
        }
        if col_ptrs.len() != node_count + 1 {
            return Err(GraphError::ColumnPointerLength {
                expected: node_count + 1,
                got: col_ptrs.len(),
            });
        }
        if row_indices.len() != values.len() {
            return Err(GraphError::ValueLengthMismatch {
                indices: row_indices.len(),
                values: values.len(),
            });
        }
        if col_ptrs[0] != 0 {
            return Err(GraphError::MalformedColumnPointers { column: 0 });
        }
        if col_ptrs[node_count] != row_indices.len() {
            return Err(GraphError::MalformedColumnPointers { column: node_count });
        }
        // Offsets must be monotone before any of them is used as an index.
        if let Some(column) = col_ptrs.windows(2).position(|w| w[0] > w[1]) {
            return Err(GraphError::MalformedColumnPointers { column });
        }
        for (column, window) in col_ptrs.windows(2).enumerate() {
            let mut previous: Option<usize> = None;
            for entry in window[0]..window[1] {
                let row = row_indices[entry];
                if row >= node_count {
                    return Err(GraphError::NodeOutOfBounds {
                        node: row,
                        node_count,
                    });
                }
                if previous.is_some_and(|prev| prev >= row) {
                    return Err(GraphError::UnsortedRows { column, row });
                }
                previous = Some(row);
                let weight = values[entry];
                if !weight.is_finite() || weight < 0.0 {
                    return Err(GraphError::InvalidWeight {
                        row,
                        column,
                        weight,
                    });
                }
            }
        }
        Ok(Self {
            node_count,
            col_ptrs,
            row_indices,
            values,
        })
    }

    /// Builds a graph from `(row, column, weight)` triplets in any order.
    ///
    /// # Errors
    /// Returns [`GraphError::UnsortedRows`] when the same `(row, column)` pair
    /// appears twice, and the validation errors of [`Self::from_csc`]
    /// otherwise.
    pub fn from_triplets(
        node_count: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f32)>,
    ) -> Result<Self, GraphError> {
        if node_count == 0 {
            return Err(GraphError::EmptyGraph);
        }
        let mut entries: Vec<(usize, usize, f32)> = triplets.into_iter().collect();
        for &(row, column, _) in &entries {
            let node = row.max(column);
            if node >= node_count {
                return Err(GraphError::NodeOutOfBounds { node, node_count });
            }
        }
        entries.sort_by_key(|&(row, column, _)| (column, row));

        let mut col_ptrs = vec![0_usize; node_count + 1];
        for &(_, column, _) in &entries {
            col_ptrs[column + 1] += 1;
        }
        for column in 0..node_count {
            col_ptrs[column + 1] += col_ptrs[column];
        }
        let (row_indices, values) = entries.into_iter().map(|(row, _, w)| (row, w)).unzip();
        Self::from_csc(node_count, col_ptrs, row_indices, values)
    }

    /// Builds a symmetric graph, storing every undirected edge in both
    /// directions.
    ///
    /// # Errors
    /// Propagates the validation errors of [`Self::from_triplets`].
    pub fn from_undirected_edges(
        node_count: usize,
        edges: &[(usize, usize, f32)],
    ) -> Result<Self, GraphError> {
        let triplets = edges.iter().flat_map(|&(left, right, weight)| {
            let mirrored = (left != right).then_some((right, left, weight));
            std::iter::once((left, right, weight)).chain(mirrored)
        });
        Self::from_triplets(node_count, triplets)
    }

    /// Number of nodes (rows and columns).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.values.len()
    }

    /// Column offsets into [`Self::row_indices`] and [`Self::values`].
    #[must_use]
    pub fn col_ptrs(&self) -> &[usize] {
        &self.col_ptrs
    }

    /// Row index of every stored entry, column-major.
    #[must_use]
    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    /// Weight of every stored entry, column-major.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Iterates `(row, weight)` pairs stored in `column`, rows ascending.
    ///
    /// # Panics
    /// Panics when `column >= node_count`.
    pub fn column(&self, column: usize) -> impl ExactSizeIterator<Item = (usize, f32)> + '_ {
        let range = self.col_ptrs[column]..self.col_ptrs[column + 1];
        self.row_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Iterates every entry as `(row, column, weight)` in column-major order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        (0..self.node_count).flat_map(move |column| {
            self.column(column)
                .map(move |(row, weight)| (row, column, weight))
        })
    }

    /// Returns the transpose, whose column `i` lists the entries of row `i`.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let n = self.node_count;
        let mut col_ptrs = vec![0_usize; n + 1];
        for &row in &self.row_indices {
            col_ptrs[row + 1] += 1;
        }
        for column in 0..n {
            col_ptrs[column + 1] += col_ptrs[column];
        }
        let mut cursor = col_ptrs.clone();
        let mut row_indices = vec![0_usize; self.row_indices.len()];
        let mut values = vec![0.0_f32; self.values.len()];
        // Visiting source columns in order keeps the new rows sorted.
        for (row, column, weight) in self.entries() {
            let slot = cursor[row];
            row_indices[slot] = column;
            values[slot] = weight;
            cursor[row] += 1;
        }
        Self {
            node_count: n,
            col_ptrs,
            row_indices,
            values,
        }
    }

    /// Returns a graph with the same sparsity pattern and new values.
    ///
    /// The caller guarantees `values` matches [`Self::entry_count`] and holds
    /// valid weights.
    pub(crate) fn with_values(&self, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            node_count: self.node_count,
            col_ptrs: self.col_ptrs.clone(),
            row_indices: self.row_indices.clone(),
            values,
        }
    }
}
