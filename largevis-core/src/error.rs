//! Error plumbing shared by the engines.
//!
//! Every error enum in the crate carries a stable machine-readable code. The
//! [`define_error_codes!`] macro generates the code enum, its `as_str`
//! rendering and the `code()` accessor on the error type from one table.

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl ::std::fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// An error produced while validating a [`crate::SparseGraph`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphError {
    /// A graph must contain at least one node.
    #[error("graph must contain at least one node")]
    EmptyGraph,
    /// The column pointer array did not have `node_count + 1` entries.
    #[error("expected {expected} column pointers but got {got}")]
    ColumnPointerLength {
        /// Required length (`node_count + 1`).
        expected: usize,
        /// Length supplied by the caller.
        got: usize,
    },
    /// Column pointers must start at zero, never decrease, and end at the
    /// number of stored entries.
    #[error("column pointers are malformed at column {column}")]
    MalformedColumnPointers {
        /// First column whose pointer range is invalid.
        column: usize,
    },
    /// Row indices and values had different lengths.
    #[error("{indices} row indices but {values} values")]
    ValueLengthMismatch {
        /// Number of row indices supplied.
        indices: usize,
        /// Number of values supplied.
        values: usize,
    },
    /// An entry referenced a node outside `0..node_count`.
    #[error("entry references node {node}, but node_count is {node_count}")]
    NodeOutOfBounds {
        /// Offending node id.
        node: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },
    /// Row indices within a column must be strictly increasing.
    #[error("row indices in column {column} are unsorted or duplicated at row {row}")]
    UnsortedRows {
        /// Column containing the offending entry.
        column: usize,
        /// Row index that broke the ordering.
        row: usize,
    },
    /// Weights must be finite and non-negative.
    #[error("entry ({row}, {column}) has invalid weight {weight}")]
    InvalidWeight {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        column: usize,
        /// The rejected weight.
        weight: f32,
    },
}

define_error_codes! {
    /// Stable codes describing [`GraphError`] variants.
    enum GraphErrorCode for GraphError {
        /// A graph must contain at least one node.
        EmptyGraph => EmptyGraph => "GRAPH_EMPTY",
        /// The column pointer array had the wrong length.
        ColumnPointerLength => ColumnPointerLength { .. } => "GRAPH_COLUMN_POINTER_LENGTH",
        /// Column pointers were malformed.
        MalformedColumnPointers => MalformedColumnPointers { .. } => "GRAPH_MALFORMED_COLUMN_POINTERS",
        /// Row indices and values had different lengths.
        ValueLengthMismatch => ValueLengthMismatch { .. } => "GRAPH_VALUE_LENGTH_MISMATCH",
        /// An entry referenced a node outside the graph.
        NodeOutOfBounds => NodeOutOfBounds { .. } => "GRAPH_NODE_OUT_OF_BOUNDS",
        /// Row indices within a column were not strictly increasing.
        UnsortedRows => UnsortedRows { .. } => "GRAPH_UNSORTED_ROWS",
        /// A weight was negative or non-finite.
        InvalidWeight => InvalidWeight { .. } => "GRAPH_INVALID_WEIGHT",
    }
}
