//! Error types for filter parsing and statement compilation.

use std::fmt;

/// Errors raised while parsing filter keys or compiling a statement.
///
/// All of these are synchronous, build-time failures: either the filter
/// mapping is wrong (fixable by the caller) or the accumulated builder state
/// is structurally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A filter key is not of the form `table.column` or
    /// `table.column__operator`.
    MalformedFilterKey {
        /// The offending key, verbatim.
        key: String,
    },
    /// A filter key referenced a table that is neither the primary table
    /// nor one of the joined tables.
    UnknownTable {
        /// The table alias from the filter key.
        table: String,
        /// Tables that were known at the time of the call.
        available: Vec<String>,
    },
    /// A filter key referenced a column the resolved table does not declare.
    UnknownColumn {
        /// The table the column was looked up in.
        table: String,
        /// The missing column.
        column: String,
    },
    /// The operator suffix of a filter key is not in the registry.
    UnknownOperator {
        /// The unrecognized operator name.
        operator: String,
    },
    /// A filter value has the wrong shape for its operator.
    InvalidOperatorValue {
        /// The operator that rejected the value.
        operator: String,
        /// What the operator expected.
        message: String,
    },
    /// A qualified column reference could not be resolved against the
    /// primary table or any declared join at compile time.
    UnresolvedColumnReference {
        /// The unresolved `table.column` reference.
        column: String,
    },
    /// Unioned statements have differing projection arity.
    UnionArityMismatch {
        /// Arity of the first (outer) statement.
        expected: usize,
        /// Arity of the mismatching union part.
        found: usize,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedFilterKey { key } => {
                write!(
                    f,
                    "malformed filter key '{key}': expected 'table.column' or 'table.column__operator'"
                )
            }
            Self::UnknownTable { table, available } => {
                write!(
                    f,
                    "unknown table '{table}' in filter; known tables: {}",
                    available.join(", ")
                )
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "column '{column}' not found in table '{table}'")
            }
            Self::UnknownOperator { operator } => {
                write!(f, "unsupported filter operator '{operator}'")
            }
            Self::InvalidOperatorValue { operator, message } => {
                write!(f, "invalid value for operator '{operator}': {message}")
            }
            Self::UnresolvedColumnReference { column } => {
                write!(f, "column reference '{column}' does not resolve to any known table")
            }
            Self::UnionArityMismatch { expected, found } => {
                write!(
                    f,
                    "union parts select a different number of columns: expected {expected}, found {found}"
                )
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
