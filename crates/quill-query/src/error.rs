//! Error types for the query layer.

use thiserror::Error;

/// Errors raised while building, compiling or executing a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Filter parsing or statement compilation failed.
    #[error(transparent)]
    Build(#[from] quill_sql_core::BuildError),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No record found where one was required.
    #[error("record not found")]
    NotFound,

    /// `paginate` called with a page or page size below 1.
    #[error("invalid pagination parameters: page={page}, per_page={per_page}")]
    InvalidPagination {
        /// Requested page (1-based).
        page: u64,
        /// Requested page size.
        per_page: u64,
    },

    /// UPDATE or DELETE attempted without any accumulated predicate.
    #[error("{0} requires a WHERE clause; add a where/filter call first")]
    MissingWhereClause(&'static str),

    /// Schema override name is not a plain identifier.
    #[error("invalid schema name: {0}")]
    InvalidSchemaName(String),

    /// Input validation error (empty insert data, ragged rows, ...).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
