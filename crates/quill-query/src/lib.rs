//! # quill-query
//!
//! A fluent, chainable query builder and async execution facade over sqlx.
//!
//! This crate provides:
//! - [`TableQuery`] for accumulating joins, filters, grouping, ordering,
//!   windows and set operations
//! - a `table.column__operator` filter DSL via
//!   [`apply_filters`](TableQuery::apply_filters)
//! - async terminal operations (`all`, `first`, `find`, `paginate`,
//!   aggregates, `create`, `update`, `delete`) against a `SqlitePool`
//! - a serializable [`Page`] envelope for offset pagination
//!
//! ## Quick Start
//!
//! ```ignore
//! use quill_query::{FilterValue, Predicate, TableMeta, TableQuery};
//! use sqlx::SqlitePool;
//!
//! async fn example(pool: &SqlitePool) -> quill_query::Result<()> {
//!     let users = TableMeta::new("users", &["id", "name", "age", "active"], "id");
//!     let posts = TableMeta::new("posts", &["id", "user_id", "title"], "id");
//!
//!     let page = TableQuery::new(users)
//!         .left_join(posts, Predicate::col_eq("users.id", "posts.user_id"))
//!         .apply_filters(&[
//!             ("users.active", FilterValue::from(true)),
//!             ("users.age__gte", FilterValue::from(18)),
//!         ])?
//!         .order_by("-users.id")
//!         .paginate(pool, 1, 20)
//!         .await?;
//!
//!     for record in &page.items {
//!         println!("{record:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Builders are single-use: each chain ends in exactly one terminal call,
//! which compiles the accumulated state once and executes it. Nothing
//! touches the database before the terminal call.

pub mod builder;
pub mod error;
pub mod exec;
pub mod page;
pub mod resolved;

pub use builder::{Direction, JoinKind, TableQuery, UnionMode};
pub use error::{QueryError, Result};
pub use exec::Record;
pub use page::{Page, Pagination};
pub use resolved::ResolvedQuery;

// Core building blocks, re-exported for one-import ergonomics.
pub use quill_sql_core::{
    compile_filters, Aggregate, BuildError, Combinator, FilterKey, FilterOp, FilterValue,
    Predicate, SqlValue, Statement, Table, TableMeta, ToSqlValue,
};
