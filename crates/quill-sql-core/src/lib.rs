//! # quill-sql-core
//!
//! The pure, dependency-free core of the quill query builder:
//!
//! - [`SqlValue`] and the [`ToSqlValue`] conversion trait
//! - [`Predicate`], an owned boolean expression tree rendered to
//!   parameterized SQL
//! - the `table.column__operator` filter DSL: [`FilterKey`], [`FilterOp`]
//!   and [`compile_filters`]
//! - [`TableMeta`] table metadata used for alias and column resolution
//! - [`Aggregate`] projections and the compiled [`Statement`] type
//!
//! Everything here is synchronous and deterministic; execution lives in the
//! `quill-query` crate.
//!
//! ## Filter DSL
//!
//! ```rust
//! use quill_sql_core::{compile_filters, Combinator, FilterValue, TableMeta};
//!
//! let users = TableMeta::new("users", &["id", "name", "active"], "id");
//! let pred = compile_filters(
//!     &[
//!         ("users.active", FilterValue::from(true)),
//!         ("users.name__like", FilterValue::from("ali")),
//!     ],
//!     Combinator::And,
//!     &[&users],
//! )
//! .unwrap()
//! .unwrap();
//!
//! let (sql, params) = pred.to_sql();
//! assert_eq!(sql, "(users.active = ?) AND (users.name LIKE ?)");
//! assert_eq!(params.len(), 2);
//! ```

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod predicate;
pub mod schema;
pub mod statement;
pub mod value;

pub use aggregate::Aggregate;
pub use error::{BuildError, Result};
pub use filter::{compile_filters, FilterKey, FilterOp, FilterValue};
pub use predicate::{Combinator, Predicate};
pub use schema::{Table, TableMeta};
pub use statement::Statement;
pub use value::{SqlValue, ToSqlValue};
