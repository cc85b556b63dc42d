//! The `table.column__operator` filter DSL.
//!
//! External callers (HTTP query-parameter mappers, config-driven searches)
//! describe predicates as string-keyed entries; [`compile_filters`] turns
//! one group of entries into a single [`Predicate`] against the tables
//! known to the enclosing query.

mod key;
mod op;

pub use key::FilterKey;
pub use op::{FilterOp, FilterValue};

use crate::error::{BuildError, Result};
use crate::predicate::{Combinator, Predicate};
use crate::schema::TableMeta;
use crate::value::SqlValue;

/// Compiles one group of filter entries into a predicate.
///
/// Entries are processed in the order given; every predicate in the group
/// is folded with the same `combinator`. Entries whose value is a `Null`
/// scalar are skipped entirely (absent optional HTTP parameters). The
/// result is `None` when every entry was skipped.
///
/// Resolution is fail-fast and strict:
/// - the key must parse ([`BuildError::MalformedFilterKey`]),
/// - its table part must match a known table's effective name,
///   case-sensitively ([`BuildError::UnknownTable`]),
/// - its column must be declared by that table
///   ([`BuildError::UnknownColumn`]),
/// - its operator must be registered ([`BuildError::UnknownOperator`]) and
///   accept the value ([`BuildError::InvalidOperatorValue`]).
///
/// The first failure aborts the whole group; no partial predicate is
/// produced.
pub fn compile_filters(
    entries: &[(&str, FilterValue)],
    combinator: Combinator,
    known_tables: &[&TableMeta],
) -> Result<Option<Predicate>> {
    let mut parts = Vec::with_capacity(entries.len());

    for (raw_key, value) in entries {
        if matches!(value, FilterValue::Scalar(SqlValue::Null)) {
            continue;
        }

        let key = FilterKey::parse(raw_key)?;

        let table = known_tables
            .iter()
            .find(|t| t.effective_name() == key.table)
            .ok_or_else(|| BuildError::UnknownTable {
                table: key.table.clone(),
                available: known_tables
                    .iter()
                    .map(|t| t.effective_name().to_string())
                    .collect(),
            })?;

        if !table.has_column(&key.column) {
            return Err(BuildError::UnknownColumn {
                table: key.table.clone(),
                column: key.column.clone(),
            });
        }

        let op = FilterOp::resolve(&key.operator)?;
        let predicate = op.build(&key.qualified_column(), value)?;
        parts.push((predicate, combinator));
    }

    Ok(Predicate::fold(parts))
}
