//! The fluent clause accumulator.
//!
//! A [`TableQuery`] is created per logical query, extended by chain calls,
//! and consumed exactly once by a terminal operation. Chain calls are plain
//! state mutation; nothing touches the database until the terminal call.

use quill_sql_core::{compile_filters, Combinator, FilterValue, Predicate, Table, TableMeta};

use crate::error::{QueryError, Result};

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
    /// FULL OUTER JOIN
    Full,
}

impl JoinKind {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL OUTER JOIN",
        }
    }
}

/// One declared join.
#[derive(Debug, Clone)]
pub(crate) struct Join {
    pub(crate) table: TableMeta,
    pub(crate) kind: JoinKind,
    pub(crate) on: Predicate,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl Direction {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Set-operation mode for combined queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionMode {
    /// UNION (deduplicating)
    Union,
    /// UNION ALL
    UnionAll,
}

impl UnionMode {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::Union => " UNION ",
            Self::UnionAll => " UNION ALL ",
        }
    }
}

/// A deferred nested-builder producer, invoked exactly once at compile
/// time.
pub(crate) type Producer = Box<dyn FnOnce() -> TableQuery + Send>;

/// A predicate that may still contain an unbuilt subquery.
pub(crate) enum PendingPredicate {
    Ready(Predicate),
    InSubquery { column: String, producer: Producer },
    Exists { producer: Producer, negated: bool },
}

impl std::fmt::Debug for PendingPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(predicate) => f.debug_tuple("Ready").field(predicate).finish(),
            Self::InSubquery { column, .. } => f
                .debug_struct("InSubquery")
                .field("column", column)
                .finish_non_exhaustive(),
            Self::Exists { negated, .. } => f
                .debug_struct("Exists")
                .field("negated", negated)
                .finish_non_exhaustive(),
        }
    }
}

/// A fluent, chainable query builder bound to a primary table.
///
/// Chain methods return the builder for further chaining; methods that
/// validate input (`apply_filters`, `schema`, `from_subquery`) return
/// `Result<Self>` and fail fast. A builder is consumed by its terminal
/// operation; start a new chain for the next query.
///
/// # Example
///
/// ```ignore
/// let page = TableQuery::new(users_meta())
///     .left_join(posts_meta(), Predicate::col_eq("users.id", "posts.user_id"))
///     .apply_filters(&[
///         ("users.active", FilterValue::from(true)),
///         ("posts.published", FilterValue::from(true)),
///     ])?
///     .order_by("-users.id")
///     .paginate(&pool, 1, 20)
///     .await?;
/// ```
///
/// Filters are validated against the tables known *at the time of the
/// call*: declare joins before the filters that reference them.
#[derive(Debug)]
pub struct TableQuery {
    pub(crate) primary: TableMeta,
    pub(crate) derived_from: Option<quill_sql_core::Statement>,
    pub(crate) schema: Option<String>,
    pub(crate) joins: Vec<Join>,
    pub(crate) predicates: Vec<(PendingPredicate, Combinator)>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having: Vec<(Predicate, Combinator)>,
    pub(crate) order_by: Vec<(String, Direction)>,
    pub(crate) projection: Vec<String>,
    pub(crate) distinct: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) unions: Vec<(TableQuery, UnionMode)>,
}

impl TableQuery {
    /// Creates a builder anchored to the given table.
    #[must_use]
    pub fn new(primary: TableMeta) -> Self {
        Self {
            primary,
            derived_from: None,
            schema: None,
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            projection: Vec::new(),
            distinct: Vec::new(),
            limit: None,
            offset: None,
            unions: Vec::new(),
        }
    }

    /// Creates a builder anchored to a statically declared table.
    #[must_use]
    pub fn of<T: Table>() -> Self {
        Self::new(TableMeta::of::<T>())
    }

    /// The tables a filter key may currently reference.
    pub(crate) fn known_tables(&self) -> Vec<&TableMeta> {
        let mut tables = Vec::with_capacity(1 + self.joins.len());
        tables.push(&self.primary);
        tables.extend(self.joins.iter().map(|j| &j.table));
        tables
    }

    /// Sets a per-chain schema override; table names in the compiled
    /// statement are qualified with it.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidSchemaName`] unless the name is a plain
    /// identifier.
    pub fn schema(mut self, name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(QueryError::InvalidSchemaName(name.to_string()));
        }
        self.schema = Some(name.to_string());
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Joins
    // ------------------------------------------------------------------

    fn push_join(mut self, table: TableMeta, kind: JoinKind, on: Predicate) -> Self {
        // Duplicate joins are retained as declared; nothing is deduplicated.
        self.joins.push(Join { table, kind, on });
        self
    }

    /// Adds an INNER JOIN.
    #[must_use]
    pub fn join(self, table: TableMeta, on: Predicate) -> Self {
        self.push_join(table, JoinKind::Inner, on)
    }

    /// Adds a LEFT JOIN.
    #[must_use]
    pub fn left_join(self, table: TableMeta, on: Predicate) -> Self {
        self.push_join(table, JoinKind::Left, on)
    }

    /// Adds a RIGHT JOIN.
    #[must_use]
    pub fn right_join(self, table: TableMeta, on: Predicate) -> Self {
        self.push_join(table, JoinKind::Right, on)
    }

    /// Adds a FULL OUTER JOIN.
    #[must_use]
    pub fn full_join(self, table: TableMeta, on: Predicate) -> Self {
        self.push_join(table, JoinKind::Full, on)
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    fn push_predicate(mut self, predicate: Predicate, combinator: Combinator) -> Self {
        self.predicates
            .push((PendingPredicate::Ready(predicate), combinator));
        self
    }

    /// Attaches a predicate with AND.
    #[must_use]
    pub fn where_clause(self, predicate: Predicate) -> Self {
        self.push_predicate(predicate, Combinator::And)
    }

    /// Attaches a predicate with OR against the running expression.
    #[must_use]
    pub fn or_where(self, predicate: Predicate) -> Self {
        self.push_predicate(predicate, Combinator::Or)
    }

    /// `column IN (values)`, attached with AND.
    #[must_use]
    pub fn where_in<V: quill_sql_core::ToSqlValue>(self, column: &str, values: Vec<V>) -> Self {
        self.where_clause(Predicate::in_list(column, values))
    }

    /// `column NOT IN (values)`, attached with AND.
    #[must_use]
    pub fn where_not_in<V: quill_sql_core::ToSqlValue>(self, column: &str, values: Vec<V>) -> Self {
        self.where_clause(Predicate::not_in_list(column, values))
    }

    /// `column IS NULL`, attached with AND.
    #[must_use]
    pub fn where_null(self, column: &str) -> Self {
        self.where_clause(Predicate::is_null(column))
    }

    /// `column IS NOT NULL`, attached with AND.
    #[must_use]
    pub fn where_not_null(self, column: &str) -> Self {
        self.where_clause(Predicate::is_not_null(column))
    }

    /// `column BETWEEN low AND high`, attached with AND.
    #[must_use]
    pub fn where_between<V, W>(self, column: &str, low: V, high: W) -> Self
    where
        V: quill_sql_core::ToSqlValue,
        W: quill_sql_core::ToSqlValue,
    {
        self.where_clause(Predicate::between(column, low, high))
    }

    /// `column NOT BETWEEN low AND high`, attached with AND.
    #[must_use]
    pub fn where_not_between<V, W>(self, column: &str, low: V, high: W) -> Self
    where
        V: quill_sql_core::ToSqlValue,
        W: quill_sql_core::ToSqlValue,
    {
        self.where_clause(Predicate::not_between(column, low, high))
    }

    /// Substring match: `column LIKE %pattern%`, attached with AND.
    #[must_use]
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.where_clause(Predicate::contains(column, pattern))
    }

    /// Applies one group of `table.column__operator` filters, folded with
    /// AND and attached with AND.
    ///
    /// Keys are resolved against the tables known at this point in the
    /// chain; declare joins first.
    ///
    /// # Errors
    ///
    /// Fails fast with the first filter error; the builder is dropped.
    pub fn apply_filters(self, entries: &[(&str, FilterValue)]) -> Result<Self> {
        self.apply_filter_group(entries, Combinator::And)
    }

    /// Like [`apply_filters`](Self::apply_filters), but the group is folded
    /// with OR and attached with OR.
    pub fn apply_filters_or(self, entries: &[(&str, FilterValue)]) -> Result<Self> {
        self.apply_filter_group(entries, Combinator::Or)
    }

    fn apply_filter_group(
        self,
        entries: &[(&str, FilterValue)],
        combinator: Combinator,
    ) -> Result<Self> {
        let compiled = compile_filters(entries, combinator, &self.known_tables())?;
        Ok(match compiled {
            Some(predicate) => self.push_predicate(predicate, combinator),
            None => self,
        })
    }

    // ------------------------------------------------------------------
    // Subqueries
    // ------------------------------------------------------------------

    /// `column IN (subquery)`, attached with AND. The producer is invoked
    /// exactly once, when the outer query is compiled.
    #[must_use]
    pub fn where_in_subquery<F>(mut self, column: &str, producer: F) -> Self
    where
        F: FnOnce() -> TableQuery + Send + 'static,
    {
        self.predicates.push((
            PendingPredicate::InSubquery {
                column: column.to_string(),
                producer: Box::new(producer),
            },
            Combinator::And,
        ));
        self
    }

    /// `EXISTS (subquery)`, attached with AND.
    #[must_use]
    pub fn where_exists_subquery<F>(mut self, producer: F) -> Self
    where
        F: FnOnce() -> TableQuery + Send + 'static,
    {
        self.predicates.push((
            PendingPredicate::Exists {
                producer: Box::new(producer),
                negated: false,
            },
            Combinator::And,
        ));
        self
    }

    /// `NOT EXISTS (subquery)`, attached with AND.
    #[must_use]
    pub fn where_not_exists_subquery<F>(mut self, producer: F) -> Self
    where
        F: FnOnce() -> TableQuery + Send + 'static,
    {
        self.predicates.push((
            PendingPredicate::Exists {
                producer: Box::new(producer),
                negated: true,
            },
            Combinator::And,
        ));
        self
    }

    /// Replaces the primary source with a derived table built from the
    /// nested builder.
    ///
    /// The nested query is compiled eagerly — its output columns become the
    /// column set the alias is known under, so later filters can be
    /// validated against it. Joins, predicates and the projection collected
    /// so far are cleared; they applied to the replaced source.
    ///
    /// # Errors
    ///
    /// Propagates compilation errors from the nested builder.
    pub fn from_subquery<F>(mut self, alias: &str, producer: F) -> Result<Self>
    where
        F: FnOnce() -> TableQuery,
    {
        let resolved = producer().resolve()?;
        let columns = resolved.output_columns();
        let statement = resolved.select_statement();

        self.primary = TableMeta::derived(alias, &columns);
        self.derived_from = Some(statement);
        self.joins.clear();
        self.predicates.clear();
        self.projection.clear();
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Grouping and aggregates
    // ------------------------------------------------------------------

    /// Appends GROUP BY columns.
    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by
            .extend(columns.iter().map(|c| (*c).to_string()));
        self
    }

    /// Attaches a HAVING predicate with AND. HAVING without GROUP BY is
    /// passed through to the engine, not rejected here.
    #[must_use]
    pub fn having(mut self, predicate: Predicate) -> Self {
        self.having.push((predicate, Combinator::And));
        self
    }

    /// Attaches a HAVING predicate with OR.
    #[must_use]
    pub fn or_having(mut self, predicate: Predicate) -> Self {
        self.having.push((predicate, Combinator::Or));
        self
    }

    // ------------------------------------------------------------------
    // Shaping
    // ------------------------------------------------------------------

    /// Appends projection expressions (columns or aggregate expressions).
    /// An empty projection selects all primary-table columns.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.projection
            .extend(columns.iter().map(|c| (*c).to_string()));
        self
    }

    /// Restricts the loaded columns; alias for appending to the
    /// projection.
    #[must_use]
    pub fn load_only(self, columns: &[&str]) -> Self {
        self.select(columns)
    }

    /// Appends an ordering term. Prefix with `-` for descending order:
    /// `order_by("-created_at")`.
    #[must_use]
    pub fn order_by(mut self, spec: &str) -> Self {
        let term = match spec.strip_prefix('-') {
            Some(column) => (column.to_string(), Direction::Desc),
            None => (spec.to_string(), Direction::Asc),
        };
        self.order_by.push(term);
        self
    }

    /// Appends a descending ordering term.
    #[must_use]
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), Direction::Desc));
        self
    }

    /// Sets LIMIT; last write wins.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets OFFSET; last write wins.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Alias for [`limit`](Self::limit).
    #[must_use]
    pub const fn take(self, n: u64) -> Self {
        self.limit(n)
    }

    /// Alias for [`offset`](Self::offset).
    #[must_use]
    pub const fn skip(self, n: u64) -> Self {
        self.offset(n)
    }

    /// Selects DISTINCT over the given columns; they replace the
    /// projection.
    #[must_use]
    pub fn distinct_by(mut self, columns: &[&str]) -> Self {
        self.distinct
            .extend(columns.iter().map(|c| (*c).to_string()));
        self
    }

    // ------------------------------------------------------------------
    // Unions
    // ------------------------------------------------------------------

    /// Appends a UNION part; parts compose left-to-right in call order.
    /// All parts must project the same number of columns.
    #[must_use]
    pub fn union(mut self, other: TableQuery) -> Self {
        self.unions.push((other, UnionMode::Union));
        self
    }

    /// Appends a UNION ALL part.
    #[must_use]
    pub fn union_all(mut self, other: TableQuery) -> Self {
        self.unions.push((other, UnionMode::UnionAll));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_sql_core::BuildError;

    fn users() -> TableMeta {
        TableMeta::new("users", &["id", "name", "age", "active"], "id")
    }

    fn posts() -> TableMeta {
        TableMeta::new("posts", &["id", "user_id", "title", "published"], "id")
    }

    #[test]
    fn filters_see_tables_known_at_call_time() {
        let entries = [("posts.published", FilterValue::from(true))];

        // Before the join the table is unknown.
        let err = TableQuery::new(users()).apply_filters(&entries).unwrap_err();
        assert!(matches!(
            err,
            crate::QueryError::Build(BuildError::UnknownTable { ref table, .. })
                if table.as_str() == "posts"
        ));

        // After the identical join the identical call succeeds.
        let ok = TableQuery::new(users())
            .join(posts(), Predicate::col_eq("users.id", "posts.user_id"))
            .apply_filters(&entries);
        assert!(ok.is_ok());
    }

    #[test]
    fn empty_filter_group_adds_nothing() {
        let q = TableQuery::new(users()).apply_filters(&[]).unwrap();
        assert!(q.predicates.is_empty());
    }

    #[test]
    fn schema_name_is_validated() {
        assert!(TableQuery::new(users()).schema("tenant_a").is_ok());
        for bad in ["1tenant", "te nant", "t;drop", ""] {
            assert!(matches!(
                TableQuery::new(users()).schema(bad),
                Err(crate::QueryError::InvalidSchemaName(_))
            ));
        }
    }

    #[test]
    fn limit_and_offset_last_write_wins() {
        let q = TableQuery::new(users()).limit(5).take(10).offset(1).skip(3);
        assert_eq!(q.limit, Some(10));
        assert_eq!(q.offset, Some(3));
    }

    #[test]
    fn debug_formatting_elides_subquery_producers() {
        let q = TableQuery::new(users())
            .where_in_subquery("users.id", || TableQuery::new(posts()))
            .where_exists_subquery(|| TableQuery::new(posts()));
        let rendered = format!("{q:?}");
        assert!(rendered.contains("InSubquery { column: \"users.id\", .. }"));
        assert!(rendered.contains("Exists { negated: false, .. }"));
    }

    #[test]
    fn duplicate_joins_are_retained() {
        let q = TableQuery::new(users())
            .left_join(posts(), Predicate::col_eq("users.id", "posts.user_id"))
            .left_join(posts(), Predicate::col_eq("users.id", "posts.id"));
        assert_eq!(q.joins.len(), 2);
    }
}
