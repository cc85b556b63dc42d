//! Compilation of accumulated builder state into parameterized SQL.
//!
//! [`TableQuery::resolve`] runs once per builder: deferred subquery
//! producers are invoked, union parts are compiled and arity-checked, and
//! qualified column references are validated against the declared sources.
//! The resulting [`ResolvedQuery`] renders statements without further
//! side effects, so every renderer can be called repeatedly with identical
//! output.

use quill_sql_core::{Aggregate, BuildError, Predicate, SqlValue, Statement, TableMeta};

use crate::builder::{Direction, Join, PendingPredicate, TableQuery, UnionMode};
use crate::error::{QueryError, Result};

/// Compiled query state; produced by [`TableQuery::resolve`].
#[derive(Debug)]
pub struct ResolvedQuery {
    primary: TableMeta,
    derived_from: Option<Statement>,
    schema: Option<String>,
    joins: Vec<Join>,
    where_pred: Option<Predicate>,
    group_by: Vec<String>,
    having_pred: Option<Predicate>,
    order_by: Vec<(String, Direction)>,
    projection: Vec<String>,
    distinct: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    unions: Vec<(Statement, UnionMode)>,
}

impl TableQuery {
    /// Compiles the accumulated state.
    ///
    /// # Errors
    ///
    /// Fails on union arity mismatches, unresolved qualified column
    /// references, and any error raised while compiling nested builders.
    pub fn resolve(self) -> Result<ResolvedQuery> {
        let TableQuery {
            primary,
            derived_from,
            schema,
            joins,
            predicates,
            group_by,
            having,
            order_by,
            mut projection,
            distinct,
            limit,
            offset,
            unions,
        } = self;

        let mut parts = Vec::with_capacity(predicates.len());
        for (pending, combinator) in predicates {
            let predicate = match pending {
                PendingPredicate::Ready(p) => p,
                PendingPredicate::InSubquery { column, producer } => {
                    let statement = producer().resolve()?.select_statement();
                    Predicate::in_subquery(&column, statement)
                }
                PendingPredicate::Exists { producer, negated } => {
                    let statement = producer().resolve()?.select_statement();
                    if negated {
                        Predicate::not_exists(statement)
                    } else {
                        Predicate::exists(statement)
                    }
                }
            };
            parts.push((predicate, combinator));
        }
        let where_pred = Predicate::fold(parts);
        let having_pred = Predicate::fold(having);

        let is_distinct = !distinct.is_empty();
        if is_distinct {
            projection = distinct;
        } else if projection.is_empty() {
            projection = if joins.is_empty() {
                primary.columns().to_vec()
            } else {
                primary.qualified_columns()
            };
        }

        let arity = projection.len();
        let mut compiled_unions = Vec::with_capacity(unions.len());
        for (part, mode) in unions {
            let statement = part.resolve()?.select_statement();
            if statement.arity != arity {
                return Err(QueryError::Build(BuildError::UnionArityMismatch {
                    expected: arity,
                    found: statement.arity,
                }));
            }
            compiled_unions.push((statement, mode));
        }

        let resolved = ResolvedQuery {
            primary,
            derived_from,
            schema,
            joins,
            where_pred,
            group_by,
            having_pred,
            order_by,
            projection,
            distinct: is_distinct,
            limit,
            offset,
            unions: compiled_unions,
        };
        resolved.check_column_references()?;
        Ok(resolved)
    }
}

/// The table part of a plain `table.column` reference, if the string is
/// one. Expressions (anything with a call, space, or `*`) are left to the
/// engine.
fn qualifying_table(reference: &str) -> Option<&str> {
    if reference.contains('(') || reference.contains(' ') || reference.contains('*') {
        return None;
    }
    let (table, column) = reference.split_once('.')?;
    if table.is_empty() || column.is_empty() || column.contains('.') {
        return None;
    }
    Some(table)
}

impl ResolvedQuery {
    fn known_names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(1 + self.joins.len());
        names.push(self.primary.effective_name());
        names.extend(self.joins.iter().map(|j| j.table.effective_name()));
        names
    }

    fn check_column_references(&self) -> Result<()> {
        let known = self.known_names();
        let mut refs: Vec<&str> = Vec::new();
        if let Some(pred) = &self.where_pred {
            pred.collect_columns(&mut refs);
        }
        if let Some(pred) = &self.having_pred {
            pred.collect_columns(&mut refs);
        }
        for join in &self.joins {
            join.on.collect_columns(&mut refs);
        }
        refs.extend(self.projection.iter().map(String::as_str));
        refs.extend(self.group_by.iter().map(String::as_str));
        refs.extend(self.order_by.iter().map(|(c, _)| c.as_str()));

        for reference in refs {
            if let Some(table) = qualifying_table(reference) {
                if !known.contains(&table) {
                    return Err(QueryError::Build(BuildError::UnresolvedColumnReference {
                        column: reference.to_string(),
                    }));
                }
            }
        }
        Ok(())
    }

    /// Bare output column names, used as the column set of a derived
    /// table. `users.name` contributes `name`; aliased expressions
    /// contribute their alias.
    pub(crate) fn output_columns(&self) -> Vec<String> {
        self.projection
            .iter()
            .map(|expr| {
                let lowered = expr.to_ascii_lowercase();
                if let Some(pos) = lowered.rfind(" as ") {
                    return expr[pos + 4..].trim().to_string();
                }
                match expr.rsplit_once('.') {
                    Some((_, bare)) if qualifying_table(expr).is_some() => bare.to_string(),
                    _ => expr.clone(),
                }
            })
            .collect()
    }

    /// Primary key of the compiled primary source, if it has one.
    pub(crate) fn primary_key_reference(&self) -> Option<String> {
        let pk = self.primary.primary_key();
        if pk.is_empty() {
            None
        } else {
            Some(format!("{}.{pk}", self.primary.effective_name()))
        }
    }

    /// The schema-qualified write target, without alias.
    fn write_target(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.primary.name()),
            None => self.primary.name().to_string(),
        }
    }

    fn push_source(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        match &self.derived_from {
            Some(inner) => {
                sql.push('(');
                sql.push_str(&inner.sql);
                sql.push_str(") AS ");
                sql.push_str(self.primary.effective_name());
                params.extend(inner.params.iter().cloned());
            }
            None => sql.push_str(&self.primary.source_sql(self.schema.as_deref())),
        }
    }

    fn push_joins(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        for join in &self.joins {
            let (on_sql, on_params) = join.on.to_sql();
            sql.push(' ');
            sql.push_str(join.kind.sql());
            sql.push(' ');
            sql.push_str(&join.table.source_sql(self.schema.as_deref()));
            sql.push_str(" ON ");
            sql.push_str(&on_sql);
            params.extend(on_params);
        }
    }

    fn push_where(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        if let Some(pred) = &self.where_pred {
            let (pred_sql, pred_params) = pred.to_sql();
            sql.push_str(" WHERE ");
            sql.push_str(&pred_sql);
            params.extend(pred_params);
        }
    }

    /// Renders the SELECT statement, honoring the builder's own window.
    #[must_use]
    pub fn select_statement(&self) -> Statement {
        self.select_statement_with(self.limit, self.offset)
    }

    /// Renders the SELECT statement with an explicit window, overriding
    /// whatever the chain set. Used by pagination.
    pub(crate) fn select_statement_with(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Statement {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.projection.join(", "));
        sql.push_str(" FROM ");

        let mut params = Vec::new();
        self.push_source(&mut sql, &mut params);
        self.push_joins(&mut sql, &mut params);
        self.push_where(&mut sql, &mut params);

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if let Some(pred) = &self.having_pred {
            let (pred_sql, pred_params) = pred.to_sql();
            sql.push_str(" HAVING ");
            sql.push_str(&pred_sql);
            params.extend(pred_params);
        }

        // Union parts splice in before the trailing ORDER BY / LIMIT, which
        // then apply to the whole compound.
        for (part, mode) in &self.unions {
            sql.push_str(mode.sql());
            sql.push_str(&part.sql);
            params.extend(part.params.iter().cloned());
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{column} {}", direction.sql()))
                .collect();
            sql.push_str(&terms.join(", "));
        }
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        if let Some(n) = offset {
            sql.push_str(&format!(" OFFSET {n}"));
        }

        Statement::new(sql, params, self.projection.len())
    }

    /// Renders `SELECT COUNT(*)` over the same sources and predicates.
    /// Ordering and the window are irrelevant to a count and omitted.
    ///
    /// A grouped or compound chain would yield one count per group (or
    /// count only the first union part), so those are wrapped as a
    /// subquery and the wrapper counts its rows.
    #[must_use]
    pub fn count_statement(&self) -> Statement {
        if self.group_by.is_empty() && self.having_pred.is_none() && self.unions.is_empty() {
            return self.aggregate_sql(&Aggregate::count_all());
        }
        let inner = self.select_statement_with(None, None);
        Statement::new(
            format!("SELECT COUNT(*) FROM ({}) AS grouped_rows", inner.sql),
            inner.params,
            1,
        )
    }

    /// Renders a single-aggregate statement.
    ///
    /// # Errors
    ///
    /// Rejects aggregate columns that qualify an undeclared table.
    pub fn aggregate_statement(&self, aggregate: &Aggregate) -> Result<Statement> {
        if let Some(column) = aggregate.column() {
            if let Some(table) = qualifying_table(column) {
                if !self.known_names().contains(&table) {
                    return Err(QueryError::Build(BuildError::UnresolvedColumnReference {
                        column: column.to_string(),
                    }));
                }
            }
        }
        Ok(self.aggregate_sql(aggregate))
    }

    fn aggregate_sql(&self, aggregate: &Aggregate) -> Statement {
        let mut sql = format!("SELECT {} FROM ", aggregate.to_sql());
        let mut params = Vec::new();
        self.push_source(&mut sql, &mut params);
        self.push_joins(&mut sql, &mut params);
        self.push_where(&mut sql, &mut params);
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if let Some(pred) = &self.having_pred {
            let (pred_sql, pred_params) = pred.to_sql();
            sql.push_str(" HAVING ");
            sql.push_str(&pred_sql);
            params.extend(pred_params);
        }
        Statement::new(sql, params, 1)
    }

    /// Renders a multi-row INSERT returning the written rows.
    pub(crate) fn insert_statement(&self, columns: &[&str], rows: &[Vec<SqlValue>]) -> Statement {
        let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ",
            self.write_target(),
            columns.join(", "),
        );
        let mut params = Vec::with_capacity(columns.len() * rows.len());
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&placeholders);
            params.extend(row.iter().cloned());
        }
        sql.push_str(" RETURNING *");
        Statement::new(sql, params, self.primary.columns().len())
    }

    /// Renders an UPDATE returning the modified rows.
    ///
    /// # Errors
    ///
    /// Refuses to render without a WHERE clause.
    pub(crate) fn update_statement(&self, assignments: &[(String, SqlValue)]) -> Result<Statement> {
        let Some(pred) = &self.where_pred else {
            return Err(QueryError::MissingWhereClause("update"));
        };
        let set: Vec<String> = assignments
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.write_target(), set.join(", "));
        let mut params: Vec<SqlValue> =
            assignments.iter().map(|(_, value)| value.clone()).collect();
        let (pred_sql, pred_params) = pred.to_sql();
        sql.push_str(" WHERE ");
        sql.push_str(&pred_sql);
        params.extend(pred_params);
        sql.push_str(" RETURNING *");
        Ok(Statement::new(sql, params, self.primary.columns().len()))
    }

    /// Renders a DELETE.
    ///
    /// # Errors
    ///
    /// Refuses to render without a WHERE clause.
    pub(crate) fn delete_statement(&self) -> Result<Statement> {
        let Some(pred) = &self.where_pred else {
            return Err(QueryError::MissingWhereClause("delete"));
        };
        let (pred_sql, pred_params) = pred.to_sql();
        let sql = format!("DELETE FROM {} WHERE {pred_sql}", self.write_target());
        Ok(Statement::new(sql, pred_params, 0))
    }
}
