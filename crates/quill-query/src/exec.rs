//! Async terminal operations.
//!
//! Each terminal consumes the builder, compiles it once, logs the rendered
//! SQL at debug level and runs it against the pool. Read terminals return
//! [`Record`] maps or, via the `_as` variants, any `sqlx::FromRow` type.

use std::collections::BTreeMap;

use quill_sql_core::{Aggregate, Predicate, SqlValue, Statement, ToSqlValue};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, FromRow, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

use crate::builder::TableQuery;
use crate::error::{QueryError, Result};
use crate::page::{Page, Pagination};

/// A decoded row: column name to value, in name order.
pub type Record = BTreeMap<String, SqlValue>;

/// Upper bound on bind parameters per INSERT statement; larger batches are
/// split.
const MAX_BIND_PARAMS: usize = 500;

/// Binds a [`SqlValue`] parameter to a raw query.
fn bind_param_raw<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

/// Binds a [`SqlValue`] parameter to a typed query.
fn bind_param<'q, M>(
    query: sqlx::query::QueryAs<'q, Sqlite, M, SqliteArguments<'q>>,
    value: SqlValue,
) -> sqlx::query::QueryAs<'q, Sqlite, M, SqliteArguments<'q>>
where
    M: for<'r> FromRow<'r, SqliteRow>,
{
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

/// Decodes a row into a [`Record`] by SQLite storage class.
fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => SqlValue::Int(row.try_get::<i64, _>(i)?),
                "REAL" => SqlValue::Float(row.try_get::<f64, _>(i)?),
                "BLOB" => SqlValue::Blob(row.try_get::<Vec<u8>, _>(i)?),
                "BOOLEAN" => SqlValue::Bool(row.try_get::<bool, _>(i)?),
                _ => SqlValue::Text(row.try_get::<String, _>(i)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

async fn fetch_all_records(pool: &SqlitePool, statement: Statement) -> Result<Vec<Record>> {
    tracing::debug!(sql = %statement.to_debug_sql(), "executing query");
    let mut query = sqlx::query(&statement.sql);
    for param in statement.params {
        query = bind_param_raw(query, param);
    }
    let rows = query.fetch_all(pool).await?;
    rows.iter().map(record_from_row).collect()
}

async fn fetch_optional_record(pool: &SqlitePool, statement: Statement) -> Result<Option<Record>> {
    tracing::debug!(sql = %statement.to_debug_sql(), "executing query");
    let mut query = sqlx::query(&statement.sql);
    for param in statement.params {
        query = bind_param_raw(query, param);
    }
    match query.fetch_optional(pool).await? {
        Some(row) => Ok(Some(record_from_row(&row)?)),
        None => Ok(None),
    }
}

async fn fetch_scalar_row(pool: &SqlitePool, statement: Statement) -> Result<SqliteRow> {
    tracing::debug!(sql = %statement.to_debug_sql(), "executing query");
    let mut query = sqlx::query(&statement.sql);
    for param in statement.params {
        query = bind_param_raw(query, param);
    }
    Ok(query.fetch_one(pool).await?)
}

impl TableQuery {
    fn primary_key_predicate<V: ToSqlValue>(&self, pk: V) -> Result<Predicate> {
        let column = self.primary.primary_key();
        if column.is_empty() {
            return Err(QueryError::Validation(format!(
                "table {} has no primary key",
                self.primary.effective_name()
            )));
        }
        let reference = format!("{}.{column}", self.primary.effective_name());
        Ok(Predicate::eq(&reference, pk))
    }

    fn assignments(
        &self,
        values: &[(&str, SqlValue)],
        operation: &str,
    ) -> Result<Vec<(String, SqlValue)>> {
        if values.is_empty() {
            return Err(QueryError::Validation(format!(
                "{operation} requires at least one column"
            )));
        }
        for (column, _) in values {
            if !self.primary.has_column(column) {
                return Err(QueryError::Build(
                    quill_sql_core::BuildError::UnknownColumn {
                        table: self.primary.effective_name().to_string(),
                        column: (*column).to_string(),
                    },
                ));
            }
        }
        Ok(values
            .iter()
            .map(|(column, value)| ((*column).to_string(), value.clone()))
            .collect())
    }

    /// Runs the query and returns every matching row.
    pub async fn all(self, pool: &SqlitePool) -> Result<Vec<Record>> {
        let statement = self.resolve()?.select_statement();
        fetch_all_records(pool, statement).await
    }

    /// Runs the query decoding rows into `M`.
    pub async fn all_as<M>(self, pool: &SqlitePool) -> Result<Vec<M>>
    where
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let statement = self.resolve()?.select_statement();
        tracing::debug!(sql = %statement.to_debug_sql(), "executing query");
        let mut query = sqlx::query_as::<_, M>(&statement.sql);
        for param in statement.params {
            query = bind_param(query, param);
        }
        Ok(query.fetch_all(pool).await?)
    }

    /// Returns the first matching row, if any.
    pub async fn first(self, pool: &SqlitePool) -> Result<Option<Record>> {
        let statement = self.limit(1).resolve()?.select_statement();
        fetch_optional_record(pool, statement).await
    }

    /// Returns the first matching row decoded into `M`, if any.
    pub async fn first_as<M>(self, pool: &SqlitePool) -> Result<Option<M>>
    where
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let statement = self.limit(1).resolve()?.select_statement();
        tracing::debug!(sql = %statement.to_debug_sql(), "executing query");
        let mut query = sqlx::query_as::<_, M>(&statement.sql);
        for param in statement.params {
            query = bind_param(query, param);
        }
        Ok(query.fetch_optional(pool).await?)
    }

    /// Looks a row up by primary key, combined with any accumulated
    /// predicates.
    pub async fn find<V: ToSqlValue>(self, pool: &SqlitePool, pk: V) -> Result<Option<Record>> {
        let predicate = self.primary_key_predicate(pk)?;
        self.where_clause(predicate).first(pool).await
    }

    /// Like [`find`](Self::find), but a missing row is an error.
    pub async fn find_or_fail<V: ToSqlValue>(self, pool: &SqlitePool, pk: V) -> Result<Record> {
        self.find(pool, pk).await?.ok_or(QueryError::NotFound)
    }

    /// Looks a row up by primary key, decoded into `M`.
    pub async fn find_as<M, V>(self, pool: &SqlitePool, pk: V) -> Result<Option<M>>
    where
        M: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
        V: ToSqlValue,
    {
        let predicate = self.primary_key_predicate(pk)?;
        self.where_clause(predicate).first_as(pool).await
    }

    /// Like [`first`](Self::first), but an empty result is an error.
    pub async fn first_or_fail(self, pool: &SqlitePool) -> Result<Record> {
        self.first(pool).await?.ok_or(QueryError::NotFound)
    }

    /// Returns the last matching row in query order, if any.
    pub async fn last(self, pool: &SqlitePool) -> Result<Option<Record>> {
        let mut records = self.all(pool).await?;
        Ok(records.pop())
    }

    /// Updates the row with the given primary key and returns it as
    /// written, or `None` when no such row exists.
    pub async fn update_by_id<V: ToSqlValue>(
        self,
        pool: &SqlitePool,
        pk: V,
        values: &[(&str, SqlValue)],
    ) -> Result<Option<Record>> {
        let predicate = self.primary_key_predicate(pk)?;
        let mut updated = self.where_clause(predicate).update(pool, values).await?;
        Ok(if updated.is_empty() {
            None
        } else {
            Some(updated.swap_remove(0))
        })
    }

    /// Deletes the row with the given primary key; returns the number of
    /// rows removed (0 or 1).
    pub async fn delete_by_id<V: ToSqlValue>(self, pool: &SqlitePool, pk: V) -> Result<u64> {
        let predicate = self.primary_key_predicate(pk)?;
        self.where_clause(predicate).delete(pool).await
    }

    /// Runs the query windowed to one page and returns it together with
    /// totals computed from an unwindowed count over the same predicates.
    ///
    /// # Errors
    ///
    /// `page` and `per_page` must both be at least 1.
    pub async fn paginate(
        self,
        pool: &SqlitePool,
        page: u64,
        per_page: u64,
    ) -> Result<Page<Record>> {
        if page == 0 || per_page == 0 {
            return Err(QueryError::InvalidPagination { page, per_page });
        }
        let resolved = self.resolve()?;

        let count_row = fetch_scalar_row(pool, resolved.count_statement()).await?;
        let total: i64 = count_row.try_get(0)?;
        let total_records = u64::try_from(total).unwrap_or(0);

        let statement = resolved.select_statement_with(Some(per_page), Some((page - 1) * per_page));
        let items = fetch_all_records(pool, statement).await?;

        Ok(Page {
            items,
            pagination: Pagination::new(page, per_page, total_records),
        })
    }

    /// Counts matching rows.
    pub async fn count(self, pool: &SqlitePool) -> Result<i64> {
        let statement = self.resolve()?.count_statement();
        let row = fetch_scalar_row(pool, statement).await?;
        Ok(row.try_get(0)?)
    }

    /// Returns whether any row matches.
    pub async fn exists(self, pool: &SqlitePool) -> Result<bool> {
        Ok(self.count(pool).await? > 0)
    }

    async fn aggregate(self, pool: &SqlitePool, aggregate: Aggregate) -> Result<Option<f64>> {
        let statement = self.resolve()?.aggregate_statement(&aggregate)?;
        let row = fetch_scalar_row(pool, statement).await?;
        // SQLite reports INTEGER for SUM/MIN/MAX over integer columns, so
        // the scalar is decoded by storage class like any other value.
        let raw = row.try_get_raw(0)?;
        if raw.is_null() {
            return Ok(None);
        }
        let value = match raw.type_info().name() {
            "INTEGER" => row.try_get::<i64, _>(0)? as f64,
            _ => row.try_get::<f64, _>(0)?,
        };
        Ok(Some(value))
    }

    /// `SUM(column)` over matching rows; `None` when no rows match.
    pub async fn sum(self, pool: &SqlitePool, column: &str) -> Result<Option<f64>> {
        self.aggregate(pool, Aggregate::sum(column)).await
    }

    /// `AVG(column)` over matching rows; `None` when no rows match.
    pub async fn avg(self, pool: &SqlitePool, column: &str) -> Result<Option<f64>> {
        self.aggregate(pool, Aggregate::avg(column)).await
    }

    /// `MIN(column)` over matching rows; `None` when no rows match.
    pub async fn min(self, pool: &SqlitePool, column: &str) -> Result<Option<f64>> {
        self.aggregate(pool, Aggregate::min(column)).await
    }

    /// `MAX(column)` over matching rows; `None` when no rows match.
    pub async fn max(self, pool: &SqlitePool, column: &str) -> Result<Option<f64>> {
        self.aggregate(pool, Aggregate::max(column)).await
    }

    /// Inserts one row and returns it as written by the database.
    pub async fn create(self, pool: &SqlitePool, values: &[(&str, SqlValue)]) -> Result<Record> {
        let assignments = self.assignments(values, "create")?;
        let columns: Vec<&str> = assignments.iter().map(|(c, _)| c.as_str()).collect();
        let row: Vec<SqlValue> = assignments.iter().map(|(_, v)| v.clone()).collect();

        let resolved = self.resolve()?;
        let statement = resolved.insert_statement(&columns, &[row]);
        let mut records = fetch_all_records(pool, statement).await?;
        records.pop().ok_or(QueryError::NotFound)
    }

    /// Inserts many rows sharing one column list, splitting into batches
    /// when the bind-parameter count would grow too large. Returns the
    /// written rows in input order.
    pub async fn create_many(
        self,
        pool: &SqlitePool,
        columns: &[&str],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<Vec<Record>> {
        if columns.is_empty() {
            return Err(QueryError::Validation(
                "create_many requires at least one column".to_string(),
            ));
        }
        for column in columns {
            if !self.primary.has_column(column) {
                return Err(QueryError::Build(
                    quill_sql_core::BuildError::UnknownColumn {
                        table: self.primary.effective_name().to_string(),
                        column: (*column).to_string(),
                    },
                ));
            }
        }
        for row in &rows {
            if row.len() != columns.len() {
                return Err(QueryError::Validation(format!(
                    "row has {} values, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }

        let resolved = self.resolve()?;
        let rows_per_batch = (MAX_BIND_PARAMS / columns.len()).max(1);
        let mut written = Vec::with_capacity(rows.len());
        for batch in rows.chunks(rows_per_batch) {
            let statement = resolved.insert_statement(columns, batch);
            written.extend(fetch_all_records(pool, statement).await?);
        }
        Ok(written)
    }

    /// Updates matching rows and returns them as written.
    ///
    /// # Errors
    ///
    /// Refuses to run without an accumulated WHERE clause.
    pub async fn update(
        self,
        pool: &SqlitePool,
        values: &[(&str, SqlValue)],
    ) -> Result<Vec<Record>> {
        let assignments = self.assignments(values, "update")?;
        let statement = self.resolve()?.update_statement(&assignments)?;
        fetch_all_records(pool, statement).await
    }

    /// Deletes matching rows and returns the number removed.
    ///
    /// # Errors
    ///
    /// Refuses to run without an accumulated WHERE clause.
    pub async fn delete(self, pool: &SqlitePool) -> Result<u64> {
        let statement = self.resolve()?.delete_statement()?;
        tracing::debug!(sql = %statement.to_debug_sql(), "executing query");
        let mut query = sqlx::query(&statement.sql);
        for param in statement.params {
            query = bind_param_raw(query, param);
        }
        let result = query.execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Renders the SELECT this chain would run, with parameters inlined.
    /// Debug aid; the rendered text is never executed.
    pub fn to_sql(self) -> Result<String> {
        Ok(self.resolve()?.select_statement().to_debug_sql())
    }
}
