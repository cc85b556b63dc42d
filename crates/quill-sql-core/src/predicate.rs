//! The predicate tree: boolean conditions over columns, rendered to
//! parameterized SQL.
//!
//! A [`Predicate`] is an owned expression tree. Rendering is deterministic:
//! the same tree always produces the same SQL text and parameter order.
//! `AND`/`OR` parenthesize both operands, so the printed structure mirrors
//! the tree exactly.

use std::fmt;

use crate::statement::Statement;
use crate::value::{SqlValue, ToSqlValue};

/// How a predicate attaches to the running boolean expression of a chain.
///
/// The fold is left-associative: `running = (running) AND p` or
/// `running = (running) OR p`, applied in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Attach with AND.
    And,
    /// Attach with OR.
    Or,
}

/// Comparison operators for column-versus-value predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

/// A boolean condition over one or more columns.
///
/// Column names may be bare (`"name"`) or qualified (`"users.name"`);
/// qualified references are checked against the known tables when the
/// enclosing query is compiled.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column op value`
    Compare {
        /// Column reference.
        column: String,
        /// Comparison operator.
        op: CompareOp,
        /// Bound value.
        value: SqlValue,
    },
    /// `column LIKE pattern`
    Like {
        /// Column reference.
        column: String,
        /// Full LIKE pattern, wildcards included.
        pattern: String,
    },
    /// `column [NOT] IN (values...)`
    InList {
        /// Column reference.
        column: String,
        /// Bound values; never empty (empty lists collapse to
        /// [`Predicate::AlwaysFalse`] / [`Predicate::AlwaysTrue`]).
        values: Vec<SqlValue>,
        /// NOT IN when set.
        negated: bool,
    },
    /// `column [NOT] BETWEEN low AND high`
    Between {
        /// Column reference.
        column: String,
        /// Lower bound.
        low: SqlValue,
        /// Upper bound.
        high: SqlValue,
        /// NOT BETWEEN when set.
        negated: bool,
    },
    /// `column IS [NOT] NULL`
    IsNull {
        /// Column reference.
        column: String,
        /// IS NOT NULL when set.
        negated: bool,
    },
    /// `left = right` between two columns, used for join ON clauses and
    /// correlated subqueries.
    ColumnEq {
        /// Left column reference.
        left: String,
        /// Right column reference.
        right: String,
    },
    /// `column [NOT] IN (subquery)`
    InSubquery {
        /// Column reference.
        column: String,
        /// Compiled nested statement.
        statement: Statement,
        /// NOT IN when set.
        negated: bool,
    },
    /// `[NOT] EXISTS (subquery)`
    Exists {
        /// Compiled nested statement.
        statement: Statement,
        /// NOT EXISTS when set.
        negated: bool,
    },
    /// A predicate that matches every row (`1 = 1`).
    AlwaysTrue,
    /// A predicate that matches no row (`1 = 0`).
    AlwaysFalse,
    /// AND of both operands.
    And(Box<Predicate>, Box<Predicate>),
    /// OR of both operands.
    Or(Box<Predicate>, Box<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
    /// Raw SQL fragment. Only for fragments that contain no user input.
    Raw {
        /// SQL text with `?` placeholders.
        sql: String,
        /// Bound parameters.
        params: Vec<SqlValue>,
    },
}

impl Predicate {
    /// `column = value`
    pub fn eq<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    /// `column != value`
    pub fn ne<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    /// `column > value`
    pub fn gt<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    /// `column >= value`
    pub fn gte<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Gte, value)
    }

    /// `column < value`
    pub fn lt<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    /// `column <= value`
    pub fn lte<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Lte, value)
    }

    fn compare<V: ToSqlValue>(column: &str, op: CompareOp, value: V) -> Self {
        Self::Compare {
            column: column.to_string(),
            op,
            value: value.to_sql_value(),
        }
    }

    /// `column LIKE pattern` — the pattern is used verbatim.
    pub fn like(column: &str, pattern: &str) -> Self {
        Self::Like {
            column: column.to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// `column LIKE %value%`
    pub fn contains(column: &str, value: &str) -> Self {
        Self::like(column, &format!("%{value}%"))
    }

    /// `column IN (values...)`; an empty list matches nothing.
    pub fn in_list<V: ToSqlValue>(column: &str, values: Vec<V>) -> Self {
        Self::in_list_impl(column, values, false)
    }

    /// `column NOT IN (values...)`; an empty list matches everything.
    pub fn not_in_list<V: ToSqlValue>(column: &str, values: Vec<V>) -> Self {
        Self::in_list_impl(column, values, true)
    }

    fn in_list_impl<V: ToSqlValue>(column: &str, values: Vec<V>, negated: bool) -> Self {
        if values.is_empty() {
            return if negated {
                Self::AlwaysTrue
            } else {
                Self::AlwaysFalse
            };
        }
        Self::InList {
            column: column.to_string(),
            values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
            negated,
        }
    }

    /// `column BETWEEN low AND high`
    pub fn between<V: ToSqlValue, W: ToSqlValue>(column: &str, low: V, high: W) -> Self {
        Self::Between {
            column: column.to_string(),
            low: low.to_sql_value(),
            high: high.to_sql_value(),
            negated: false,
        }
    }

    /// `column NOT BETWEEN low AND high`
    pub fn not_between<V: ToSqlValue, W: ToSqlValue>(column: &str, low: V, high: W) -> Self {
        Self::Between {
            column: column.to_string(),
            low: low.to_sql_value(),
            high: high.to_sql_value(),
            negated: true,
        }
    }

    /// `column IS NULL`
    pub fn is_null(column: &str) -> Self {
        Self::IsNull {
            column: column.to_string(),
            negated: false,
        }
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: &str) -> Self {
        Self::IsNull {
            column: column.to_string(),
            negated: true,
        }
    }

    /// `left = right` between two column references.
    pub fn col_eq(left: &str, right: &str) -> Self {
        Self::ColumnEq {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// `column IN (subquery)`
    #[must_use]
    pub fn in_subquery(column: &str, statement: Statement) -> Self {
        Self::InSubquery {
            column: column.to_string(),
            statement,
            negated: false,
        }
    }

    /// `EXISTS (subquery)`
    #[must_use]
    pub const fn exists(statement: Statement) -> Self {
        Self::Exists {
            statement,
            negated: false,
        }
    }

    /// `NOT EXISTS (subquery)`
    #[must_use]
    pub const fn not_exists(statement: Statement) -> Self {
        Self::Exists {
            statement,
            negated: true,
        }
    }

    /// A raw SQL fragment with `?` placeholders.
    pub fn raw(sql: &str, params: Vec<SqlValue>) -> Self {
        Self::Raw {
            sql: sql.to_string(),
            params,
        }
    }

    /// Combines with another predicate using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combines with another predicate using OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Negates the predicate.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Folds a sequence of `(predicate, combinator)` pairs into one
    /// expression, left-associatively.
    ///
    /// The first combinator is ignored; each subsequent predicate attaches
    /// to the running expression with its own combinator, yielding
    /// `((p1) c2 p2) c3 p3 ...`. Returns `None` for an empty sequence.
    pub fn fold<I>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = (Self, Combinator)>,
    {
        let mut running: Option<Self> = None;
        for (pred, combinator) in parts {
            running = Some(match running {
                None => pred,
                Some(acc) => match combinator {
                    Combinator::And => acc.and(pred),
                    Combinator::Or => acc.or(pred),
                },
            });
        }
        running
    }

    /// Renders the predicate to SQL text and bound parameters.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        match self {
            Self::Compare { column, op, value } => {
                (format!("{column} {op} ?"), vec![value.clone()])
            }
            Self::Like { column, pattern } => (
                format!("{column} LIKE ?"),
                vec![SqlValue::Text(pattern.clone())],
            ),
            Self::InList {
                column,
                values,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
                (
                    format!("{column} {keyword} ({})", placeholders.join(", ")),
                    values.clone(),
                )
            }
            Self::Between {
                column,
                low,
                high,
                negated,
            } => {
                let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                (
                    format!("{column} {keyword} ? AND ?"),
                    vec![low.clone(), high.clone()],
                )
            }
            Self::IsNull { column, negated } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                (format!("{column} {keyword}"), vec![])
            }
            Self::ColumnEq { left, right } => (format!("{left} = {right}"), vec![]),
            Self::InSubquery {
                column,
                statement,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                (
                    format!("{column} {keyword} ({})", statement.sql),
                    statement.params.clone(),
                )
            }
            Self::Exists { statement, negated } => {
                let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
                (
                    format!("{keyword} ({})", statement.sql),
                    statement.params.clone(),
                )
            }
            Self::AlwaysTrue => (String::from("1 = 1"), vec![]),
            Self::AlwaysFalse => (String::from("1 = 0"), vec![]),
            Self::And(left, right) => {
                let (lsql, mut params) = left.to_sql();
                let (rsql, rparams) = right.to_sql();
                params.extend(rparams);
                (format!("({lsql}) AND ({rsql})"), params)
            }
            Self::Or(left, right) => {
                let (lsql, mut params) = left.to_sql();
                let (rsql, rparams) = right.to_sql();
                params.extend(rparams);
                (format!("({lsql}) OR ({rsql})"), params)
            }
            Self::Not(inner) => {
                let (sql, params) = inner.to_sql();
                (format!("NOT ({sql})"), params)
            }
            Self::Raw { sql, params } => (sql.clone(), params.clone()),
        }
    }

    /// Collects every column reference in the tree, in render order.
    ///
    /// Raw fragments and nested statements are opaque and contribute
    /// nothing; their references were validated when they were built.
    pub fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare { column, .. }
            | Self::Like { column, .. }
            | Self::InList { column, .. }
            | Self::Between { column, .. }
            | Self::IsNull { column, .. }
            | Self::InSubquery { column, .. } => out.push(column),
            Self::ColumnEq { left, right } => {
                out.push(left);
                out.push(right);
            }
            Self::And(left, right) | Self::Or(left, right) => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Self::Not(inner) => inner.collect_columns(out),
            Self::Exists { .. } | Self::AlwaysTrue | Self::AlwaysFalse | Self::Raw { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_compare() {
        let (sql, params) = Predicate::eq("status", "active").to_sql();
        assert_eq!(sql, "status = ?");
        assert_eq!(params, vec![SqlValue::Text("active".into())]);
    }

    #[test]
    fn and_or_structure() {
        let p = Predicate::eq("a", 1).or(Predicate::eq("b", 2));
        let (sql, params) = p.to_sql();
        assert_eq!(sql, "(a = ?) OR (b = ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn left_associative_fold() {
        let folded = Predicate::fold(vec![
            (Predicate::eq("a", 1), Combinator::And),
            (Predicate::eq("b", 2), Combinator::Or),
            (Predicate::eq("c", 3), Combinator::And),
        ])
        .unwrap();
        let (sql, _) = folded.to_sql();
        assert_eq!(sql, "((a = ?) OR (b = ?)) AND (c = ?)");
    }

    #[test]
    fn fold_empty_is_none() {
        assert_eq!(Predicate::fold(vec![]), None);
    }

    #[test]
    fn empty_in_list_collapses() {
        assert_eq!(
            Predicate::in_list::<i64>("id", vec![]),
            Predicate::AlwaysFalse
        );
        assert_eq!(
            Predicate::not_in_list::<i64>("id", vec![]),
            Predicate::AlwaysTrue
        );
        assert_eq!(Predicate::AlwaysFalse.to_sql().0, "1 = 0");
        assert_eq!(Predicate::AlwaysTrue.to_sql().0, "1 = 1");
    }

    #[test]
    fn in_list_placeholders() {
        let (sql, params) = Predicate::in_list("id", vec![1_i64, 2, 3]).to_sql();
        assert_eq!(sql, "id IN (?, ?, ?)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn between_and_null_checks() {
        assert_eq!(
            Predicate::between("age", 18, 65).to_sql().0,
            "age BETWEEN ? AND ?"
        );
        assert_eq!(
            Predicate::not_between("age", 18, 65).to_sql().0,
            "age NOT BETWEEN ? AND ?"
        );
        assert_eq!(
            Predicate::is_null("deleted_at").to_sql().0,
            "deleted_at IS NULL"
        );
        assert_eq!(
            Predicate::is_not_null("deleted_at").to_sql().0,
            "deleted_at IS NOT NULL"
        );
    }

    #[test]
    fn column_equality() {
        let (sql, params) = Predicate::col_eq("users.id", "posts.user_id").to_sql();
        assert_eq!(sql, "users.id = posts.user_id");
        assert!(params.is_empty());
    }

    #[test]
    fn subquery_predicates() {
        let inner = Statement::new(
            "SELECT user_id FROM posts WHERE published = ?".into(),
            vec![SqlValue::Bool(true)],
            1,
        );
        let (sql, params) = Predicate::in_subquery("users.id", inner.clone()).to_sql();
        assert_eq!(
            sql,
            "users.id IN (SELECT user_id FROM posts WHERE published = ?)"
        );
        assert_eq!(params.len(), 1);

        let (sql, _) = Predicate::not_exists(inner).to_sql();
        assert!(sql.starts_with("NOT EXISTS (SELECT user_id"));
    }

    #[test]
    fn collects_column_references() {
        let p = Predicate::eq("users.active", true)
            .and(Predicate::col_eq("users.id", "posts.user_id"));
        let mut cols = Vec::new();
        p.collect_columns(&mut cols);
        assert_eq!(cols, vec!["users.active", "users.id", "posts.user_id"]);
    }
}
