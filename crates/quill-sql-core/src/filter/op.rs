//! The filter operator registry.
//!
//! Maps operator suffixes (`eq`, `gt`, `like`, `in`, ...) to predicate
//! construction rules. Each rule validates the shape of its value and
//! produces a [`Predicate`].

use crate::error::{BuildError, Result};
use crate::predicate::Predicate;
use crate::value::{SqlValue, ToSqlValue};

/// A filter value: a single scalar or an ordered list.
///
/// Lists are required by `in` / `notin` / `between` / `not_between` and
/// rejected by everything else (except `in` / `notin`, which tolerate a
/// scalar by treating it as a one-element list).
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A single value.
    Scalar(SqlValue),
    /// An ordered list of values.
    List(Vec<SqlValue>),
}

impl FilterValue {
    /// Wraps a scalar.
    pub fn scalar<V: ToSqlValue>(value: V) -> Self {
        Self::Scalar(value.to_sql_value())
    }

    /// Wraps a list.
    pub fn list<V: ToSqlValue>(values: Vec<V>) -> Self {
        Self::List(values.into_iter().map(ToSqlValue::to_sql_value).collect())
    }

    /// Truthiness for `isnull` / `notnull`: scalars defer to
    /// [`SqlValue::is_truthy`], lists are truthy when non-empty.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Scalar(v) => v.is_truthy(),
            Self::List(vs) => !vs.is_empty(),
        }
    }
}

macro_rules! impl_filter_value_from_scalar {
    ($($ty:ty),+) => {
        $(impl From<$ty> for FilterValue {
            fn from(value: $ty) -> Self {
                Self::scalar(value)
            }
        })+
    };
}

impl_filter_value_from_scalar!(bool, i32, i64, f64, String, &str, SqlValue);

macro_rules! impl_filter_value_from_list {
    ($($ty:ty),+) => {
        $(impl From<Vec<$ty>> for FilterValue {
            fn from(values: Vec<$ty>) -> Self {
                Self::list(values)
            }
        })+
    };
}

impl_filter_value_from_list!(i32, i64, f64, String, &str, SqlValue);

/// A recognized filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `column = value` (the default).
    Eq,
    /// `column != value` (`ne` and `neq`).
    Ne,
    /// `column > value`
    Gt,
    /// `column >= value`
    Gte,
    /// `column < value`
    Lt,
    /// `column <= value`
    Lte,
    /// Substring match, value wrapped in wildcards (`like` and
    /// `icontains`).
    Like,
    /// Prefix match, `value%`.
    StartsWith,
    /// Suffix match, `%value`.
    EndsWith,
    /// `column IN (values)`; empty list matches nothing.
    In,
    /// `column NOT IN (values)`; empty list matches everything.
    NotIn,
    /// `column BETWEEN low AND high`; requires exactly two values.
    Between,
    /// `column NOT BETWEEN low AND high`.
    NotBetween,
    /// Truthy value: IS NULL; falsy: IS NOT NULL.
    IsNull,
    /// Truthy value: IS NOT NULL; falsy: IS NULL.
    NotNull,
}

impl FilterOp {
    /// Resolves an operator name from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownOperator`] for unrecognized names.
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            "eq" => Ok(Self::Eq),
            "ne" | "neq" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "like" | "icontains" => Ok(Self::Like),
            "startswith" => Ok(Self::StartsWith),
            "endswith" => Ok(Self::EndsWith),
            "in" => Ok(Self::In),
            "notin" => Ok(Self::NotIn),
            "between" => Ok(Self::Between),
            "not_between" => Ok(Self::NotBetween),
            "isnull" => Ok(Self::IsNull),
            "notnull" => Ok(Self::NotNull),
            _ => Err(BuildError::UnknownOperator {
                operator: name.to_string(),
            }),
        }
    }

    /// Builds the predicate for `column` and `value`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidOperatorValue`] when the value has the
    /// wrong shape for this operator.
    pub fn build(self, column: &str, value: &FilterValue) -> Result<Predicate> {
        match self {
            Self::Eq => Ok(Predicate::eq(column, self.scalar(value, "eq")?)),
            Self::Ne => Ok(Predicate::ne(column, self.scalar(value, "ne")?)),
            Self::Gt => Ok(Predicate::gt(column, self.scalar(value, "gt")?)),
            Self::Gte => Ok(Predicate::gte(column, self.scalar(value, "gte")?)),
            Self::Lt => Ok(Predicate::lt(column, self.scalar(value, "lt")?)),
            Self::Lte => Ok(Predicate::lte(column, self.scalar(value, "lte")?)),
            Self::Like => {
                let text = self.pattern_text(value, "like")?;
                Ok(Predicate::like(column, &format!("%{text}%")))
            }
            Self::StartsWith => {
                let text = self.pattern_text(value, "startswith")?;
                Ok(Predicate::like(column, &format!("{text}%")))
            }
            Self::EndsWith => {
                let text = self.pattern_text(value, "endswith")?;
                Ok(Predicate::like(column, &format!("%{text}")))
            }
            Self::In => Ok(Predicate::in_list(column, Self::as_list(value))),
            Self::NotIn => Ok(Predicate::not_in_list(column, Self::as_list(value))),
            Self::Between => {
                let (low, high) = Self::bounds(value, "between")?;
                Ok(Predicate::between(column, low, high))
            }
            Self::NotBetween => {
                let (low, high) = Self::bounds(value, "not_between")?;
                Ok(Predicate::not_between(column, low, high))
            }
            Self::IsNull => Ok(if value.is_truthy() {
                Predicate::is_null(column)
            } else {
                Predicate::is_not_null(column)
            }),
            Self::NotNull => Ok(if value.is_truthy() {
                Predicate::is_not_null(column)
            } else {
                Predicate::is_null(column)
            }),
        }
    }

    fn scalar(self, value: &FilterValue, operator: &str) -> Result<SqlValue> {
        match value {
            FilterValue::Scalar(v) => Ok(v.clone()),
            FilterValue::List(_) => Err(BuildError::InvalidOperatorValue {
                operator: operator.to_string(),
                message: String::from("expected a scalar, got a list"),
            }),
        }
    }

    fn pattern_text(self, value: &FilterValue, operator: &str) -> Result<String> {
        self.scalar(value, operator)?
            .as_pattern_text()
            .ok_or_else(|| BuildError::InvalidOperatorValue {
                operator: operator.to_string(),
                message: String::from("value has no textual form"),
            })
    }

    fn as_list(value: &FilterValue) -> Vec<SqlValue> {
        match value {
            FilterValue::List(vs) => vs.clone(),
            // A bare scalar is treated as a one-element list.
            FilterValue::Scalar(v) => vec![v.clone()],
        }
    }

    fn bounds(value: &FilterValue, operator: &str) -> Result<(SqlValue, SqlValue)> {
        match value {
            FilterValue::List(vs) if vs.len() == 2 => Ok((vs[0].clone(), vs[1].clone())),
            _ => Err(BuildError::InvalidOperatorValue {
                operator: operator.to_string(),
                message: String::from("requires exactly [low, high]"),
            }),
        }
    }
}
