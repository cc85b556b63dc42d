//! Aggregate projections.

/// An aggregate function projected by a terminal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// COUNT aggregate.
    Count {
        /// Column to count, or `*` for all rows.
        column: String,
        /// Count only distinct values.
        distinct: bool,
    },
    /// SUM aggregate.
    Sum {
        /// Column to sum.
        column: String,
    },
    /// AVG aggregate.
    Avg {
        /// Column to average.
        column: String,
    },
    /// MIN aggregate.
    Min {
        /// Column to take the minimum of.
        column: String,
    },
    /// MAX aggregate.
    Max {
        /// Column to take the maximum of.
        column: String,
    },
}

impl Aggregate {
    /// `COUNT(*)`
    #[must_use]
    pub fn count_all() -> Self {
        Self::Count {
            column: String::from("*"),
            distinct: false,
        }
    }

    /// `COUNT(column)`
    pub fn count(column: &str) -> Self {
        Self::Count {
            column: column.to_string(),
            distinct: false,
        }
    }

    /// `COUNT(DISTINCT column)`
    pub fn count_distinct(column: &str) -> Self {
        Self::Count {
            column: column.to_string(),
            distinct: true,
        }
    }

    /// `SUM(column)`
    pub fn sum(column: &str) -> Self {
        Self::Sum {
            column: column.to_string(),
        }
    }

    /// `AVG(column)`
    pub fn avg(column: &str) -> Self {
        Self::Avg {
            column: column.to_string(),
        }
    }

    /// `MIN(column)`
    pub fn min(column: &str) -> Self {
        Self::Min {
            column: column.to_string(),
        }
    }

    /// `MAX(column)`
    pub fn max(column: &str) -> Self {
        Self::Max {
            column: column.to_string(),
        }
    }

    /// The column the aggregate reads, if any (`*` reads none).
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Count { column, .. }
            | Self::Sum { column }
            | Self::Avg { column }
            | Self::Min { column }
            | Self::Max { column } => {
                if column == "*" {
                    None
                } else {
                    Some(column)
                }
            }
        }
    }

    /// SQL projection text.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Count { column, distinct } => {
                if *distinct {
                    format!("COUNT(DISTINCT {column})")
                } else {
                    format!("COUNT({column})")
                }
            }
            Self::Sum { column } => format!("SUM({column})"),
            Self::Avg { column } => format!("AVG({column})"),
            Self::Min { column } => format!("MIN({column})"),
            Self::Max { column } => format!("MAX({column})"),
        }
    }
}
