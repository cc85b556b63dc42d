//! Parsing of `table.column__operator` filter keys.

use crate::error::{BuildError, Result};

/// A parsed filter key.
///
/// Keys look like `"users.age__gte"`; the operator suffix is optional and
/// defaults to `eq`, so `"users.age"` and `"users.age__eq"` are the same
/// key. The split is on the first `.` and the *last* `__`, so column names
/// containing a double underscore stay intact as long as an explicit
/// operator follows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterKey {
    /// Table name or alias, exactly as written.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Operator name; `"eq"` when no suffix was given.
    pub operator: String,
}

impl FilterKey {
    /// Parses a filter key.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MalformedFilterKey`] when the key has no `.`
    /// separator or any segment is empty.
    pub fn parse(key: &str) -> Result<Self> {
        let malformed = || BuildError::MalformedFilterKey {
            key: key.to_string(),
        };

        let (table, rest) = key.split_once('.').ok_or_else(malformed)?;
        if table.is_empty() || rest.is_empty() {
            return Err(malformed());
        }

        let (column, operator) = match rest.rfind("__") {
            Some(idx) => (&rest[..idx], &rest[idx + 2..]),
            None => (rest, "eq"),
        };
        if column.is_empty() || operator.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            table: table.to_string(),
            column: column.to_string(),
            operator: operator.to_string(),
        })
    }

    /// The qualified column reference, `table.column`.
    #[must_use]
    pub fn qualified_column(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_operator() {
        let key = FilterKey::parse("users.age__gte").unwrap();
        assert_eq!(key.table, "users");
        assert_eq!(key.column, "age");
        assert_eq!(key.operator, "gte");
    }

    #[test]
    fn operator_defaults_to_eq() {
        let key = FilterKey::parse("users.active").unwrap();
        assert_eq!(key.operator, "eq");
        assert_eq!(key, FilterKey::parse("users.active__eq").unwrap());
    }

    #[test]
    fn splits_on_last_double_underscore() {
        let key = FilterKey::parse("users.share__count__gt").unwrap();
        assert_eq!(key.column, "share__count");
        assert_eq!(key.operator, "gt");
    }

    #[test]
    fn rejects_keys_without_table() {
        for bad in ["age__gte", "users.", ".age", "users.__gt", "users.age__"] {
            assert!(
                matches!(
                    FilterKey::parse(bad),
                    Err(BuildError::MalformedFilterKey { .. })
                ),
                "expected {bad:?} to be malformed"
            );
        }
    }

    #[test]
    fn qualified_column_joins_parts() {
        let key = FilterKey::parse("posts.title__like").unwrap();
        assert_eq!(key.qualified_column(), "posts.title");
    }
}
