//! Compiled statements.

use crate::value::SqlValue;

/// A fully rendered, parameterized SQL statement.
///
/// Carries the projection arity alongside the text so that set operations
/// (UNION / UNION ALL) can verify that all parts select the same number of
/// columns before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameters, in placeholder order.
    pub params: Vec<SqlValue>,
    /// Number of projected columns.
    pub arity: usize,
}

impl Statement {
    /// Creates a statement from its parts.
    #[must_use]
    pub const fn new(sql: String, params: Vec<SqlValue>, arity: usize) -> Self {
        Self { sql, params, arity }
    }

    /// Renders the statement with parameters inlined, for log output only.
    #[must_use]
    pub fn to_debug_sql(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();
        for ch in self.sql.chars() {
            if ch == '?' {
                match params.next() {
                    Some(v) => out.push_str(&v.to_sql_inline()),
                    None => out.push(ch),
                }
            } else {
                out.push(ch);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_rendering_inlines_params() {
        let stmt = Statement::new(
            "SELECT id FROM users WHERE name = ? AND age > ?".into(),
            vec![SqlValue::Text("O'Brien".into()), SqlValue::Int(30)],
            1,
        );
        assert_eq!(
            stmt.to_debug_sql(),
            "SELECT id FROM users WHERE name = 'O''Brien' AND age > 30"
        );
    }
}
