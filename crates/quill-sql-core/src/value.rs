//! SQL values and parameter handling.
//!
//! Values are always carried as parameters, never interpolated into the SQL
//! text, so user input cannot change statement structure.

/// A SQL value bound as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns whether the value counts as "truthy" for the `isnull` /
    /// `notnull` filter operators.
    ///
    /// `Null` is falsy, booleans are themselves, numbers are truthy when
    /// non-zero, text and blobs when non-empty.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(x) => *x != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Blob(b) => !b.is_empty(),
        }
    }

    /// Renders the value as text for use inside a LIKE pattern.
    ///
    /// Returns `None` for values that have no sensible textual form
    /// (`Null`, blobs).
    #[must_use]
    pub fn as_pattern_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Float(x) => Some(x.to_string()),
            Self::Bool(b) => Some(if *b { "1".into() } else { "0".into() }),
            Self::Null | Self::Blob(_) => None,
        }
    }

    /// Returns the escaped SQL literal for debug rendering.
    ///
    /// Statements are always executed with bound parameters; this exists
    /// only for log output and tests.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }
}

/// Trait for types that can be converted to a [`SqlValue`].
pub trait ToSqlValue {
    /// Converts the value.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

macro_rules! impl_to_sql_value_int {
    ($($ty:ty),+) => {
        $(impl ToSqlValue for $ty {
            fn to_sql_value(self) -> SqlValue {
                SqlValue::Int(i64::from(self))
            }
        })+
    };
}

impl_to_sql_value_int!(i8, i16, i32, i64, u8, u16, u32);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}
