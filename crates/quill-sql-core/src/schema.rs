//! Table metadata used for alias and column resolution.

/// Compile-time table metadata.
///
/// Implemented by hand or by codegen for statically known tables; the
/// builder consumes the runtime [`TableMeta`] form.
pub trait Table {
    /// The SQL table name.
    const NAME: &'static str;

    /// All column names.
    const COLUMNS: &'static [&'static str];

    /// The primary key column name.
    const PRIMARY_KEY: &'static str;
}

/// Runtime metadata for one table taking part in a query.
///
/// This is the resolution surface for the filter DSL: the filter compiler
/// matches the `table` part of a `table.column__op` key against the meta's
/// effective name (alias when set, table name otherwise), case-sensitively,
/// and the `column` part against the declared columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    name: String,
    alias: Option<String>,
    columns: Vec<String>,
    primary_key: String,
}

impl TableMeta {
    /// Creates table metadata from its parts.
    pub fn new(name: &str, columns: &[&str], primary_key: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            primary_key: primary_key.to_string(),
        }
    }

    /// Creates metadata from a statically declared [`Table`].
    #[must_use]
    pub fn of<T: Table>() -> Self {
        Self::new(T::NAME, T::COLUMNS, T::PRIMARY_KEY)
    }

    /// Creates metadata for a derived table (subquery source): the alias is
    /// the only name it is known under.
    pub fn derived(alias: &str, columns: &[String]) -> Self {
        Self {
            name: alias.to_string(),
            alias: Some(alias.to_string()),
            columns: columns.to_vec(),
            primary_key: String::new(),
        }
    }

    /// Returns a copy known under the given alias.
    #[must_use]
    pub fn aliased(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// The underlying table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The alias, if one was set.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The name this table resolves under: the alias when set, the table
    /// name otherwise.
    #[must_use]
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Declared column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The primary key column name. Empty for derived tables.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Whether the table declares the given column.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The FROM/JOIN source text: `name` or `name AS alias`, with an
    /// optional schema qualifier on the table name.
    #[must_use]
    pub fn source_sql(&self, schema: Option<&str>) -> String {
        let base = match schema {
            Some(s) => format!("{s}.{}", self.name),
            None => self.name.clone(),
        };
        match &self.alias {
            Some(a) => format!("{base} AS {a}"),
            None => base,
        }
    }

    /// All columns qualified with the effective name, for default
    /// projections in joined queries.
    #[must_use]
    pub fn qualified_columns(&self) -> Vec<String> {
        let prefix = self.effective_name();
        self.columns.iter().map(|c| format!("{prefix}.{c}")).collect()
    }
}
