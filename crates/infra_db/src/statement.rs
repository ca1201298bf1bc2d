//! Statements and SQL text generation
//!
//! A [`Statement`] is the unit of work handed to the executor: SQL text with
//! numbered PostgreSQL placeholders (`$1`, `$2`, ...), its bind parameters, and
//! an optional schema scope applied for the duration of the statement's
//! transaction.

use crate::value::SqlValue;

/// Maximum number of bind parameters PostgreSQL accepts in one statement
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// A parameterized SQL statement
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
    schema: Option<String>,
}

impl Statement {
    /// Creates a statement without parameters
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            schema: None,
        }
    }

    /// Creates a statement with its parameters
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            schema: None,
        }
    }

    /// Appends a bind parameter
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Runs the statement with `schema` first on the search path
    ///
    /// `public` and `auth` are already on every connection's search path and
    /// are ignored.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.schema = match schema.as_str() {
            "public" | "auth" | "" => None,
            _ => Some(schema),
        };
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}

/// Quotes an identifier, quoting each part of a dotted name separately
///
/// # Example
///
/// ```rust
/// use infra_db::statement::quote_ident;
///
/// assert_eq!(quote_ident("doctors"), "\"doctors\"");
/// assert_eq!(quote_ident("auth.users"), "\"auth\".\"users\"");
/// ```
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Builds a multi-row `INSERT ... ON CONFLICT ... DO UPDATE` statement
///
/// Placeholders are numbered row-major: row `r`, column `c` binds parameter
/// `r * columns.len() + c + 1`. Every column, including the unique key, is
/// refreshed from `EXCLUDED` on conflict.
pub fn upsert_sql(table: &str, columns: &[&str], unique_key: &str, rows: usize) -> String {
    let width = columns.len();
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let tuples = (0..rows)
        .map(|row| {
            let placeholders = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", placeholders)
        })
        .collect::<Vec<_>>()
        .join(", ");

    let set_clause = columns
        .iter()
        .map(|c| {
            let quoted = quote_ident(c);
            format!("{} = EXCLUDED.{}", quoted, quoted)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) DO UPDATE SET {}",
        quote_ident(table),
        column_list,
        tuples,
        quote_ident(unique_key),
        set_clause
    )
}
