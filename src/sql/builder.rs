//! `INSERT ... ON CONFLICT (codigo) DO NOTHING` statement builder.
//!
//! Values are inlined as escaped literals rather than bound parameters, so
//! generated statements can be written to `.sql` files and replayed later by
//! the migration executor.

use std::fmt;

use serde::Serialize;

use crate::entity::{SanitizedFieldMap, SqlValue};
use crate::error::SqlBuildError;

/// Business key every table uses as its conflict target.
pub const CONFLICT_KEY: &str = "codigo";

/// One complete SQL command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SqlStatement(String);

impl SqlStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SqlStatement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Escape a string for use inside a single-quoted SQL literal.
///
/// Quotes are doubled. If the result still holds an odd number of quotes a
/// closing quote is appended so the literal can never swallow the rest of
/// the statement.
pub fn escape_string(value: &str) -> String {
    let mut escaped = value.replace('\'', "''");
    if escaped.matches('\'').count() % 2 != 0 {
        escaped.push('\'');
    }
    escaped
}

/// Render a value as a SQL literal.
pub fn literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Text(s) => format!("'{}'", escape_string(s)),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Float(f) if f.is_finite() => f.to_string(),
        SqlValue::Float(_) => "NULL".to_string(),
    }
}

/// Build the insert statement for one sanitized record.
///
/// Null columns are left out entirely so the table default applies.
///
/// # Errors
/// [`SqlBuildError::EmptyPayload`] when every column is null.
///
/// # Example
/// ```
/// use health_ingest::entity::{SanitizedFieldMap, SqlValue};
/// use health_ingest::sql::build_insert;
///
/// let mut fields = SanitizedFieldMap::new();
/// fields.insert("codigo", SqlValue::Text("H1".into()));
/// fields.insert("nome", SqlValue::Text("Hosp d'Oeste".into()));
/// fields.insert("leitos", SqlValue::Null);
///
/// let sql = build_insert("hospitais", &fields).unwrap();
/// assert_eq!(
///     sql.as_str(),
///     "INSERT INTO hospitais (codigo, nome) VALUES ('H1', 'Hosp d''Oeste') ON CONFLICT (codigo) DO NOTHING;"
/// );
/// ```
pub fn build_insert(table: &str, fields: &SanitizedFieldMap) -> Result<SqlStatement, SqlBuildError> {
    let (columns, values): (Vec<&str>, Vec<String>) = fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(column, value)| (column, literal(value)))
        .unzip();

    if columns.is_empty() {
        return Err(SqlBuildError::EmptyPayload {
            table: table.to_string(),
        });
    }

    Ok(SqlStatement(format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING;",
        table,
        columns.join(", "),
        values.join(", "),
        CONFLICT_KEY
    )))
}
