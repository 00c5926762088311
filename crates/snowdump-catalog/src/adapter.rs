//! Warehouse connection seam
//!
//! The dump pipeline only needs "run this SQL text, give me rows back". Drivers
//! hide their wire format behind [`WarehouseConnection`] and hand back plain
//! text [`Row`]s.

use snowdump_core::Target;
use std::fmt;
use std::sync::Arc;

/// One result row with its column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Option<String>>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Option<String>>) -> Self {
        Self { columns, values }
    }

    /// Build a row from literal column/value pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let (columns, values): (Vec<String>, Vec<Option<String>>) = pairs
            .into_iter()
            .map(|(column, value)| (column.to_string(), value.map(str::to_string)))
            .unzip();
        Self::new(columns.into(), values)
    }

    /// Value of a column, matched case-insensitively (`SHOW` output is
    /// lower-case, `SELECT` aliases are upper-case)
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.get_index(idx)
    }

    pub fn get_index(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Identifies an object in a warehouse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentifier {
    /// Database name
    pub database: String,

    /// Schema name
    pub schema: String,

    /// Object name
    pub name: String,
}

impl ObjectIdentifier {
    pub fn new(database: impl Into<String>, schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Get fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.name)
    }

    /// Fully qualified name with every part double-quoted, e.g. `"DB"."S"."T"`
    pub fn quoted(&self) -> String {
        format!(
            "{}.{}.{}",
            quote_ident(&self.database),
            quote_ident(&self.schema),
            quote_ident(&self.name)
        )
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quote a string literal, doubling embedded quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Errors raised by a connection
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// An open, query-executing session against one target.
///
/// Implementations must tolerate concurrent `query` calls from several tasks:
/// the orchestrator shares one connection across all of a target's work.
#[async_trait::async_trait]
pub trait WarehouseConnection: Send + Sync {
    /// Get the driver name (e.g., "Snowflake")
    fn name(&self) -> &'static str;

    /// Run one statement and collect all rows
    async fn query(&self, sql: &str) -> Result<Vec<Row>, QueryError>;

    /// Test the connection to the warehouse
    ///
    /// This is useful for validating credentials before any dump work starts.
    async fn test_connection(&self) -> Result<(), QueryError>;

    /// End the session. Queries issued afterwards fail.
    async fn close(&self) -> Result<(), QueryError> {
        Ok(())
    }
}

/// Opens connections for configured targets
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn WarehouseConnection>, QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_identifier() {
        let object = ObjectIdentifier::new("ANALYTICS", "PUBLIC", "ORDERS");
        assert_eq!(object.fqn(), "ANALYTICS.PUBLIC.ORDERS");
        assert_eq!(object.to_string(), "ANALYTICS.PUBLIC.ORDERS");
        assert_eq!(object.quoted(), "\"ANALYTICS\".\"PUBLIC\".\"ORDERS\"");
    }

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_ident("MY\"DB"), "\"MY\"\"DB\"");
        assert_eq!(quote_literal("O'HARA"), "'O''HARA'");
    }

    #[test]
    fn row_lookup_ignores_case() {
        let row = Row::from_pairs([("name", Some("DB1")), ("comment", None)]);
        assert_eq!(row.get("NAME"), Some("DB1"));
        assert_eq!(row.get("comment"), None);
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_index(0), Some("DB1"));
        assert_eq!(row.len(), 2);
    }
}
