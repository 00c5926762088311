//! Mock warehouse connection for testing
//!
//! This connection answers the catalog queries of [`crate::queries`] from an
//! in-memory catalog, without connecting to any warehouse. It's useful for:
//! - Unit testing enumeration and retrieval
//! - End-to-end testing of the dump pipeline
//! - Simulating failures at any single query
//!
//! ## Usage
//!
//! ```rust,ignore
//! use snowdump_catalog::{MockConnection, WarehouseConnection};
//! use snowdump_core::ObjectKind;
//!
//! let connection = MockConnection::builder()
//!     .with_object("DB", "PUBLIC", "ORDERS", ObjectKind::Table, "", "create table ORDERS ...")
//!     .with_object("DB", "PUBLIC", "F", ObjectKind::Function, "(A NUMBER)", "create function F ...")
//!     .build();
//!
//! let rows = connection.query("SHOW DATABASES").await?;
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! let connection = MockConnection::builder()
//!     .with_schema("DB", "PUBLIC")
//!     .with_query_failure(queries::show_schemas("DB"), QueryError::PermissionDenied("...".into()))
//!     .with_query_delay(queries::show_databases(), 100) // 100ms before answering
//!     .build();
//! ```

use crate::adapter::{Connector, QueryError, Row, WarehouseConnection};
use crate::queries;
use snowdump_core::{ObjectKind, SchemaObject, Target};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Mock warehouse connection
///
/// Responses are keyed by exact SQL text, so the catalog is rendered through
/// the same query builders the enumerator and retriever use. Clones share
/// state.
#[derive(Clone)]
pub struct MockConnection {
    /// Rows returned per SQL statement
    responses: Arc<RwLock<HashMap<String, Vec<Row>>>>,

    /// Errors returned per SQL statement, checked before responses
    errors: Arc<RwLock<HashMap<String, QueryError>>>,

    /// Extra delay per SQL statement (milliseconds)
    delays: Arc<HashMap<String, u64>>,

    /// Every statement received, in arrival order
    query_log: Arc<Mutex<Vec<String>>>,

    closed: Arc<AtomicBool>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,

    /// Name to return from name() method
    adapter_name: &'static str,
}

impl MockConnection {
    /// Create a mock connection with an empty catalog
    pub fn new() -> Self {
        MockConnectionBuilder::new().build()
    }

    pub fn builder() -> MockConnectionBuilder {
        MockConnectionBuilder::new()
    }

    /// Answer `sql` with `rows`
    pub async fn add_rows(&self, sql: impl Into<String>, rows: Vec<Row>) {
        self.responses.write().await.insert(sql.into(), rows);
    }

    /// Fail `sql` with `error`
    pub async fn add_error(&self, sql: impl Into<String>, error: QueryError) {
        self.errors.write().await.insert(sql.into(), error);
    }

    /// Clear all stored errors
    pub async fn clear_errors(&self) {
        self.errors.write().await.clear();
    }

    /// Statements received so far
    pub fn queries(&self) -> Vec<String> {
        self.query_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// How many times `sql` was received
    pub fn query_count(&self, sql: &str) -> usize {
        self.queries().iter().filter(|q| q.as_str() == sql).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Simulate latency if configured
    async fn simulate_latency(&self, sql: &str) {
        let delay = self.latency_ms + self.delays.get(sql).copied().unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WarehouseConnection for MockConnection {
    fn name(&self) -> &'static str {
        self.adapter_name
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, QueryError> {
        if let Ok(mut log) = self.query_log.lock() {
            log.push(sql.to_string());
        }

        if self.is_closed() {
            return Err(QueryError::ConfigError("connection closed".to_string()));
        }

        self.simulate_latency(sql).await;

        // Check for configured errors first
        if let Some(error) = self.errors.read().await.get(sql) {
            return Err(error.clone());
        }

        self.responses
            .read()
            .await
            .get(sql)
            .cloned()
            .ok_or_else(|| QueryError::QueryError(format!("unexpected query: {}", sql)))
    }

    async fn test_connection(&self) -> Result<(), QueryError> {
        if self.fail_connection {
            Err(QueryError::NetworkError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn close(&self) -> Result<(), QueryError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MockObject {
    name: String,
    kind: ObjectKind,
    raw_signature: String,
    ddl: Option<String>,
}

struct MockSchema {
    name: String,
    objects: Vec<MockObject>,
}

struct MockDatabase {
    name: String,
    schemas: Vec<MockSchema>,
}

/// Builder for a MockConnection with an in-memory catalog
///
/// Databases, schemas and objects are listed in insertion order. Adding a
/// schema or object creates its parents.
pub struct MockConnectionBuilder {
    databases: Vec<MockDatabase>,
    errors: HashMap<String, QueryError>,
    delays: HashMap<String, u64>,
    fail_connection: bool,
    latency_ms: u64,
    adapter_name: &'static str,
}

impl MockConnectionBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            databases: Vec::new(),
            errors: HashMap::new(),
            delays: HashMap::new(),
            fail_connection: false,
            latency_ms: 0,
            adapter_name: "Mock",
        }
    }

    fn database_mut(&mut self, database: &str) -> &mut MockDatabase {
        let idx = match self.databases.iter().position(|d| d.name == database) {
            Some(idx) => idx,
            None => {
                self.databases.push(MockDatabase {
                    name: database.to_string(),
                    schemas: Vec::new(),
                });
                self.databases.len() - 1
            }
        };
        &mut self.databases[idx]
    }

    fn schema_mut(&mut self, database: &str, schema: &str) -> &mut MockSchema {
        let db = self.database_mut(database);
        let idx = match db.schemas.iter().position(|s| s.name == schema) {
            Some(idx) => idx,
            None => {
                db.schemas.push(MockSchema {
                    name: schema.to_string(),
                    objects: Vec::new(),
                });
                db.schemas.len() - 1
            }
        };
        &mut db.schemas[idx]
    }

    /// Add an (initially empty) database
    pub fn with_database(mut self, database: &str) -> Self {
        self.database_mut(database);
        self
    }

    /// Add an (initially empty) schema
    pub fn with_schema(mut self, database: &str, schema: &str) -> Self {
        self.schema_mut(database, schema);
        self
    }

    /// Add an object and the definition `GET_DDL` returns for it
    pub fn with_object(
        mut self,
        database: &str,
        schema: &str,
        name: &str,
        kind: ObjectKind,
        raw_signature: &str,
        ddl: &str,
    ) -> Self {
        self.schema_mut(database, schema).objects.push(MockObject {
            name: name.to_string(),
            kind,
            raw_signature: raw_signature.to_string(),
            ddl: Some(ddl.to_string()),
        });
        self
    }

    /// Add an object that is listed but for which `GET_DDL` returns no row
    pub fn with_listed_object(
        mut self,
        database: &str,
        schema: &str,
        name: &str,
        kind: ObjectKind,
        raw_signature: &str,
    ) -> Self {
        self.schema_mut(database, schema).objects.push(MockObject {
            name: name.to_string(),
            kind,
            raw_signature: raw_signature.to_string(),
            ddl: None,
        });
        self
    }

    /// Fail one statement
    pub fn with_query_failure(mut self, sql: impl Into<String>, error: QueryError) -> Self {
        self.errors.insert(sql.into(), error);
        self
    }

    /// Delay the answer to one statement
    pub fn with_query_delay(mut self, sql: impl Into<String>, delay_ms: u64) -> Self {
        self.delays.insert(sql.into(), delay_ms);
        self
    }

    /// Configure connection failure
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure latency for every statement
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set adapter name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.adapter_name = name;
        self
    }

    /// Build the MockConnection
    pub fn build(self) -> MockConnection {
        let mut responses = HashMap::new();

        let databases = self
            .databases
            .iter()
            .map(|db| show_row(&db.name))
            .collect();
        responses.insert(queries::show_databases(), databases);

        for db in &self.databases {
            let schemas = db.schemas.iter().map(|s| show_row(&s.name)).collect();
            responses.insert(queries::show_schemas(&db.name), schemas);

            for schema in &db.schemas {
                let mut rows = Vec::with_capacity(schema.objects.len());
                for object in &schema.objects {
                    rows.push(Row::from_pairs([
                        ("NAME", Some(object.name.as_str())),
                        ("ARGUMENT_SIGNATURE", Some(object.raw_signature.as_str())),
                        ("TYPE", Some(object.kind.as_str())),
                    ]));

                    let descriptor = SchemaObject::new(&object.name, object.kind, &object.raw_signature);
                    let ddl_rows = match &object.ddl {
                        Some(ddl) => vec![Row::from_pairs([("DDL", Some(ddl.as_str()))])],
                        None => Vec::new(),
                    };
                    responses.insert(queries::get_ddl(&db.name, &schema.name, &descriptor), ddl_rows);
                }
                responses.insert(queries::list_objects(&db.name, &schema.name), rows);
            }
        }

        MockConnection {
            responses: Arc::new(RwLock::new(responses)),
            errors: Arc::new(RwLock::new(self.errors)),
            delays: Arc::new(self.delays),
            query_log: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            adapter_name: self.adapter_name,
        }
    }
}

impl Default for MockConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `SHOW` output row; the real output has more columns, only `name` is read
fn show_row(name: &str) -> Row {
    Row::from_pairs([
        ("created_on", Some("2024-01-01 00:00:00.000 -0800")),
        (queries::SHOW_NAME_COLUMN, Some(name)),
        ("comment", None),
    ])
}

/// Connector handing out mock connections by target name
#[derive(Clone, Default)]
pub struct MockConnector {
    connections: HashMap<String, MockConnection>,
    unreachable: HashSet<String>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, name: &str, connection: MockConnection) -> Self {
        self.connections.insert(name.to_string(), connection);
        self
    }

    /// Reject connections to `name` as if the credentials were wrong
    pub fn with_unreachable_target(mut self, name: &str) -> Self {
        self.unreachable.insert(name.to_string());
        self
    }

    /// Target names passed to `connect`, in call order
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn WarehouseConnection>, QueryError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(target.name.clone());
        }

        if self.unreachable.contains(&target.name) {
            return Err(QueryError::AuthenticationError(format!(
                "Incorrect username or password for {}",
                target.settings.account
            )));
        }

        let connection = self.connections.get(&target.name).cloned().ok_or_else(|| {
            QueryError::AuthenticationError(format!("no mock registered for target {}", target.name))
        })?;
        connection.test_connection().await?;

        Ok(Arc::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connection_answers_catalog_queries() {
        let connection = MockConnection::builder()
            .with_object("DB", "S", "T", ObjectKind::Table, "", "create table T (id int)")
            .build();

        let databases = connection.query(&queries::show_databases()).await.unwrap();
        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0].get("name"), Some("DB"));

        let objects = connection.query(&queries::list_objects("DB", "S")).await.unwrap();
        assert_eq!(objects[0].get("TYPE"), Some("TABLE"));

        let ddl = connection
            .query(&queries::get_ddl("DB", "S", &SchemaObject::plain("T", ObjectKind::Table)))
            .await
            .unwrap();
        assert_eq!(ddl[0].get_index(0), Some("create table T (id int)"));
    }

    #[tokio::test]
    async fn test_mock_connection_unexpected_query() {
        let connection = MockConnection::new();
        let result = connection.query("SELECT 42").await;
        assert!(matches!(result, Err(QueryError::QueryError(_))));
    }

    #[tokio::test]
    async fn test_mock_connection_failure() {
        let connection = MockConnection::builder().with_connection_failure().build();
        assert!(matches!(
            connection.test_connection().await,
            Err(QueryError::NetworkError(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_connection_injected_error() {
        let connection = MockConnection::builder().with_database("DB").build();
        connection
            .add_error(queries::show_schemas("DB"), QueryError::NotFound("DB".to_string()))
            .await;

        assert!(connection.query(&queries::show_schemas("DB")).await.is_err());
        connection.clear_errors().await;
        assert!(connection.query(&queries::show_schemas("DB")).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_connection_logs_and_closes() {
        let connection = MockConnection::builder().with_database("DB").build();
        let clone = connection.clone();

        connection.query(&queries::show_databases()).await.unwrap();
        connection.close().await.unwrap();

        assert!(clone.is_closed());
        assert!(clone.query(&queries::show_databases()).await.is_err());
        assert_eq!(clone.query_count(&queries::show_databases()), 2);
    }

    #[tokio::test]
    async fn test_mock_connection_name() {
        assert_eq!(MockConnection::new().name(), "Mock");
        assert_eq!(MockConnection::builder().with_name("Snowflake").build().name(), "Snowflake");
    }
}
