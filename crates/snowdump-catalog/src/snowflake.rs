//! Snowflake connection
//!
//! Runs catalog statements (`SHOW ...`, `INFORMATION_SCHEMA` unions,
//! `GET_DDL`) over the Snowflake SQL API. It requires:
//! - USAGE on the databases and schemas to dump
//! - a role that can see the objects (`GET_DDL` only renders visible ones)
//!
//! ## Usage
//!
//! ```rust,ignore
//! let connection = SnowflakeConnection::with_password(
//!     "xy12345.us-east-1",
//!     "username",
//!     "password"
//! )
//! .with_warehouse("COMPUTE_WH")
//! .with_role("SYSADMIN")
//! .build()?;
//! ```
//!
//! One session is shared by every task dumping the target. The SQL API
//! executes each statement as an independent request, so concurrent `query`
//! calls are safe; the orchestrator bounds how many run at once.
//!
//! Reference: https://docs.snowflake.com/en/sql-reference/functions/get_ddl

use crate::adapter::{Connector, QueryError, Row, WarehouseConnection};
use snowdump_core::Target;
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(feature = "snowflake")]
use snowflake_api::{QueryResult, SnowflakeApi};

#[cfg(feature = "snowflake")]
use arrow_array::cast::AsArray;

#[cfg(feature = "snowflake")]
use arrow_array::{Array, ArrayRef};

#[cfg(feature = "snowflake")]
use arrow_cast::display::{ArrayFormatter, FormatOptions};

#[cfg(feature = "snowflake")]
use arrow_schema::DataType;

/// Builder for SnowflakeConnection
pub struct SnowflakeConnectionBuilder {
    account: String,
    username: String,
    password: String,
    warehouse: Option<String>,
    role: Option<String>,
    database: Option<String>,
    schema: Option<String>,
}

impl SnowflakeConnectionBuilder {
    /// Create new builder with password authentication
    pub fn with_password(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            password: password.into(),
            warehouse: None,
            role: None,
            database: None,
            schema: None,
        }
    }

    /// Set the warehouse to use
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Set the role to use
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the default database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the default schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Build the connection
    #[cfg(feature = "snowflake")]
    pub fn build(self) -> Result<SnowflakeConnection, QueryError> {
        let api = SnowflakeApi::with_password_auth(
            &self.account,
            self.warehouse.as_deref(),
            self.database.as_deref(),
            self.schema.as_deref(),
            &self.username,
            self.role.as_deref(),
            &self.password,
        )
        .map_err(|e| QueryError::AuthenticationError(format!(
            "Failed to authenticate with Snowflake: {}",
            e
        )))?;

        Ok(SnowflakeConnection {
            api: RwLock::new(Some(api)),
            account: self.account,
        })
    }

    /// Build without snowflake feature
    #[cfg(not(feature = "snowflake"))]
    pub fn build(self) -> Result<SnowflakeConnection, QueryError> {
        Err(QueryError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }
}

/// Snowflake warehouse connection
pub struct SnowflakeConnection {
    /// `None` once closed
    #[cfg(feature = "snowflake")]
    api: RwLock<Option<SnowflakeApi>>,

    #[cfg(not(feature = "snowflake"))]
    api: RwLock<Option<()>>,

    account: String,
}

impl SnowflakeConnection {
    /// Create a new Snowflake connection with password authentication (returns builder)
    pub fn with_password(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SnowflakeConnectionBuilder {
        SnowflakeConnectionBuilder::with_password(account, username, password)
    }

    /// Account identifier this connection was opened for
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Sort a driver error into the taxonomy by its message
    pub fn classify_error(message: &str) -> QueryError {
        let message = message.to_string();
        if message.contains("does not exist") || message.contains("not found") {
            QueryError::NotFound(message)
        } else if message.contains("Insufficient privileges") || message.contains("Permission") {
            QueryError::PermissionDenied(message)
        } else if message.contains("Incorrect username or password") {
            QueryError::AuthenticationError(message)
        } else {
            QueryError::QueryError(message)
        }
    }
}

#[cfg(feature = "snowflake")]
fn rows_from_result(result: QueryResult) -> Result<Vec<Row>, QueryError> {
    let mut rows = Vec::new();

    match result {
        QueryResult::Arrow(batches) => {
            for batch in batches {
                let columns: Arc<[String]> = batch
                    .schema()
                    .fields()
                    .iter()
                    .map(|field| field.name().clone())
                    .collect();

                for row_idx in 0..batch.num_rows() {
                    let values = batch
                        .columns()
                        .iter()
                        .map(|column| text_value(column, row_idx))
                        .collect::<Result<Vec<_>, _>>()?;
                    rows.push(Row::new(Arc::clone(&columns), values));
                }
            }
        }
        QueryResult::Json(json) => {
            // SHOW commands come back as JSON: an array of rows, each an array of cells
            let columns: Arc<[String]> = json.schema.iter().map(|field| field.name.clone()).collect();
            let records = json.value.as_array().ok_or_else(|| {
                QueryError::InvalidResponse("JSON result is not an array of rows".to_string())
            })?;

            for record in records {
                let cells = record.as_array().ok_or_else(|| {
                    QueryError::InvalidResponse("JSON row is not an array".to_string())
                })?;
                let values = cells
                    .iter()
                    .map(|cell| match cell {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                    .collect();
                rows.push(Row::new(Arc::clone(&columns), values));
            }
        }
        QueryResult::Empty => {}
    }

    Ok(rows)
}

#[cfg(feature = "snowflake")]
fn text_value(column: &ArrayRef, row_idx: usize) -> Result<Option<String>, QueryError> {
    if column.is_null(row_idx) {
        return Ok(None);
    }

    match column.data_type() {
        DataType::Utf8 => Ok(Some(column.as_string::<i32>().value(row_idx).to_string())),
        DataType::LargeUtf8 => Ok(Some(column.as_string::<i64>().value(row_idx).to_string())),
        // Numbers, booleans and timestamps are rendered the way Arrow prints them
        other => {
            let formatter = ArrayFormatter::try_new(column.as_ref(), &FormatOptions::default())
                .map_err(|e| QueryError::InvalidResponse(format!(
                    "cannot render {} column: {}",
                    other, e
                )))?;
            Ok(Some(formatter.value(row_idx).to_string()))
        }
    }
}

#[async_trait::async_trait]
impl WarehouseConnection for SnowflakeConnection {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn query(&self, sql: &str) -> Result<Vec<Row>, QueryError> {
        let guard = self.api.read().await;
        let api = guard
            .as_ref()
            .ok_or_else(|| QueryError::ConfigError("connection closed".to_string()))?;

        let result = api
            .exec(sql)
            .await
            .map_err(|e| Self::classify_error(&e.to_string()))?;

        rows_from_result(result)
    }

    #[cfg(not(feature = "snowflake"))]
    async fn query(&self, _sql: &str) -> Result<Vec<Row>, QueryError> {
        Err(QueryError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }

    /// Runs `SELECT 1` and ignores the payload
    #[cfg(feature = "snowflake")]
    async fn test_connection(&self) -> Result<(), QueryError> {
        let guard = self.api.read().await;
        let api = guard
            .as_ref()
            .ok_or_else(|| QueryError::ConfigError("connection closed".to_string()))?;

        api.exec("SELECT 1")
            .await
            .map_err(|e| QueryError::NetworkError(format!("Connection test failed: {}", e)))?;
        Ok(())
    }

    #[cfg(not(feature = "snowflake"))]
    async fn test_connection(&self) -> Result<(), QueryError> {
        Err(QueryError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }

    async fn close(&self) -> Result<(), QueryError> {
        // Dropping the client ends the session
        self.api.write().await.take();
        Ok(())
    }
}

/// Opens a [`SnowflakeConnection`] per target and checks it before use
#[derive(Debug, Clone, Copy, Default)]
pub struct SnowflakeConnector;

#[async_trait::async_trait]
impl Connector for SnowflakeConnector {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn WarehouseConnection>, QueryError> {
        let settings = &target.settings;
        let connection = SnowflakeConnection::with_password(
            &settings.account,
            &settings.user,
            &settings.password,
        )
        .with_warehouse(&settings.warehouse)
        .with_role(&settings.role)
        .with_database(&settings.database)
        .with_schema(&settings.schema)
        .build()?;

        connection.test_connection().await?;
        tracing::debug!(target = %target.name, account = %connection.account(), "Snowflake session opened");

        Ok(Arc::new(connection))
    }
}
