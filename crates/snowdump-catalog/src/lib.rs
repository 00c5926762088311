//! Snowflake catalog access for DDL dumping
//!
//! This crate knows how to talk to the warehouse: it lists databases, schemas
//! and schema objects, and fetches the rendered definition of each object with
//! `GET_DDL`. Everything goes through the [`WarehouseConnection`] seam so the
//! traversal can run against [`MockConnection`] in tests.
//!
//! ## Features
//!
//! - `snowflake` - compile the Snowflake SQL API client
//!
//! ## Example
//!
//! ```rust,ignore
//! use snowdump_catalog::{CatalogEnumerator, DdlRetriever, SnowflakeConnection};
//!
//! let connection = Arc::new(SnowflakeConnection::with_password("xy12345", "user", "pass").build()?);
//! let enumerator = CatalogEnumerator::new(connection.clone());
//! for database in enumerator.list_databases().await? {
//!     println!("{database}");
//! }
//! ```

pub mod adapter;
pub mod enumerator;
pub mod mock;
pub mod queries;
pub mod retriever;
pub mod snowflake;

pub use adapter::{Connector, ObjectIdentifier, QueryError, Row, WarehouseConnection};
pub use enumerator::CatalogEnumerator;
pub use mock::{MockConnection, MockConnectionBuilder, MockConnector};
pub use retriever::DdlRetriever;
pub use snowflake::{SnowflakeConnection, SnowflakeConnectionBuilder, SnowflakeConnector};
