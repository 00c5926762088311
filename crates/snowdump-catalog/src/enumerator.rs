//! Catalog enumeration: databases, schemas, and the objects in a schema

use snowdump_core::{DumpError, ObjectKind, SchemaObject};
use std::sync::Arc;

use crate::adapter::{Row, WarehouseConnection};
use crate::queries;

/// Lists catalog contents over an open connection
#[derive(Clone)]
pub struct CatalogEnumerator {
    connection: Arc<dyn WarehouseConnection>,
}

impl CatalogEnumerator {
    pub fn new(connection: Arc<dyn WarehouseConnection>) -> Self {
        Self { connection }
    }

    /// All databases visible to the session
    pub async fn list_databases(&self) -> Result<Vec<String>, DumpError> {
        let rows = self
            .connection
            .query(&queries::show_databases())
            .await
            .map_err(|e| DumpError::enumeration("list_databases", "account", e))?;

        names_from_show(&rows).map_err(|e| DumpError::enumeration("list_databases", "account", e))
    }

    /// All schemas in `database`, the system schema included.
    ///
    /// Skipping [`queries::SYSTEM_SCHEMA`] is the caller's traversal policy.
    pub async fn list_schemas(&self, database: &str) -> Result<Vec<String>, DumpError> {
        let location = format!("[{}]", database);
        let rows = self
            .connection
            .query(&queries::show_schemas(database))
            .await
            .map_err(|e| DumpError::enumeration("list_schemas", location.clone(), e))?;

        names_from_show(&rows).map_err(|e| DumpError::enumeration("list_schemas", location, e))
    }

    /// Every dumpable object in `database.schema`, in catalog order, with
    /// normalized signatures
    pub async fn list_objects(&self, database: &str, schema: &str) -> Result<Vec<SchemaObject>, DumpError> {
        let location = format!("[{}].[{}]", database, schema);
        let rows = self
            .connection
            .query(&queries::list_objects(database, schema))
            .await
            .map_err(|e| DumpError::enumeration("list_objects", location.clone(), e))?;

        rows.iter()
            .map(object_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DumpError::enumeration("list_objects", location, e))
    }
}

fn names_from_show(rows: &[Row]) -> Result<Vec<String>, String> {
    rows.iter()
        .map(|row| {
            row.get(queries::SHOW_NAME_COLUMN)
                .map(str::to_string)
                .ok_or_else(|| format!("row without a `{}` column", queries::SHOW_NAME_COLUMN))
        })
        .collect()
}

fn object_from_row(row: &Row) -> Result<SchemaObject, String> {
    let name = row.get("NAME").ok_or("row without NAME")?;
    let kind: ObjectKind = row
        .get("TYPE")
        .ok_or("row without TYPE")?
        .parse()
        .map_err(|e: snowdump_core::object::UnknownObjectKind| e.to_string())?;
    let signature = row.get("ARGUMENT_SIGNATURE").unwrap_or_default();

    Ok(SchemaObject::new(name, kind, signature))
}
