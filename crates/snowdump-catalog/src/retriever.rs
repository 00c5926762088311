//! DDL retrieval through `GET_DDL`

use snowdump_core::{DumpError, SchemaObject};
use std::sync::Arc;

use crate::adapter::{ObjectIdentifier, WarehouseConnection};
use crate::queries;

/// Fetches the rendered definition of single objects
#[derive(Clone)]
pub struct DdlRetriever {
    connection: Arc<dyn WarehouseConnection>,
}

impl DdlRetriever {
    pub fn new(connection: Arc<dyn WarehouseConnection>) -> Self {
        Self { connection }
    }

    /// Definition text of `database.schema.object`, verbatim.
    ///
    /// A missing row or NULL value is an error: an empty definition would be
    /// indistinguishable from a failed fetch.
    pub async fn fetch_definition(
        &self,
        database: &str,
        schema: &str,
        object: &SchemaObject,
    ) -> Result<String, DumpError> {
        let identity = format!(
            "{}{}",
            ObjectIdentifier::new(database, schema, &object.name).quoted(),
            object.signature
        );

        let rows = self
            .connection
            .query(&queries::get_ddl(database, schema, object))
            .await
            .map_err(|e| DumpError::retrieval(identity.clone(), object.kind, e))?;

        let row = rows
            .first()
            .ok_or_else(|| DumpError::retrieval(identity.clone(), object.kind, "no row returned"))?;

        row.get_index(0)
            .map(str::to_string)
            .ok_or_else(|| DumpError::retrieval(identity, object.kind, "NULL definition returned"))
    }
}
