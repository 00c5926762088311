//! Catalog SQL text
//!
//! Database and schema names are interpolated rather than bound: they only
//! ever come from a previous `SHOW` result, never from user input. Quotes are
//! still escaped so odd names produce valid SQL.

use snowdump_core::SchemaObject;

use crate::adapter::{quote_ident, quote_literal, ObjectIdentifier};

/// Per-database system catalog schema, never dumped
pub const SYSTEM_SCHEMA: &str = "INFORMATION_SCHEMA";

/// Column holding the object name in `SHOW` output
pub const SHOW_NAME_COLUMN: &str = "name";

pub fn show_databases() -> String {
    "SHOW DATABASES".to_string()
}

pub fn show_schemas(database: &str) -> String {
    format!("SHOW SCHEMAS IN DATABASE {}", quote_ident(database))
}

/// One query returning `NAME, ARGUMENT_SIGNATURE, TYPE` for every dumpable
/// object in a schema
pub fn list_objects(database: &str, schema: &str) -> String {
    let db = quote_ident(database);
    let schema = quote_literal(schema);

    format!(
        r#"SELECT TABLE_NAME AS NAME, '' AS ARGUMENT_SIGNATURE, 'TABLE' AS TYPE
FROM {db}.INFORMATION_SCHEMA.TABLES
WHERE TABLE_SCHEMA = {schema} AND TABLE_TYPE = 'BASE TABLE'
UNION ALL
SELECT TABLE_NAME, '', 'VIEW'
FROM {db}.INFORMATION_SCHEMA.VIEWS
WHERE TABLE_SCHEMA = {schema}
UNION ALL
SELECT FUNCTION_NAME, ARGUMENT_SIGNATURE, 'FUNCTION'
FROM {db}.INFORMATION_SCHEMA.FUNCTIONS
WHERE FUNCTION_SCHEMA = {schema}
UNION ALL
SELECT PROCEDURE_NAME, ARGUMENT_SIGNATURE, 'PROCEDURE'
FROM {db}.INFORMATION_SCHEMA.PROCEDURES
WHERE PROCEDURE_SCHEMA = {schema}
UNION ALL
SELECT SEQUENCE_NAME, '', 'SEQUENCE'
FROM {db}.INFORMATION_SCHEMA.SEQUENCES
WHERE SEQUENCE_SCHEMA = {schema}
UNION ALL
SELECT PIPE_NAME, '', 'PIPE'
FROM {db}.INFORMATION_SCHEMA.PIPES
WHERE PIPE_SCHEMA = {schema}"#
    )
}

/// `GET_DDL` call for one object. Callables are addressed by name plus
/// type-only signature, e.g. `"DB"."S"."F"(NUMBER)`.
pub fn get_ddl(database: &str, schema: &str, object: &SchemaObject) -> String {
    let identity = format!(
        "{}{}",
        ObjectIdentifier::new(database, schema, &object.name).quoted(),
        object.signature
    );

    format!(
        "SELECT GET_DDL({}, {}, TRUE)",
        quote_literal(object.kind.as_str()),
        quote_literal(&identity)
    )
}
