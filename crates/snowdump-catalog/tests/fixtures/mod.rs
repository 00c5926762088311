//! Test fixtures for catalog integration tests
//!
//! A small warehouse shaped like the ones the dumper meets in practice: two
//! databases, a system schema that must never be dumped, every object kind,
//! and an overloaded function.

use snowdump_catalog::MockConnectionBuilder;
use snowdump_core::ObjectKind;

pub const ORDERS_DDL: &str = "create or replace TABLE ORDERS (\n\tID NUMBER(38,0) NOT NULL,\n\tTOTAL NUMBER(10,2)\n);";
pub const ACTIVE_ORDERS_DDL: &str = "create or replace view ACTIVE_ORDERS as select * from ORDERS where TOTAL > 0;";
pub const ADD_NUMBER_DDL: &str = "CREATE OR REPLACE FUNCTION \"ADD\"(\"A\" NUMBER, \"B\" NUMBER)\nRETURNS NUMBER\nAS 'a + b';";
pub const ADD_FLOAT_DDL: &str = "CREATE OR REPLACE FUNCTION \"ADD\"(\"A\" FLOAT, \"B\" FLOAT)\nRETURNS FLOAT\nAS 'a + b';";
pub const LOAD_DDL: &str = "CREATE OR REPLACE PROCEDURE \"LOAD\"()\nRETURNS VARCHAR\nLANGUAGE SQL\nAS 'BEGIN RETURN ''ok''; END';";
pub const ORDER_SEQ_DDL: &str = "create or replace sequence ORDER_SEQ start with 1 increment by 1;";
pub const INGEST_DDL: &str = "create or replace pipe INGEST as copy into ORDERS from @ORDERS_STAGE;";
pub const EVENTS_DDL: &str = "create or replace TABLE EVENTS (\n\tPAYLOAD VARIANT\n);";

/// `SALES.PUBLIC` with one object of every kind plus an overload,
/// `SALES.INFORMATION_SCHEMA`, and `RAW.LANDING` with a single table
pub fn sales_warehouse() -> MockConnectionBuilder {
    MockConnectionBuilder::new()
        .with_object("SALES", "PUBLIC", "ORDERS", ObjectKind::Table, "", ORDERS_DDL)
        .with_object("SALES", "PUBLIC", "ACTIVE_ORDERS", ObjectKind::View, "", ACTIVE_ORDERS_DDL)
        .with_object("SALES", "PUBLIC", "ADD", ObjectKind::Function, "(A NUMBER, B NUMBER)", ADD_NUMBER_DDL)
        .with_object("SALES", "PUBLIC", "ADD", ObjectKind::Function, "(A FLOAT, B FLOAT)", ADD_FLOAT_DDL)
        .with_object("SALES", "PUBLIC", "LOAD", ObjectKind::Procedure, "()", LOAD_DDL)
        .with_object("SALES", "PUBLIC", "ORDER_SEQ", ObjectKind::Sequence, "", ORDER_SEQ_DDL)
        .with_object("SALES", "PUBLIC", "INGEST", ObjectKind::Pipe, "", INGEST_DDL)
        .with_schema("SALES", "INFORMATION_SCHEMA")
        .with_object("RAW", "LANDING", "EVENTS", ObjectKind::Table, "", EVENTS_DDL)
}
