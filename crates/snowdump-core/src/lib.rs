//! snowdump core
//!
//! Domain model shared by the catalog, engine and CLI crates: object
//! descriptors, signature normalization, configuration, the error taxonomy
//! and the run report.

pub mod config;
pub mod error;
pub mod object;
pub mod report;
pub mod signature;

pub use config::{Config, ConfigError, DumpSettings, FailurePolicy, Target, TargetConfig};
pub use error::{DumpError, Result};
pub use object::{ObjectKind, ObjectStage, SchemaObject};
pub use report::{DumpFailure, DumpReport, FailureLocation, ReportVersion, TargetSummary};
pub use signature::normalize;
