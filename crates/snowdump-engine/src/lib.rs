//! snowdump engine - the dump pipeline
//!
//! This crate turns catalog access into files on disk:
//! - Output path allocation and collision handling
//! - Concurrent per-target traversal with bounded fan-out
//! - Sequential multi-target runs and the run report

pub mod orchestrator;
pub mod paths;
pub mod run;

pub use orchestrator::{DumpOrchestrator, TargetOutcome};
pub use paths::{AllocatedPath, PathAllocator};
pub use run::DumpRun;
