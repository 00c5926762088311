//! Error taxonomy for a dump run
//!
//! Every variant is fatal under the default fail-fast policy. Under the
//! best-effort policy the orchestrator records them in the report instead.

use std::path::PathBuf;

use crate::object::ObjectKind;

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// Missing or invalid target configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Target unreachable or credentials rejected
    #[error("Cannot connect to target [{target}]: {message}")]
    Connect { target: String, message: String },

    /// A listing query failed
    #[error("Enumeration failed ({operation} in {location}): {message}")]
    Enumeration {
        operation: &'static str,
        location: String,
        message: String,
    },

    /// A definition fetch failed or returned nothing
    #[error("Cannot retrieve DDL for {kind} {object}: {message}")]
    Retrieval {
        object: String,
        kind: ObjectKind,
        message: String,
    },

    /// A database/schema/target folder already exists
    #[error("Folder [{}] already present", .0.display())]
    FolderAlreadyExists(PathBuf),

    /// Writing a definition file failed
    #[error("Cannot write [{}]: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating an output folder failed
    #[error("Cannot create folder [{}]: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A spawned dump task panicked or was cancelled
    #[error("Dump task failed: {0}")]
    Task(String),
}

impl DumpError {
    pub fn enumeration(
        operation: &'static str,
        location: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Enumeration {
            operation,
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn retrieval(object: impl Into<String>, kind: ObjectKind, message: impl std::fmt::Display) -> Self {
        Self::Retrieval {
            object: object.into(),
            kind,
            message: message.to_string(),
        }
    }

    /// Short stable label, used in reports
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Connect { .. } => "connect",
            Self::Enumeration { .. } => "enumeration",
            Self::Retrieval { .. } => "retrieval",
            Self::FolderAlreadyExists(_) => "folder_already_exists",
            Self::Write { .. } => "write",
            Self::Io { .. } => "io",
            Self::Task(_) => "task",
        }
    }
}

pub type Result<T, E = DumpError> = std::result::Result<T, E>;
