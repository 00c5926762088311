//! Run report (report.json)
//!
//! Versioned like any other machine-readable output: breaking changes require
//! a new major version.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::DumpError;
use crate::object::{ObjectKind, ObjectStage};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Where in the hierarchy a failure happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureLocation {
    pub target: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ObjectKind>,
}

impl FailureLocation {
    pub fn target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            database: None,
            schema: None,
            object: None,
            kind: None,
        }
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn object(mut self, object: impl Into<String>, kind: ObjectKind) -> Self {
        self.object = Some(object.into());
        self.kind = Some(kind);
        self
    }
}

impl std::fmt::Display for FailureLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.target)?;
        for part in [&self.database, &self.schema, &self.object].into_iter().flatten() {
            write!(f, ".[{}]", part)?;
        }
        if let Some(kind) = self.kind {
            write!(f, " ({})", kind)?;
        }
        Ok(())
    }
}

/// One recorded failure (best-effort runs, or the fatal error of a fail-fast run)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpFailure {
    pub location: FailureLocation,

    /// Last stage the object reached before failing, for object-level failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<ObjectStage>,

    /// Stable error category, see [`DumpError::category`]
    pub category: String,

    pub message: String,
}

impl DumpFailure {
    pub fn new(location: FailureLocation, stage: Option<ObjectStage>, error: &DumpError) -> Self {
        Self {
            location,
            stage,
            category: error.category().to_string(),
            message: error.to_string(),
        }
    }
}

/// Totals for one target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub name: String,

    /// Folder holding this target's DDL tree
    pub output_folder: PathBuf,

    pub databases: usize,
    pub schemas: usize,
    pub objects_written: usize,

    /// Files that got a `_duplicate<ts>` suffix
    pub duplicates: usize,

    pub failures: usize,
}

impl TargetSummary {
    pub fn new(name: impl Into<String>, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            output_folder: output_folder.into(),
            ..Self::default()
        }
    }
}

/// Report for a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Output root of the run
    pub output_root: PathBuf,

    pub targets: Vec<TargetSummary>,

    pub failures: Vec<DumpFailure>,
}

impl DumpReport {
    /// Create a new empty report
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            output_root: output_root.into(),
            targets: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Add a finished target and its failures
    pub fn add_target(&mut self, mut summary: TargetSummary, failures: Vec<DumpFailure>) {
        summary.failures = failures.len();
        self.targets.push(summary);
        self.failures.extend(failures);
    }

    /// Record a failure not tied to a finished target (e.g. a fail-fast abort)
    pub fn add_failure(&mut self, failure: DumpFailure) {
        self.failures.push(failure);
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn objects_written(&self) -> usize {
        self.targets.iter().map(|t| t.objects_written).sum()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str, written: usize) -> TargetSummary {
        TargetSummary {
            objects_written: written,
            ..TargetSummary::new(name, format!("/tmp/out/{}", name))
        }
    }

    #[test]
    fn empty_report() {
        let report = DumpReport::new("/tmp/out");
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert!(!report.has_failures());
        assert_eq!(report.objects_written(), 0);
    }

    #[test]
    fn targets_and_failures_are_totalled() {
        let mut report = DumpReport::new("/tmp/out");
        let error = DumpError::retrieval("\"DB\".\"S\".\"V\"", ObjectKind::View, "no row returned");
        let failure = DumpFailure::new(
            FailureLocation::target("prod").database("DB").schema("S").object("V", ObjectKind::View),
            Some(ObjectStage::SignatureNormalized),
            &error,
        );

        report.add_target(summary("prod", 3), vec![failure]);
        report.add_target(summary("dev", 2), Vec::new());

        assert_eq!(report.objects_written(), 5);
        assert_eq!(report.targets[0].failures, 1);
        assert_eq!(report.targets[1].failures, 0);
        assert!(report.has_failures());
        assert_eq!(report.failures[0].category, "retrieval");
    }

    #[test]
    fn location_display() {
        let location = FailureLocation::target("prod")
            .database("DB")
            .schema("S")
            .object("F(NUMBER)", ObjectKind::Function);
        assert_eq!(location.to_string(), "[prod].[DB].[S].[F(NUMBER)] (FUNCTION)");
        assert_eq!(FailureLocation::target("prod").database("DB").to_string(), "[prod].[DB]");
    }

    #[test]
    fn report_serialization() {
        let mut report = DumpReport::new("/tmp/out");
        report.add_target(summary("prod", 1), Vec::new());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"objects_written\": 1"));

        let parsed: DumpReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        DumpReport::new(dir.path()).save_to_file(&path).unwrap();
        assert!(path.exists());
    }
}
