//! Batch report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

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

/// How a single file ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Converted SQL was written
    Converted,

    /// A diagnostic file was written in place of the converted SQL
    Failed { message: String },

    /// Conversion failed and the diagnostic could not be written either
    Unwritable { message: String },
}

/// Outcome for one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self.status, FileStatus::Converted)
    }
}

/// Summary statistics for a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Files attempted
    pub total: usize,

    /// Files converted successfully
    pub converted: usize,

    /// Files replaced by a diagnostic
    pub failed: usize,

    /// Files for which nothing could be written
    pub unwritable: usize,
}

/// Batch conversion report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    pub input_root: PathBuf,
    pub output_root: PathBuf,

    /// Summary statistics
    pub summary: BatchSummary,

    /// Per-file outcomes, sorted by input path
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    /// Create a new empty report
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            input_root: input_root.into(),
            output_root: output_root.into(),
            summary: BatchSummary::default(),
            files: Vec::new(),
        }
    }

    /// Record a file outcome
    pub fn add_outcome(&mut self, outcome: FileOutcome) {
        match outcome.status {
            FileStatus::Converted => self.summary.converted += 1,
            FileStatus::Failed { .. } => self.summary.failed += 1,
            FileStatus::Unwritable { .. } => self.summary.unwritable += 1,
        }

        self.summary.total += 1;
        self.files.push(outcome);
    }

    /// Sort outcomes so reports are stable regardless of worker scheduling
    pub fn sort(&mut self) {
        self.files.sort_by(|a, b| a.input.cmp(&b.input));
    }

    /// Failed inputs (diagnostic written or not)
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.is_converted())
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed + self.summary.unwritable > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, status: FileStatus) -> FileOutcome {
        FileOutcome {
            input: PathBuf::from(format!("in/{}", name)),
            output: PathBuf::from(format!("out/{}", name)),
            status,
        }
    }

    #[test]
    fn empty_report() {
        let report = BatchReport::new("in", "out");
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.total, 0);
        assert!(!report.has_failures());
    }

    #[test]
    fn summary_counts_each_status() {
        let mut report = BatchReport::new("in", "out");
        report.add_outcome(outcome("b.sql", FileStatus::Converted));
        report.add_outcome(outcome("a.sql", FileStatus::Failed { message: "bad".into() }));
        report.add_outcome(outcome("c.sql", FileStatus::Converted));
        report.sort();

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.converted, 2);
        assert_eq!(report.summary.failed, 1);
        assert!(report.has_failures());
        assert_eq!(report.files[0].input, PathBuf::from("in/a.sql"));
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn report_serialization() {
        let mut report = BatchReport::new("in", "out");
        report.add_outcome(outcome("a.sql", FileStatus::Failed { message: "bad".into() }));
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"status\": \"failed\""));
    }
}
