//! tsqlbricks Core
//!
//! Shared domain types for the T-SQL to Databricks converter.
//! The diagnostic file layout is part of the public contract: batch users
//! scan converted trees for [`DIAGNOSTIC_MARKER`] to find failed inputs.

pub mod diagnostic;
pub mod report;
pub mod config;

pub use diagnostic::{DiagnosticRecord, DIAGNOSTIC_MARKER, TIMESTAMP_FORMAT};
pub use report::{BatchReport, BatchSummary, FileOutcome, FileStatus, ReportVersion};
pub use config::{Config, ConfigError};
