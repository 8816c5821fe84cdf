//! Diagnostic records written in place of a converted document
//!
//! A diagnostic file contains only `--` line comments, so it stays inert SQL
//! even when it lands in a tree that a warehouse job picks up.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};

/// First line prefix of every diagnostic file. Stable.
pub const DIAGNOSTIC_MARKER: &str = "-- Error during conversion on:";

/// Wall-clock format used for provenance and diagnostic timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything known about a failed file conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// Local time the failure was recorded
    pub timestamp: String,

    /// Top-level error message
    pub message: String,

    /// Error chain, outermost first, then any captured backtrace frames
    pub trace: Vec<String>,

    /// The input that failed to convert
    pub source_path: PathBuf,
}

impl DiagnosticRecord {
    /// Create a record with an explicit message and trace
    pub fn new(message: impl Into<String>, trace: Vec<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            timestamp: now(),
            message: message.into(),
            trace,
            source_path: source_path.into(),
        }
    }

    /// Build a record from an error, walking its `source()` chain.
    ///
    /// The message joins the whole chain so the cause is visible on the
    /// `-- Error:` line; the trace lists one cause per line.
    pub fn from_error(error: &(dyn Error + 'static), source_path: &Path) -> Self {
        let mut chain = Vec::new();
        let mut current: Option<&(dyn Error + 'static)> = Some(error);
        while let Some(err) = current {
            chain.push(err.to_string());
            current = err.source();
        }

        let mut trace: Vec<String> = chain
            .iter()
            .enumerate()
            .map(|(depth, message)| format!("{}: {}", depth, message))
            .collect();

        let backtrace = std::backtrace::Backtrace::capture();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            trace.extend(backtrace.to_string().lines().map(str::to_string));
        }

        Self::new(chain.join(": "), trace, source_path)
    }

    /// Override the timestamp (tests and replays)
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Render the comment-only file body
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{} {}\n", DIAGNOSTIC_MARKER, self.timestamp));
        out.push_str(&format!("-- Error: {}\n", comment_continuation(&self.message)));
        out.push_str("-- Stack trace:\n");
        for line in &self.trace {
            out.push_str(&format!("-- {}\n", comment_continuation(line)));
        }
        out.push_str(&format!("-- Original file: {}\n", self.source_path.display()));
        out
    }

    /// Check whether file content is a diagnostic rather than converted SQL
    pub fn is_diagnostic(content: &str) -> bool {
        content.starts_with(DIAGNOSTIC_MARKER)
    }
}

/// Current local time in [`TIMESTAMP_FORMAT`]
pub fn now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Keep embedded newlines inside the comment block
fn comment_continuation(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("\n-- ")
}
