//! The per-file failure boundary

use std::path::Path;
use tsqlbricks_core::{DiagnosticRecord, FileOutcome, FileStatus};

use crate::pipeline::Converter;

/// Convert one file, writing a diagnostic in place of the output on any
/// error. Never fails: the outcome says what ended up at `output`.
pub fn convert_or_diagnose(converter: &Converter, input: &Path, output: &Path) -> FileOutcome {
    let status = match converter.convert_file(input, output) {
        Ok(()) => FileStatus::Converted,
        Err(err) => {
            let record = DiagnosticRecord::from_error(&err, input);
            tracing::warn!(input = %input.display(), error = %record.message, "conversion failed");

            match std::fs::write(output, record.render()) {
                Ok(()) => FileStatus::Failed {
                    message: record.message,
                },
                Err(write_err) => {
                    tracing::error!(
                        output = %output.display(),
                        error = %write_err,
                        "diagnostic could not be written"
                    );
                    FileStatus::Unwritable {
                        message: format!("{}; diagnostic not written: {}", record.message, write_err),
                    }
                }
            }
        }
    };

    FileOutcome {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        status,
    }
}
