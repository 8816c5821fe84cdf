//! Engine errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tsqlbricks_sql::{PassError, TranslateError};

/// Why a single document could not be converted
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("pass `{pass}` failed")]
    Pass {
        pass: &'static str,
        #[source]
        source: TranslateError,
    },
}

impl From<PassError> for ConvertError {
    fn from(err: PassError) -> Self {
        ConvertError::Pass {
            pass: err.pass,
            source: err.source,
        }
    }
}

/// Failures that stop a batch before any file is converted
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input directory {} does not exist", path.display())]
    MissingInput { path: PathBuf },

    #[error("output directory {} overlaps input directory {}", output.display(), input.display())]
    OverlappingRoots { input: PathBuf, output: PathBuf },

    #[error("failed to prepare directory {}", path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk input directory")]
    Walk(#[from] walkdir::Error),
}
