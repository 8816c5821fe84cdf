//! tsqlbricks engine - per-file conversion and batch orchestration
//!
//! - [`Converter`]: one document in, one converted document out
//! - [`convert_or_diagnose`]: the failure boundary; every per-file error
//!   ends up as a diagnostic file at the output path
//! - [`convert_directory`]: mirrors an input tree into an output tree on a
//!   bounded worker pool
//! - [`lowercase`]: post-processing of an already converted tree

pub mod batch;
pub mod error;
pub mod failure;
pub mod lowercase;
pub mod pipeline;

pub use batch::{convert_directory, BatchOptions};
pub use error::{BatchError, ConvertError};
pub use failure::convert_or_diagnose;
pub use lowercase::{LowercaseOutcome, LowercasePlan};
pub use pipeline::{ConvertedDocument, Converter};
