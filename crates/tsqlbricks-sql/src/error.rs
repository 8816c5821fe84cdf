//! Translation errors
//!
//! Only lookup failures are errors. Text a pass does not recognise is left
//! as it is.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// `HASHBYTES` algorithm with no Databricks equivalent in the hash table
    #[error("unsupported hash algorithm '{algorithm}'")]
    UnsupportedHashAlgorithm { algorithm: String },

    /// Cast target type with no entry in the type table
    #[error("unsupported data type '{type_name}'")]
    UnsupportedType { type_name: String },
}

pub type TranslateResult<T> = Result<T, TranslateError>;

/// A [`TranslateError`] tagged with the pass that raised it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pass `{pass}` failed")]
pub struct PassError {
    pub pass: &'static str,
    #[source]
    pub source: TranslateError,
}
