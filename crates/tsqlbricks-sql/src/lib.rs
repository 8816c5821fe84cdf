//! T-SQL to Databricks SQL translation passes
//!
//! Every pass is a text-to-text function over a whole document. Passes
//! share one lossless tokenizer, in which template regions are opaque
//! tokens, so `{{ }}`, `{% %}` and `{# #}` interiors survive every
//! structural rewrite unchanged.
//!
//! [`translate`] runs the full [`PIPELINE`] in order.

pub mod alias;
pub mod error;
pub mod hash;
pub mod lexical;
pub mod passes;
pub mod rewrite;
pub mod tokenizer;
pub mod types;

pub use error::{PassError, TranslateError, TranslateResult};
pub use hash::HASH_FUNCTIONS;
pub use passes::{translate, Pass, PassFn, Stage, PIPELINE};
pub use tokenizer::{tokenize, Token, TokenKind};
pub use types::{map_type, TypeMapping, TYPE_TABLE};
