//! Template-layer handling for dbt-flavoured T-SQL
//!
//! This crate handles:
//! - Classifying template regions (`{{ }}`, `{% %}`, `{# #}`) so SQL passes can skip them
//! - Extracting the `{{ config(...) }}` block and rewriting it in canonical form

pub mod regions;
pub mod config_block;

pub use regions::{classify, TagKind, TemplateRegion};
pub use config_block::{ConfigBlock, ConfigParam, ConfigValue, ALLOWED_CONFIG_KEYS};
