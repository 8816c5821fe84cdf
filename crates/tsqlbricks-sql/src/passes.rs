//! The ordered pass table
//!
//! Passes run in table order over the whole document; later passes rely on
//! the output of earlier ones.

use crate::alias::{cleanup_unconverted_equals, equals_alias_to_as, move_alias_in_case_statements};
use crate::error::{PassError, TranslateResult};
use crate::hash::convert_hash_functions;
use crate::lexical::{
    convert_brackets_and_quotes, convert_concatenation, convert_template_vars, fix_join_conditions,
    remove_nolock_hint,
};
use crate::types::{convert_casts, convert_isnull, convert_numeric, convert_type_declarations};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexical,
    TypeMapping,
    Cleanup,
}

#[derive(Clone, Copy)]
pub enum PassFn {
    /// Never fails
    Total(fn(&str) -> String),
    /// May fail on a table lookup
    Fallible(fn(&str) -> TranslateResult<String>),
}

#[derive(Clone, Copy)]
pub struct Pass {
    pub name: &'static str,
    pub stage: Stage,
    pub run: PassFn,
}

impl Pass {
    pub fn apply(&self, sql: &str) -> Result<String, PassError> {
        match self.run {
            PassFn::Total(f) => Ok(f(sql)),
            PassFn::Fallible(f) => f(sql).map_err(|source| PassError {
                pass: self.name,
                source,
            }),
        }
    }
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .finish()
    }
}

const fn total(name: &'static str, stage: Stage, f: fn(&str) -> String) -> Pass {
    Pass { name, stage, run: PassFn::Total(f) }
}

const fn fallible(name: &'static str, stage: Stage, f: fn(&str) -> TranslateResult<String>) -> Pass {
    Pass { name, stage, run: PassFn::Fallible(f) }
}

pub const PIPELINE: [Pass; 13] = [
    total("concatenation", Stage::Lexical, convert_concatenation),
    total("equals_alias", Stage::Lexical, equals_alias_to_as),
    total("brackets_and_quotes", Stage::Lexical, convert_brackets_and_quotes),
    total("nolock_hints", Stage::Lexical, remove_nolock_hint),
    total("case_aliases", Stage::Lexical, move_alias_in_case_statements),
    total("join_conditions", Stage::Lexical, fix_join_conditions),
    total("template_vars", Stage::Lexical, convert_template_vars),
    fallible("hash_functions", Stage::TypeMapping, convert_hash_functions),
    fallible("casts", Stage::TypeMapping, convert_casts),
    total("type_declarations", Stage::TypeMapping, convert_type_declarations),
    fallible("isnull", Stage::TypeMapping, convert_isnull),
    total("numeric", Stage::TypeMapping, convert_numeric),
    total("unconverted_equals", Stage::Cleanup, cleanup_unconverted_equals),
];

/// Run every pass in order
pub fn translate(sql: &str) -> Result<String, PassError> {
    PIPELINE.iter().try_fold(sql.to_string(), |current, pass| {
        let next = pass.apply(&current)?;
        tracing::trace!(pass = pass.name, changed = next != current, "pass applied");
        Ok(next)
    })
}
