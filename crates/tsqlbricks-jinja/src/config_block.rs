//! dbt `{{ config(...) }}` block extraction and canonical rewriting
//!
//! The block is pulled out of the document before any SQL pass runs, reduced
//! to an allow-list of keys, and rendered back one parameter per line with
//! leading commas.

use std::ops::Range;

use crate::regions::{classify, TagKind};

/// Config keys that survive conversion. Everything else is dropped.
pub const ALLOWED_CONFIG_KEYS: [&str; 6] = [
    "unique_key",
    "alias",
    "materialized",
    "enabled",
    "pre_hook",
    "post_hook",
];

/// A parameter value as it will be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    /// `true` / `false` in any case, rendered unquoted as written
    Bool(String),

    /// Rendered single-quoted; the payload is already escaped for single quotes
    Text(String),

    /// List, dict or call expressions, rendered verbatim
    Literal(String),
}

impl ConfigValue {
    /// Classify a raw value from the argument list
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
            return Self::Bool(raw.to_string());
        }

        if let Some(inner) = strip_quotes(raw, '\'') {
            return Self::Text(inner.to_string());
        }

        if let Some(inner) = strip_quotes(raw, '"') {
            return Self::Text(escape_single_quotes(&inner.replace("\\\"", "\"")));
        }

        if raw.starts_with('[') || raw.starts_with('{') || raw.contains('(') {
            return Self::Literal(raw.to_string());
        }

        Self::Text(escape_single_quotes(raw))
    }

    fn render(&self) -> String {
        match self {
            Self::Bool(raw) => raw.clone(),
            Self::Text(text) => format!("'{}'", text),
            Self::Literal(raw) => raw.clone(),
        }
    }
}

fn strip_quotes(raw: &str, quote: char) -> Option<&str> {
    if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

fn escape_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut escaped = false;
    for c in text.chars() {
        if c == '\'' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out
}

/// One `key=value` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigParam {
    pub key: String,
    pub value: ConfigValue,
}

/// A dbt config block found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBlock {
    /// Exact source text of the block
    pub source: String,

    /// Byte span of the block in the document it was found in
    pub span: Range<usize>,

    /// Parameters in source order
    pub params: Vec<ConfigParam>,
}

impl ConfigBlock {
    /// Find the first config block in a document.
    ///
    /// The block is the first terminated `{{ ... }}` region whose body is a
    /// single `config(...)` call, so nested tags and strings inside hook
    /// values stay part of the block.
    pub fn find(document: &str) -> Option<Self> {
        classify(document)
            .into_iter()
            .filter(|region| region.kind == TagKind::Expression && region.terminated)
            .find_map(|region| {
                let args = config_args(region.inner(document))?;
                Some(Self {
                    source: region.text(document).to_string(),
                    span: region.range(),
                    params: parse_params(args),
                })
            })
    }

    /// Remove the first config block from a document.
    ///
    /// Returns the remaining document and the block with only allow-listed keys.
    pub fn extract(document: &str) -> (String, Option<Self>) {
        match Self::find(document) {
            Some(block) => {
                let mut remaining = document.to_string();
                remaining.replace_range(block.span.clone(), "");
                (remaining, Some(block.retain_allowed()))
            }
            None => (document.to_string(), None),
        }
    }

    /// Drop every parameter whose key is not allow-listed
    pub fn retain_allowed(mut self) -> Self {
        self.params.retain(|param| {
            let keep = ALLOWED_CONFIG_KEYS.contains(&param.key.as_str());
            if !keep {
                tracing::debug!(key = %param.key, "dropping config parameter");
            }
            keep
        });
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.params.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    /// Render in canonical one-parameter-per-line, leading-comma form
    pub fn render(&self) -> String {
        let lines: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let comma = if i == 0 { "" } else { "," };
                format!("        {}{}={}", comma, param.key, param.value.render())
            })
            .collect();

        let mut out = String::from("{{\n    config(\n");
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("    )\n}}");
        out
    }
}

/// Argument list of a `config(...)` call body, or `None` for any other expression
fn config_args(body: &str) -> Option<&str> {
    body.strip_prefix("config")?
        .trim_start()
        .strip_prefix('(')?
        .trim_end()
        .strip_suffix(')')
}

/// Split a config argument list into `key=value` pairs.
///
/// Tolerates arbitrary whitespace, newlines and trailing commas. Commas and
/// `=` inside strings or brackets do not split. Positional arguments are
/// ignored.
fn parse_params(args: &str) -> Vec<ConfigParam> {
    split_top_level(args, ',')
        .into_iter()
        .filter_map(|piece| {
            let (key, value) = split_assignment(piece)?;
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return None;
            }
            Some(ConfigParam {
                key: key.to_string(),
                value: ConfigValue::parse(value),
            })
        })
        .collect()
}

fn split_assignment(piece: &str) -> Option<(&str, &str)> {
    let pos = split_top_level(piece, '=').first().map(|first| first.len())?;
    if pos >= piece.len() {
        return None;
    }
    let value = &piece[pos + 1..];
    if value.starts_with('=') {
        return None;
    }
    Some((&piece[..pos], value))
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ if c == separator && depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.trim().is_empty() || separator != ',');
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_and_filters_keys() {
        let doc = "{{ config(materialized='table', schema='stg', unique_key='id', tags=['a']) }}\nselect 1";
        let (rest, block) = ConfigBlock::extract(doc);
        let block = block.unwrap();

        assert_eq!(rest, "\nselect 1");
        let keys: Vec<&str> = block.params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["materialized", "unique_key"]);
    }

    #[test]
    fn renders_leading_comma_form() {
        let doc = "{{\n  config(\n    materialized = \"incremental\",\n    unique_key='id',\n    enabled=True,\n  )\n}}";
        let (_, block) = ConfigBlock::extract(doc);
        assert_eq!(
            block.unwrap().render(),
            "{{\n    config(\n        materialized='incremental'\n        ,unique_key='id'\n        ,enabled=True\n    )\n}}"
        );
    }

    #[test]
    fn single_param_has_no_comma() {
        let (_, block) = ConfigBlock::extract("{{ config(alias='dim_x') }}");
        assert_eq!(block.unwrap().render(), "{{\n    config(\n        alias='dim_x'\n    )\n}}");
    }

    #[test]
    fn commas_inside_values_do_not_split() {
        let doc = "{{ config(pre_hook=\"delete from t where a in ('x', 'y')\", unique_key=['a', 'b']) }}";
        let block = ConfigBlock::find(doc).unwrap();
        assert_eq!(
            block.get("pre_hook"),
            Some(&ConfigValue::Text("delete from t where a in (\\'x\\', \\'y\\')".to_string()))
        );
        assert_eq!(block.get("unique_key"), Some(&ConfigValue::Literal("['a', 'b']".to_string())));
    }

    #[test]
    fn no_block_is_noop() {
        let (rest, block) = ConfigBlock::extract("select {{ ref('a') }}");
        assert_eq!(rest, "select {{ ref('a') }}");
        assert!(block.is_none());
    }

    #[test]
    fn only_first_block_is_removed() {
        let doc = "{{ config(alias='a') }}\nselect 1\n{{ config(alias='a') }}";
        let (rest, _) = ConfigBlock::extract(doc);
        assert_eq!(rest, "\nselect 1\n{{ config(alias='a') }}");
    }

    #[test]
    fn macro_valued_hook_stays_in_block() {
        let doc = "{{ config(materialized='table', post_hook=\"{{ grant_select(this) }}\") }}\nSELECT 1";
        let (rest, block) = ConfigBlock::extract(doc);
        let block = block.unwrap();

        assert_eq!(rest, "\nSELECT 1");
        assert_eq!(block.span, 0..doc.len() - "\nSELECT 1".len());
        assert_eq!(
            block.get("post_hook"),
            Some(&ConfigValue::Text("{{ grant_select(this) }}".to_string()))
        );
        assert_eq!(
            block.render(),
            "{{\n    config(\n        materialized='table'\n        ,post_hook='{{ grant_select(this) }}'\n    )\n}}"
        );
    }

    #[test]
    fn block_inside_comment_is_not_config() {
        let doc = "{# {{ config(alias='old') }} #}\n{{ config(alias='new') }}\nselect 1";
        let (rest, block) = ConfigBlock::extract(doc);

        assert_eq!(rest, "{# {{ config(alias='old') }} #}\n\nselect 1");
        assert_eq!(block.unwrap().get("alias"), Some(&ConfigValue::Text("new".to_string())));
    }

    #[test]
    fn other_expressions_are_not_config() {
        assert!(ConfigBlock::find("{{ configure(alias='a') }}").is_none());
        assert!(ConfigBlock::find("{{ config(alias='a') | trim }}").is_none());
    }

    #[test]
    fn bool_values_stay_unquoted() {
        assert_eq!(ConfigValue::parse("FALSE"), ConfigValue::Bool("FALSE".to_string()));
        assert_eq!(ConfigValue::parse("'table'"), ConfigValue::Text("table".to_string()));
        assert_eq!(ConfigValue::parse("view"), ConfigValue::Text("view".to_string()));
    }
}
