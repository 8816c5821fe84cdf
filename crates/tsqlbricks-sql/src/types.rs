//! Type and function mapping
//!
//! Cast targets go through [`TYPE_TABLE`]; a type missing from the table
//! fails the document. Type names in declarations are renamed by pattern
//! and never fail.

use regex::Regex;
use std::convert::Infallible;
use std::sync::LazyLock;

use crate::error::{TranslateError, TranslateResult};
use crate::rewrite::{rewrite_calls, rewrite_sql, rewrite_template_strings, Call};
use crate::tokenizer::{next_significant, prev_significant, tokenize};

/// How a source type maps onto a Databricks type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMapping {
    /// Fixed target; length or precision arguments are dropped
    Fixed(&'static str),
    /// Renamed, arguments kept as written
    WithArgs(&'static str),
}

pub const TYPE_TABLE: [(&str, TypeMapping); 34] = [
    ("VARCHAR", TypeMapping::Fixed("STRING")),
    ("NVARCHAR", TypeMapping::Fixed("STRING")),
    ("CHAR", TypeMapping::Fixed("STRING")),
    ("NCHAR", TypeMapping::Fixed("STRING")),
    ("TEXT", TypeMapping::Fixed("STRING")),
    ("NTEXT", TypeMapping::Fixed("STRING")),
    ("UNIQUEIDENTIFIER", TypeMapping::Fixed("STRING")),
    ("SYSNAME", TypeMapping::Fixed("STRING")),
    ("XML", TypeMapping::Fixed("STRING")),
    ("TIME", TypeMapping::Fixed("STRING")),
    ("TINYINT", TypeMapping::Fixed("INT")),
    ("BIT", TypeMapping::Fixed("BOOLEAN")),
    ("BINARY", TypeMapping::Fixed("BINARY")),
    ("VARBINARY", TypeMapping::Fixed("BINARY")),
    ("IMAGE", TypeMapping::Fixed("BINARY")),
    ("DATETIME", TypeMapping::Fixed("TIMESTAMP")),
    ("DATETIME2", TypeMapping::Fixed("TIMESTAMP")),
    ("SMALLDATETIME", TypeMapping::Fixed("TIMESTAMP")),
    ("DATETIMEOFFSET", TypeMapping::Fixed("TIMESTAMP")),
    ("NUMERIC", TypeMapping::WithArgs("DECIMAL")),
    ("MONEY", TypeMapping::Fixed("DECIMAL(19,4)")),
    ("SMALLMONEY", TypeMapping::Fixed("DECIMAL(10,4)")),
    ("FLOAT", TypeMapping::Fixed("DOUBLE")),
    ("REAL", TypeMapping::Fixed("FLOAT")),
    ("INT", TypeMapping::Fixed("INT")),
    ("INTEGER", TypeMapping::Fixed("INTEGER")),
    ("SMALLINT", TypeMapping::Fixed("SMALLINT")),
    ("BIGINT", TypeMapping::Fixed("BIGINT")),
    ("DATE", TypeMapping::Fixed("DATE")),
    ("DECIMAL", TypeMapping::WithArgs("DECIMAL")),
    ("STRING", TypeMapping::Fixed("STRING")),
    ("BOOLEAN", TypeMapping::Fixed("BOOLEAN")),
    ("TIMESTAMP", TypeMapping::Fixed("TIMESTAMP")),
    ("DOUBLE", TypeMapping::Fixed("DOUBLE")),
];

/// A type name, bare or inside one layer of backticks, brackets or double
/// quotes, followed by an optional argument list
static TYPE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)^(?:`([A-Za-z_][A-Za-z0-9_]*)`|\[([A-Za-z_][A-Za-z0-9_]*)\]|"([A-Za-z_][A-Za-z0-9_]*)"|([A-Za-z_][A-Za-z0-9_]*))\s*(\(.*\))?$"#,
    )
    .expect("valid pattern")
});

static VARCHAR_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bN?VARCHAR\s*\(\s*(?:\d+|MAX)\s*\)").expect("valid pattern")
});

static TINYINT_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bTINYINT\b").expect("valid pattern"));

static NUMERIC_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bNUMERIC\s*\(").expect("valid pattern"));

/// Map a T-SQL type (`NVARCHAR(50)`, `numeric(10, 2)`, `[int]`) to Databricks
pub fn map_type(type_text: &str) -> TranslateResult<String> {
    let unsupported = || TranslateError::UnsupportedType {
        type_name: type_text.to_string(),
    };
    let caps = TYPE_SHAPE.captures(type_text.trim()).ok_or_else(unsupported)?;
    let name = (1..=4)
        .find_map(|group| caps.get(group))
        .map(|m| m.as_str())
        .ok_or_else(unsupported)?;
    let args = caps.get(5).map(|m| m.as_str()).unwrap_or_default();

    let mapping = TYPE_TABLE
        .iter()
        .find(|(source, _)| source.eq_ignore_ascii_case(name))
        .map(|(_, mapping)| *mapping)
        .ok_or_else(unsupported)?;

    Ok(match mapping {
        TypeMapping::Fixed(target) => target.to_string(),
        TypeMapping::WithArgs(target) => format!("{}{}", target, args),
    })
}

fn is_template(type_text: &str) -> bool {
    type_text.contains("{{") || type_text.contains("{%")
}

/// Translate `CONVERT`/`TRY_CONVERT` into `CAST`/`TRY_CAST` and map the
/// target type of every cast.
pub fn convert_casts(sql: &str) -> TranslateResult<String> {
    rewrite_calls(sql, &["CONVERT", "TRY_CONVERT", "CAST", "TRY_CAST"], |call| {
        if call.name.to_ascii_uppercase().ends_with("CONVERT") {
            convert_call(call)
        } else {
            cast_call(call)
        }
    })
}

fn convert_call(call: &Call<'_>) -> TranslateResult<Option<String>> {
    let function = if call.name.eq_ignore_ascii_case("TRY_CONVERT") {
        "TRY_CAST"
    } else {
        "CAST"
    };
    match call.arg_count() {
        2 if !is_template(call.arg(0)) => {
            let target = map_type(call.arg(0))?;
            Ok(Some(format!("{}({} AS {})", function, call.arg(1), target)))
        }
        3 => {
            tracing::warn!(
                style = call.arg(2),
                "{} with a style argument left untouched",
                call.name
            );
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn cast_call(call: &Call<'_>) -> TranslateResult<Option<String>> {
    if call.args.len() != 1 {
        return Ok(None);
    }
    let arg = call.args[0].as_str();
    let tokens = tokenize(arg);

    let mut depth = 0i32;
    let mut as_index = None;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            depth -= 1;
        } else if depth == 0 && token.is_keyword("AS") {
            as_index = Some(i);
        }
    }
    let Some(as_index) = as_index else {
        return Ok(None);
    };
    let (Some(first), Some(last)) = (
        next_significant(&tokens, as_index + 1),
        prev_significant(&tokens, tokens.len()),
    ) else {
        return Ok(None);
    };
    if last < first {
        return Ok(None);
    }

    let type_start = tokens[first].start;
    let type_end = tokens[last].end();
    let written = &arg[type_start..type_end];
    if is_template(written) {
        return Ok(None);
    }

    let target = map_type(written)?;
    if target.eq_ignore_ascii_case(written) {
        return Ok(None);
    }
    Ok(Some(format!(
        "{}({}{}{})",
        call.name,
        &arg[..type_start],
        target,
        &arg[type_end..]
    )))
}

/// Rename type names in declarations and column definitions
pub fn convert_type_declarations(sql: &str) -> String {
    rewrite_sql(sql, |code| {
        let code = VARCHAR_DECL.replace_all(code, "STRING");
        TINYINT_DECL.replace_all(&code, "INT").into_owned()
    })
}

/// `ISNULL(a, b)` becomes `COALESCE(a, b)`, in SQL and in SQL fragments
/// quoted inside template tags
pub fn convert_isnull(sql: &str) -> TranslateResult<String> {
    let renamed = isnull_to_coalesce(sql)?;
    rewrite_template_strings(&renamed, isnull_to_coalesce)
}

fn isnull_to_coalesce(sql: &str) -> TranslateResult<String> {
    rewrite_calls(sql, &["ISNULL"], |call| {
        Ok(Some(format!("COALESCE({})", call.args.join(","))))
    })
}

/// `NUMERIC(p, s)` becomes `DECIMAL(p, s)`, in SQL and in SQL fragments
/// quoted inside template tags
pub fn convert_numeric(sql: &str) -> String {
    let renamed = numeric_to_decimal(sql);
    rewrite_template_strings(&renamed, |fragment| Ok::<_, Infallible>(numeric_to_decimal(fragment)))
        .unwrap_or_else(|never| match never {})
}

fn numeric_to_decimal(sql: &str) -> String {
    rewrite_sql(sql, |code| NUMERIC_DECL.replace_all(code, "DECIMAL(").into_owned())
}
