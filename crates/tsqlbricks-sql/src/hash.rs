//! `HASHBYTES` translation

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{TranslateError, TranslateResult};
use crate::rewrite::{rewrite_calls, rewrite_template_strings, Call};

/// T-SQL algorithm name to the Databricks function call it becomes.
/// `{}` is replaced by the hashed expression.
pub const HASH_FUNCTIONS: [(&str, &str); 4] = [
    ("MD5", "md5({})"),
    ("SHA1", "sha1({})"),
    ("SHA2_256", "sha2({}, 256)"),
    ("SHA2_512", "sha2({}, 512)"),
];

static HASH_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^(?:md5|sha1|sha2)\s*\(.*\)$").expect("valid pattern"));

static BINARY_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:VAR)?BINARY\s*(?:\(\s*(?:\d+|MAX)\s*\))?$").expect("valid pattern")
});

/// Look up the Databricks template for an algorithm name
pub fn hash_template(algorithm: &str) -> Option<&'static str> {
    HASH_FUNCTIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(algorithm))
        .map(|(_, template)| *template)
}

/// Translate `HASHBYTES('<algo>', x)` and collapse the
/// `CONVERT(BINARY(n), <hash>)` idiom to `CAST(<hash> AS BINARY)`.
///
/// SQL fragments quoted inside template tags are translated too.
/// Fails on a literal algorithm name missing from [`HASH_FUNCTIONS`].
/// Calls whose algorithm is not a string literal are left as written.
pub fn convert_hash_functions(sql: &str) -> TranslateResult<String> {
    let translated = translate_hashes(sql)?;
    rewrite_template_strings(&translated, translate_hashes)
}

fn translate_hashes(sql: &str) -> TranslateResult<String> {
    rewrite_calls(sql, &["HASHBYTES", "CONVERT"], |call| {
        if call.name.eq_ignore_ascii_case("HASHBYTES") {
            hashbytes(call)
        } else {
            Ok(binary_hash_cast(call))
        }
    })
}

fn hashbytes(call: &Call<'_>) -> TranslateResult<Option<String>> {
    if call.arg_count() != 2 {
        return Ok(None);
    }
    let Some(algorithm) = string_literal(call.arg(0)) else {
        return Ok(None);
    };
    let template = hash_template(algorithm).ok_or_else(|| TranslateError::UnsupportedHashAlgorithm {
        algorithm: algorithm.to_string(),
    })?;
    Ok(Some(template.replace("{}", call.arg(1))))
}

fn binary_hash_cast(call: &Call<'_>) -> Option<String> {
    if call.arg_count() != 2 || !BINARY_TYPE.is_match(call.arg(0)) || !HASH_CALL.is_match(call.arg(1)) {
        return None;
    }
    Some(format!("CAST({} AS BINARY)", call.arg(1)))
}

/// Contents of `'...'` or `N'...'` without escapes
fn string_literal(text: &str) -> Option<&str> {
    let text = text.strip_prefix(['N', 'n']).unwrap_or(text);
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    (!inner.contains('\'')).then_some(inner)
}
