//! Shared rewriting machinery for the passes
//!
//! [`rewrite_calls`] walks function calls inner-first, so nested calls are
//! already translated by the time their enclosing call is rewritten.
//! [`rewrite_code`] applies a text transform to everything except string
//! literals, comments and delimited identifiers.
//! [`rewrite_template_strings`] reaches the SQL fragments quoted inside
//! template tags, which every other helper leaves alone.

use crate::error::TranslateResult;
use crate::tokenizer::{matching_paren, next_significant, prev_significant, render, split_top_level, tokenize, Token, TokenKind};

/// A function call with its arguments already rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call<'a> {
    /// Function name as written
    pub name: &'a str,

    /// Raw argument texts, surrounding whitespace included
    pub args: Vec<String>,
}

impl Call<'_> {
    /// Number of arguments; `f()` has none
    pub fn arg_count(&self) -> usize {
        match self.args.as_slice() {
            [only] if only.trim().is_empty() => 0,
            args => args.len(),
        }
    }

    /// Trimmed argument text
    pub fn arg(&self, index: usize) -> &str {
        self.args.get(index).map(|a| a.trim()).unwrap_or_default()
    }

    fn render_unchanged(&self, between: &str) -> String {
        format!("{}{}({})", self.name, between, self.args.join(","))
    }
}

/// Rewrite every call to one of `names` (case-insensitive).
///
/// The callback returns `Ok(None)` to keep a call as written (with its
/// arguments still rewritten). Member calls such as `x.convert(...)` are
/// not treated as calls.
pub fn rewrite_calls<F>(sql: &str, names: &[&str], mut rewrite: F) -> TranslateResult<String>
where
    F: FnMut(&Call<'_>) -> TranslateResult<Option<String>>,
{
    let tokens = tokenize(sql);
    walk_calls(&tokens, names, &mut rewrite)
}

fn walk_calls<F>(tokens: &[Token<'_>], names: &[&str], rewrite: &mut F) -> TranslateResult<String>
where
    F: FnMut(&Call<'_>) -> TranslateResult<Option<String>>,
{
    let mut out = String::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        if token.is_any_keyword(names) && !is_member_access(tokens, i) {
            if let Some(open) = next_significant(tokens, i + 1).filter(|&o| tokens[o].is_punct('(')) {
                if let Some(close) = matching_paren(tokens, open) {
                    let inner = &tokens[open + 1..close];
                    let args = split_top_level(inner)
                        .into_iter()
                        .map(|range| walk_calls(&inner[range], names, rewrite))
                        .collect::<TranslateResult<Vec<_>>>()?;
                    let call = Call { name: token.text, args };
                    match rewrite(&call)? {
                        Some(replacement) => out.push_str(&replacement),
                        None => out.push_str(&call.render_unchanged(&render(&tokens[i + 1..open]))),
                    }
                    i = close + 1;
                    continue;
                }
            }
        }
        out.push_str(token.text);
        i += 1;
    }

    Ok(out)
}

fn is_member_access(tokens: &[Token<'_>], index: usize) -> bool {
    prev_significant(tokens, index).is_some_and(|p| tokens[p].is_punct('.'))
}

/// Apply `transform` to maximal runs of code, leaving string literals,
/// comments and delimited identifiers untouched. Template tags count as
/// code: function names embedded in them are rewritten too.
pub fn rewrite_code(sql: &str, transform: impl Fn(&str) -> String) -> String {
    rewrite_runs(sql, false, transform)
}

/// Like [`rewrite_code`], but template regions are left untouched as well
pub fn rewrite_sql(sql: &str, transform: impl Fn(&str) -> String) -> String {
    rewrite_runs(sql, true, transform)
}

fn rewrite_runs(sql: &str, skip_templates: bool, transform: impl Fn(&str) -> String) -> String {
    let tokens = tokenize(sql);
    let mut out = String::with_capacity(sql.len());
    let mut run_start: Option<usize> = None;

    let flush = |out: &mut String, run_start: &mut Option<usize>, end: usize| {
        if let Some(start) = run_start.take() {
            out.push_str(&transform(&sql[start..end]));
        }
    };

    for token in &tokens {
        let opaque = match token.kind {
            TokenKind::Str | TokenKind::LineComment | TokenKind::BlockComment | TokenKind::QuotedIdent => true,
            TokenKind::Template(_) => skip_templates,
            _ => false,
        };
        if opaque {
            flush(&mut out, &mut run_start, token.start);
            out.push_str(token.text);
        } else if run_start.is_none() {
            run_start = Some(token.start);
        }
    }
    flush(&mut out, &mut run_start, sql.len());

    out
}

/// Apply `rewrite` to the contents of every string literal inside a template
/// tag, such as the fragment in `{% set expr = "ISNULL(a, 0)" %}`. Text
/// outside template tags is copied as written.
pub fn rewrite_template_strings<E, F>(sql: &str, mut rewrite: F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    let mut out = String::with_capacity(sql.len());
    for token in tokenize(sql) {
        match token.kind {
            TokenKind::Template(_) => out.push_str(&rewrite_quoted(token.text, &mut rewrite)?),
            _ => out.push_str(token.text),
        }
    }
    Ok(out)
}

fn rewrite_quoted<E, F>(text: &str, rewrite: &mut F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(|c: char| c == '\'' || c == '"') {
        let quote = rest.as_bytes()[open];
        let body = &rest[open + 1..];
        let Some(len) = closing_quote(body, quote) else {
            break;
        };
        out.push_str(&rest[..=open]);
        out.push_str(&rewrite(&body[..len])?);
        out.push(char::from(quote));
        rest = &body[len + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Offset of the unescaped closing `quote` in `body`
fn closing_quote(body: &str, quote: u8) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_calls_rewrite_first() {
        let out = rewrite_calls("F(F(a), b)", &["f"], |call| {
            Ok(Some(format!("g[{}]", call.args.iter().map(|a| a.trim()).collect::<Vec<_>>().join("|"))))
        })
        .unwrap();
        assert_eq!(out, "g[g[a]|b]");
    }

    #[test]
    fn unchanged_calls_keep_spacing() {
        let out = rewrite_calls("x = f (a ,  b)", &["f"], |_| Ok(None)).unwrap();
        assert_eq!(out, "x = f (a ,  b)");
    }

    #[test]
    fn member_calls_are_skipped() {
        let out = rewrite_calls("dbo.f(a) + f(b)", &["f"], |_| Ok(Some("X".to_string()))).unwrap();
        assert_eq!(out, "dbo.f(a) + X");
    }

    #[test]
    fn arg_count_of_empty_call() {
        let mut seen = None;
        rewrite_calls("f()", &["f"], |call| {
            seen = Some(call.arg_count());
            Ok(None)
        })
        .unwrap();
        assert_eq!(seen, Some(0));
    }

    #[test]
    fn rewrite_code_skips_literals() {
        let out = rewrite_code("abc 'abc' [abc] -- abc\nabc", |s| s.replace("abc", "X"));
        assert_eq!(out, "X 'abc' [abc] -- abc\nX");
    }

    #[test]
    fn rewrite_sql_skips_templates() {
        let out = rewrite_sql("abc {{ abc }} abc", |s| s.replace("abc", "X"));
        assert_eq!(out, "X {{ abc }} X");
    }

    #[test]
    fn template_strings_rewritten_in_place() {
        let sql = r#"abc {% set s = "abc 'abc'" ~ 'a\'bc' %} abc {{ ref('abc') }} 'abc'"#;
        let out: Result<String, ()> = rewrite_template_strings(sql, |s| Ok(s.replace("abc", "X")));
        assert_eq!(
            out.unwrap(),
            r#"abc {% set s = "X 'X'" ~ 'a\'bc' %} abc {{ ref('X') }} 'abc'"#
        );
    }

    #[test]
    fn unterminated_template_string_is_kept() {
        let sql = "{{ f('abc }}";
        let out: Result<String, ()> = rewrite_template_strings(sql, |s| Ok(s.replace("abc", "X")));
        assert_eq!(out.unwrap(), sql);
    }
}
