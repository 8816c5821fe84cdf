//! Lexical normalization passes
//!
//! Token-level rewrites that do not depend on types or function tables.

use regex::Regex;
use std::sync::LazyLock;
use tsqlbricks_jinja::{classify, TagKind};

use crate::rewrite::rewrite_code;
use crate::tokenizer::{next_significant, prev_significant, tokenize, Token, TokenKind};

static NOLOCK_WITH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[ \t]*\bWITH\s*\(\s*(?:NOLOCK|READUNCOMMITTED)\s*\)").expect("valid pattern")
});

static NOLOCK_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[ \t]*\(\s*(?:NOLOCK|READUNCOMMITTED)\s*\)").expect("valid pattern")
});

static CURRENT_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:GETDATE|SYSDATETIME)\s*\(\s*\)").expect("valid pattern")
});

/// Template control tags that pass through conversion as written
const CONTROL_TAGS: [&str; 4] = ["if", "elif", "else", "endif"];

/// Keywords that end an `ON` condition, clause keywords first, then
/// statement starters and batch separators
const ON_CLAUSE_END: [&str; 27] = [
    "JOIN", "WHERE", "GROUP", "ORDER", "HAVING", "UNION", "EXCEPT", "INTERSECT", "SELECT", "ON",
    "GO", "CREATE", "ALTER", "DROP", "TRUNCATE", "INSERT", "UPDATE", "DELETE", "MERGE", "WITH",
    "DECLARE", "SET", "EXEC", "EXECUTE", "BEGIN", "END", "RETURN",
];

/// Reserved words that can never be the column a join alias was meant to name
const RESERVED_WORDS: [&str; 24] = [
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "ON", "JOIN", "AS", "IS", "IN", "NULL",
    "CASE", "WHEN", "THEN", "ELSE", "END", "CREATE", "VIEW", "TABLE", "PROCEDURE", "FUNCTION",
    "BEGIN", "GO",
];

/// Rewrite the `+` string-concatenation operator to `||`.
///
/// A `+` touching a quote character is taken to be literal content, and a
/// `+` next to a numeric literal is arithmetic; both are left alone.
pub fn convert_concatenation(sql: &str) -> String {
    let tokens = tokenize(sql);
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());

    for (i, token) in tokens.iter().enumerate() {
        if !token.is_punct('+') || !is_concat_operator(bytes, &tokens, i) {
            out.push_str(token.text);
            continue;
        }
        if i.checked_sub(1).is_some_and(|p| tokens[p].kind != TokenKind::Whitespace) {
            out.push(' ');
        }
        out.push_str("||");
        if tokens.get(i + 1).is_some_and(|t| t.kind != TokenKind::Whitespace) {
            out.push(' ');
        }
    }

    out
}

fn is_concat_operator(bytes: &[u8], tokens: &[Token<'_>], i: usize) -> bool {
    let token = tokens[i];
    let before = token.start.checked_sub(1).map(|p| bytes[p]);
    let after = bytes.get(token.end()).copied();
    if before == Some(b'\'') || after == Some(b'\'') {
        return false;
    }

    let (Some(prev), Some(next)) = (prev_significant(tokens, i), next_significant(tokens, i + 1)) else {
        return false;
    };
    if tokens[prev].kind == TokenKind::Number || tokens[next].kind == TokenKind::Number {
        return false;
    }

    matches!(
        tokens[prev].kind,
        TokenKind::Word | TokenKind::QuotedIdent | TokenKind::Str | TokenKind::Template(TagKind::Expression)
    ) || tokens[prev].is_punct(')')
}

/// Rewrite `[name]` and `"name"` delimited identifiers to `` `name` ``.
///
/// Template regions are single tokens, so nothing inside them is touched.
pub fn convert_brackets_and_quotes(sql: &str) -> String {
    tokenize(sql)
        .iter()
        .map(|token| match token.kind {
            TokenKind::QuotedIdent if token.text.starts_with('[') => to_backticks(token.text, ']'),
            TokenKind::QuotedIdent if token.text.starts_with('"') => to_backticks(token.text, '"'),
            _ => token.text.to_string(),
        })
        .collect()
}

fn to_backticks(text: &str, close: char) -> String {
    let body = &text[1..];
    let body = body.strip_suffix(close).unwrap_or(body);
    let doubled = format!("{}{}", close, close);
    let name = body.replace(&doubled, &close.to_string()).replace('`', "``");
    format!("`{}`", name)
}

/// Strip `WITH (NOLOCK)` and bare `(NOLOCK)` table hints
pub fn remove_nolock_hint(sql: &str) -> String {
    rewrite_code(sql, |code| {
        let code = NOLOCK_WITH.replace_all(code, "");
        NOLOCK_BARE.replace_all(&code, "").into_owned()
    })
}

/// Revert `a.b AS c` to `a.b = c` inside `ON` conditions
pub fn fix_join_conditions(sql: &str) -> String {
    let tokens = tokenize(sql);
    let mut equals = vec![false; tokens.len()];

    for start in 0..tokens.len() {
        if !tokens[start].is_keyword("ON") {
            continue;
        }
        let mut depth = 0i32;
        for j in start + 1..tokens.len() {
            let token = tokens[j];
            if token.is_punct('(') {
                depth += 1;
            } else if token.is_punct(')') {
                depth -= 1;
                if depth < 0 {
                    break;
                }
            } else if depth == 0 && (token.is_any_keyword(&ON_CLAUSE_END) || token.is_punct(';')) {
                break;
            } else if depth == 0 && token.is_keyword("AS") && is_misplaced_join_alias(&tokens, j) {
                equals[j] = true;
            }
        }
    }

    tokens
        .iter()
        .zip(equals)
        .map(|(token, eq)| if eq { "=" } else { token.text })
        .collect()
}

fn is_misplaced_join_alias(tokens: &[Token<'_>], as_index: usize) -> bool {
    let qualified = prev_significant(tokens, as_index).is_some_and(|column| {
        column >= 2
            && tokens[column].is_identifier()
            && tokens[column - 1].is_punct('.')
            && tokens[column - 2].is_identifier()
    });
    let named = next_significant(tokens, as_index + 1).is_some_and(|n| {
        let name = tokens[n];
        name.kind == TokenKind::QuotedIdent
            || (name.kind == TokenKind::Word && !name.is_any_keyword(&RESERVED_WORDS))
    });
    qualified && named
}

/// Template tags pass through; `GETDATE()` and `SYSDATETIME()` become
/// `current_timestamp()`.
pub fn convert_template_vars(sql: &str) -> String {
    let control_tags = classify(sql)
        .iter()
        .filter(|region| region.kind == TagKind::Statement)
        .filter(|region| {
            let keyword = region.inner(sql).split_whitespace().next().unwrap_or_default();
            CONTROL_TAGS.contains(&keyword)
        })
        .count();
    if control_tags > 0 {
        tracing::trace!(control_tags, "template control tags passed through");
    }

    rewrite_code(sql, |code| CURRENT_TIMESTAMP.replace_all(code, "current_timestamp()").into_owned())
}
