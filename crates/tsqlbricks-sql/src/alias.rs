//! `alias = expression` to `expression AS alias`
//!
//! T-SQL allows select-list items of the form `alias = expression`;
//! Databricks only accepts `expression AS alias`. Select lists are found
//! structurally (from `SELECT` up to the clause keyword that ends the list at
//! the same nesting level) and split into top-level items, so only items in
//! alias position are rewritten. Comparisons in `WHERE`, `ON` and `SET` never
//! are.

use crate::tokenizer::{matching_paren, next_significant, prev_significant, render, split_top_level, tokenize, Token, TokenKind};

/// Keywords that end a select list when seen outside parentheses
const SELECT_LIST_END: [&str; 16] = [
    "FROM", "INTO", "WHERE", "GROUP", "ORDER", "HAVING", "UNION", "EXCEPT", "INTERSECT",
    "OPTION", "FOR", "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE",
];

/// Words that can start an item but are never an alias
const NOT_AN_ALIAS: [&str; 12] = [
    "NULL", "CASE", "NOT", "EXISTS", "DISTINCT", "TOP", "ALL", "WHEN", "THEN", "ELSE", "END", "AND",
];

/// Which `alias = expression` items a sweep rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AliasRule {
    /// Every item in alias position
    Any,

    /// Only items whose expression is a single `CASE ... END`
    CaseExpression,

    /// Only identifiers, qualified identifiers and single function calls
    Narrow,
}

impl AliasRule {
    fn accepts(&self, expr: &[Token<'_>]) -> bool {
        match self {
            Self::Any => true,
            Self::CaseExpression => {
                expr[0].is_keyword("CASE") && matching_case_end(expr, 0) == Some(expr.len() - 1)
            }
            Self::Narrow => is_identifier_chain(expr) || is_single_call(expr),
        }
    }
}

/// Rewrite every `alias = expression` select-list item
pub fn equals_alias_to_as(sql: &str) -> String {
    walk(&tokenize(sql), AliasRule::Any)
}

/// Second, narrower sweep over select lists.
///
/// Catches items with delimited identifiers or simple expressions that
/// reached this point still in `alias = expression` form.
pub fn cleanup_unconverted_equals(sql: &str) -> String {
    walk(&tokenize(sql), AliasRule::Narrow)
}

/// Move `alias = CASE ... END` aliases behind the expression, then drop
/// stray `AS name` clauses that ended up inside CASE branches.
pub fn move_alias_in_case_statements(sql: &str) -> String {
    let moved = walk(&tokenize(sql), AliasRule::CaseExpression);
    strip_branch_aliases(&tokenize(&moved))
}

fn walk(tokens: &[Token<'_>], rule: AliasRule) -> String {
    let mut out = String::new();
    let mut i = 0;

    while i < tokens.len() {
        out.push_str(tokens[i].text);
        if tokens[i].is_keyword("SELECT") {
            let end = select_list_end(tokens, i + 1);
            out.push_str(&rewrite_list(&tokens[i + 1..end], rule));
            i = end;
        } else {
            i += 1;
        }
    }

    out
}

fn select_list_end(tokens: &[Token<'_>], start: usize) -> usize {
    let mut depth = 0usize;
    for (j, token) in tokens.iter().enumerate().skip(start) {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            if depth == 0 {
                return j;
            }
            depth -= 1;
        } else if depth == 0 && (token.is_any_keyword(&SELECT_LIST_END) || token.is_punct(';')) {
            return j;
        }
    }
    tokens.len()
}

fn rewrite_list(tokens: &[Token<'_>], rule: AliasRule) -> String {
    let mut out = String::new();
    for (n, range) in split_top_level(tokens).into_iter().enumerate() {
        if n > 0 {
            out.push_str(tokens[range.start - 1].text);
        }
        out.push_str(&rewrite_item(&tokens[range], rule, n == 0));
    }
    out
}

fn rewrite_item(tokens: &[Token<'_>], rule: AliasRule, first: bool) -> String {
    let mut k = skip_layout(tokens, 0);
    if first {
        k = skip_select_modifiers(tokens, k);
    }
    try_alias(tokens, k, rule).unwrap_or_else(|| walk(tokens, rule))
}

fn try_alias(tokens: &[Token<'_>], k: usize, rule: AliasRule) -> Option<String> {
    let alias = tokens.get(k)?;
    if !alias.is_identifier() || alias.text.starts_with('@') || alias.is_any_keyword(&NOT_AN_ALIAS) {
        return None;
    }

    let eq = next_significant(tokens, k + 1)?;
    if !tokens[eq].is_punct('=') {
        return None;
    }

    let expr_start = next_significant(tokens, eq + 1)?;
    let expr_end = (expr_start..tokens.len()).rev().find(|&i| !tokens[i].is_layout())? + 1;
    if expr_end <= expr_start {
        return None;
    }

    let expr = &tokens[expr_start..expr_end];
    if !rule.accepts(expr) {
        return None;
    }

    Some(format!(
        "{}{} AS {}{}",
        render(&tokens[..k]),
        walk(expr, rule),
        alias.text,
        render(&tokens[expr_end..])
    ))
}

fn skip_layout(tokens: &[Token<'_>], mut k: usize) -> usize {
    while k < tokens.len() && tokens[k].is_layout() {
        k += 1;
    }
    k
}

/// Skip `DISTINCT`, `ALL` and `TOP n [PERCENT] [WITH TIES]` at the start of a list
fn skip_select_modifiers(tokens: &[Token<'_>], mut k: usize) -> usize {
    loop {
        let Some(token) = tokens.get(k) else { return k };

        if token.is_any_keyword(&["DISTINCT", "ALL"]) {
            k = skip_layout(tokens, k + 1);
        } else if token.is_keyword("TOP") {
            k = skip_layout(tokens, k + 1);
            match tokens.get(k) {
                Some(t) if t.is_punct('(') => {
                    k = matching_paren(tokens, k).map(|c| c + 1).unwrap_or(tokens.len());
                }
                Some(t) if t.kind == TokenKind::Number => k += 1,
                _ => {}
            }
            k = skip_layout(tokens, k);
            if tokens.get(k).is_some_and(|t| t.is_keyword("PERCENT")) {
                k = skip_layout(tokens, k + 1);
            }
            if tokens.get(k).is_some_and(|t| t.is_keyword("WITH")) {
                if let Some(ties) = next_significant(tokens, k + 1).filter(|&t| tokens[t].is_keyword("TIES")) {
                    k = skip_layout(tokens, ties + 1);
                }
            }
        } else {
            return k;
        }
    }
}

/// Index of the `END` closing the `CASE` at `start`
fn matching_case_end(tokens: &[Token<'_>], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        if token.is_keyword("CASE") {
            depth += 1;
        } else if token.is_keyword("END") {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn is_identifier_chain(expr: &[Token<'_>]) -> bool {
    expr.iter().enumerate().all(|(i, token)| {
        if i % 2 == 0 {
            token.is_identifier()
        } else {
            token.is_punct('.')
        }
    }) && expr.len() % 2 == 1
}

fn is_single_call(expr: &[Token<'_>]) -> bool {
    if expr[0].kind != TokenKind::Word {
        return false;
    }
    next_significant(expr, 1)
        .filter(|&open| expr[open].is_punct('('))
        .and_then(|open| matching_paren(expr, open))
        == Some(expr.len() - 1)
}

/// Drop `AS name` clauses sitting directly before `WHEN`, `ELSE` or `END`
/// at the top level of a CASE expression.
fn strip_branch_aliases(tokens: &[Token<'_>]) -> String {
    let mut dropped = vec![false; tokens.len()];

    for start in 0..tokens.len() {
        if !tokens[start].is_keyword("CASE") {
            continue;
        }
        let Some(end) = matching_case_end(tokens, start) else { continue };

        let mut depth = 0i32;
        let mut j = start + 1;
        while j < end {
            let token = tokens[j];
            if token.is_punct('(') {
                depth += 1;
            } else if token.is_punct(')') {
                depth -= 1;
            } else if token.is_keyword("CASE") {
                j = matching_case_end(tokens, j).unwrap_or(end);
            } else if depth == 0 && token.is_keyword("AS") {
                if let Some(name) = next_significant(tokens, j + 1).filter(|&n| tokens[n].is_identifier()) {
                    let closes_branch = next_significant(tokens, name + 1)
                        .is_some_and(|n| tokens[n].is_any_keyword(&["WHEN", "ELSE", "END"]));
                    if closes_branch {
                        let from = prev_significant(tokens, j).map(|p| p + 1).unwrap_or(j);
                        dropped[from..=name].iter_mut().for_each(|d| *d = true);
                        j = name;
                    }
                }
            }
            j += 1;
        }
    }

    tokens
        .iter()
        .zip(dropped)
        .filter(|(_, dropped)| !dropped)
        .map(|(token, _)| token.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_and_later_columns() {
        assert_eq!(
            equals_alias_to_as("SELECT id = t.id, name = t.name FROM t"),
            "SELECT t.id AS id, t.name AS name FROM t"
        );
    }

    #[test]
    fn distinct_and_top_prefixes_are_kept() {
        assert_eq!(
            equals_alias_to_as("SELECT DISTINCT TOP (10) a = b FROM t"),
            "SELECT DISTINCT TOP (10) b AS a FROM t"
        );
        assert_eq!(
            equals_alias_to_as("SELECT TOP 5 PERCENT WITH TIES a = b FROM t"),
            "SELECT TOP 5 PERCENT WITH TIES b AS a FROM t"
        );
    }

    #[test]
    fn bracketed_alias_and_function_expression() {
        assert_eq!(
            equals_alias_to_as("SELECT [Full Name] = CONCAT(first, ' ', last), x FROM p"),
            "SELECT CONCAT(first, ' ', last) AS [Full Name], x FROM p"
        );
    }

    #[test]
    fn case_expression_keeps_inner_comparisons() {
        assert_eq!(
            equals_alias_to_as("SELECT flag = CASE WHEN a = b THEN 1 ELSE 0 END FROM t"),
            "SELECT CASE WHEN a = b THEN 1 ELSE 0 END AS flag FROM t"
        );
    }

    #[test]
    fn where_and_join_comparisons_untouched() {
        let sql = "SELECT a.x FROM a JOIN b ON a.id = b.id WHERE a.k = 1";
        assert_eq!(equals_alias_to_as(sql), sql);
    }

    #[test]
    fn update_set_untouched() {
        let sql = "UPDATE t SET a = b, c = d WHERE e = f";
        assert_eq!(equals_alias_to_as(sql), sql);
    }

    #[test]
    fn variable_assignment_untouched() {
        let sql = "SELECT @total = SUM(x) FROM t";
        assert_eq!(equals_alias_to_as(sql), sql);
    }

    #[test]
    fn subquery_select_lists_are_rewritten() {
        assert_eq!(
            equals_alias_to_as("SELECT n = (SELECT c = COUNT(*) FROM x) FROM t"),
            "SELECT (SELECT COUNT(*) AS c FROM x) AS n FROM t"
        );
    }

    #[test]
    fn multiline_items_keep_layout() {
        assert_eq!(
            equals_alias_to_as("SELECT\n    a = t.a\n    ,b = t.b -- note\nFROM t"),
            "SELECT\n    t.a AS a\n    ,t.b AS b -- note\nFROM t"
        );
    }

    #[test]
    fn template_tags_in_select_list() {
        assert_eq!(
            equals_alias_to_as("SELECT a = x\n{% if y %}, b = y\n{% endif %}\nFROM t"),
            "SELECT x AS a\n{% if y %}, y AS b\n{% endif %}\nFROM t"
        );
    }

    #[test]
    fn cleanup_only_takes_simple_shapes() {
        assert_eq!(
            cleanup_unconverted_equals("SELECT x, `a` = `b`, c = UPPER(d), e = f + 1 FROM t"),
            "SELECT x, `b` AS `a`, UPPER(d) AS c, e = f + 1 FROM t"
        );
    }

    #[test]
    fn case_alias_moves_and_branch_aliases_are_dropped() {
        assert_eq!(
            move_alias_in_case_statements("SELECT x, s = CASE WHEN a THEN b AS ALIAS ELSE c END FROM t"),
            "SELECT x, CASE WHEN a THEN b ELSE c END AS s FROM t"
        );
    }

    #[test]
    fn casts_inside_case_keep_as() {
        let sql = "SELECT CASE WHEN a THEN CAST(b AS INT) ELSE 0 END AS s FROM t";
        assert_eq!(move_alias_in_case_statements(sql), sql);
    }
}
