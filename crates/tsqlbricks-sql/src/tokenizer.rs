//! Lossless T-SQL tokenizer
//!
//! Concatenating the text of every token reproduces the input exactly, so
//! passes can rewrite individual tokens and re-render everything else as-is.
//! Template regions are lexed first and surface as single opaque tokens.

use tsqlbricks_jinja::{classify, TagKind, TemplateRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    /// `'...'` or `N'...'`
    Str,
    /// `[...]`, `"..."` or `` `...` ``
    QuotedIdent,
    Word,
    Number,
    /// Two-character operators such as `<=`, `<>`, `||`, `+=`
    Operator,
    Punct,
    Template(TagKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
}

impl<'a> Token<'a> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Whitespace or comment
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// Trivia, or a template tag that renders no SQL of its own (`{% %}`, `{# #}`)
    pub fn is_layout(&self) -> bool {
        self.is_trivia()
            || matches!(
                self.kind,
                TokenKind::Template(TagKind::Statement) | TokenKind::Template(TagKind::Comment)
            )
    }

    /// Case-insensitive keyword check
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.is_keyword(k))
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct && self.text.len() == c.len_utf8() && self.text.starts_with(c)
    }

    /// A plain or delimited identifier
    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::QuotedIdent)
    }
}

const OPERATORS: [&str; 16] = [
    "<=", ">=", "<>", "!=", "!<", "!>", "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "::",
];

struct Lexer<'a> {
    text: &'a str,
    regions: Vec<TemplateRegion>,
    next_region: usize,
}

impl<'a> Lexer<'a> {
    /// End of the template region starting exactly at `pos`, if any
    fn region_at(&mut self, pos: usize) -> Option<usize> {
        while self.next_region < self.regions.len() && self.regions[self.next_region].start < pos {
            self.next_region += 1;
        }
        match self.regions.get(self.next_region) {
            Some(region) if region.start == pos => Some(region.end),
            _ => None,
        }
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.text[pos..].chars().next()
    }

    /// Scan a delimited run ending at `close`, where a doubled `close` escapes it.
    /// Template regions inside the run are skipped whole.
    fn delimited(&mut self, mut pos: usize, close: char) -> usize {
        while pos < self.text.len() {
            if let Some(end) = self.region_at(pos) {
                pos = end;
                continue;
            }
            let c = match self.char_at(pos) {
                Some(c) => c,
                None => break,
            };
            pos += c.len_utf8();
            if c == close {
                if self.char_at(pos) == Some(close) {
                    pos += close.len_utf8();
                } else {
                    return pos;
                }
            }
        }
        self.text.len()
    }

    fn until(&mut self, mut pos: usize, terminator: &str, inclusive: bool) -> usize {
        while pos < self.text.len() {
            if let Some(end) = self.region_at(pos) {
                pos = end;
                continue;
            }
            if self.text[pos..].starts_with(terminator) {
                return if inclusive { pos + terminator.len() } else { pos };
            }
            pos += self.char_at(pos).map(char::len_utf8).unwrap_or(1);
        }
        self.text.len()
    }

    fn scan_while(&self, mut pos: usize, pred: impl Fn(char) -> bool) -> usize {
        while let Some(c) = self.char_at(pos) {
            if !pred(c) {
                break;
            }
            pos += c.len_utf8();
        }
        pos
    }

    fn next_token(&mut self, pos: usize) -> (TokenKind, usize) {
        if let Some(end) = self.region_at(pos) {
            let kind = self.regions[self.next_region].kind;
            return (TokenKind::Template(kind), end);
        }

        let rest = &self.text[pos..];
        let c = match rest.chars().next() {
            Some(c) => c,
            None => return (TokenKind::Whitespace, pos),
        };

        if c.is_whitespace() {
            return (TokenKind::Whitespace, self.scan_while(pos, char::is_whitespace));
        }
        if rest.starts_with("--") {
            return (TokenKind::LineComment, self.until(pos + 2, "\n", false));
        }
        if rest.starts_with("/*") {
            return (TokenKind::BlockComment, self.until(pos + 2, "*/", true));
        }
        if (c == 'N' || c == 'n') && rest[1..].starts_with('\'') {
            return (TokenKind::Str, self.delimited(pos + 2, '\''));
        }
        match c {
            '\'' => return (TokenKind::Str, self.delimited(pos + 1, '\'')),
            '[' => return (TokenKind::QuotedIdent, self.delimited(pos + 1, ']')),
            '"' => return (TokenKind::QuotedIdent, self.delimited(pos + 1, '"')),
            '`' => return (TokenKind::QuotedIdent, self.delimited(pos + 1, '`')),
            _ => {}
        }
        if c.is_alphabetic() || c == '_' || c == '@' || c == '#' {
            let end = self.scan_while(pos, |c| {
                c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
            });
            return (TokenKind::Word, end);
        }
        if c.is_ascii_digit() {
            let end = self.scan_while(pos, |c| c.is_ascii_alphanumeric() || c == '.');
            return (TokenKind::Number, end);
        }
        if OPERATORS.iter().any(|op| rest.starts_with(op)) {
            return (TokenKind::Operator, pos + 2);
        }
        (TokenKind::Punct, pos + c.len_utf8())
    }
}

/// Tokenize a document. Never fails; unterminated strings, identifiers and
/// comments run to the end of input.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer {
        text,
        regions: classify(text),
        next_region: 0,
    };
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let (kind, end) = lexer.next_token(pos);
        tokens.push(Token { kind, text: &text[pos..end], start: pos });
        pos = end;
    }

    tokens
}

/// Concatenate token texts
pub fn render(tokens: &[Token<'_>]) -> String {
    tokens.iter().map(|t| t.text).collect()
}

/// Index of the next token at or after `from` that is not trivia
pub fn next_significant(tokens: &[Token<'_>], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].is_trivia())
}

/// Index of the closest token before `before` that is not trivia
pub fn prev_significant(tokens: &[Token<'_>], before: usize) -> Option<usize> {
    (0..before.min(tokens.len())).rev().find(|&i| !tokens[i].is_trivia())
}

/// Index of the `)` matching the `(` at `open`
pub fn matching_paren(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split a token run at commas outside parentheses
pub fn split_top_level(tokens: &[Token<'_>]) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            depth -= 1;
        } else if token.is_punct(',') && depth == 0 {
            ranges.push(start..i);
            start = i + 1;
        }
    }
    ranges.push(start..tokens.len());
    ranges
}
