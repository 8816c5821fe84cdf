//! Template region classification
//!
//! A small lexer with an explicit mode stack. Default mode is plain SQL; an
//! opening marker enters tag mode, where quoted strings and bracket groups
//! are tracked so that a closing marker inside a Jinja string or dict literal
//! does not end the region.

use std::ops::Range;

/// Which kind of template tag a region is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `{{ ... }}`
    Expression,

    /// `{% ... %}`
    Statement,

    /// `{# ... #}`
    Comment,
}

impl TagKind {
    fn from_opening(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b'{', b'{', ..] => Some(Self::Expression),
            [b'{', b'%', ..] => Some(Self::Statement),
            [b'{', b'#', ..] => Some(Self::Comment),
            _ => None,
        }
    }

    /// Closing marker for this tag kind
    pub fn closer(&self) -> &'static str {
        match self {
            Self::Expression => "}}",
            Self::Statement => "%}",
            Self::Comment => "#}",
        }
    }
}

/// A template-owned span `[start, end)` of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRegion {
    pub start: usize,
    pub end: usize,
    pub kind: TagKind,

    /// False when the input ended before the closing marker
    pub terminated: bool,
}

impl TemplateRegion {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Region text within its document
    pub fn text<'a>(&self, document: &'a str) -> &'a str {
        &document[self.range()]
    }

    /// Text between the markers, without `-` whitespace-control and padding
    pub fn inner<'a>(&self, document: &'a str) -> &'a str {
        let text = self.text(document);
        let body = &text[2..];
        let body = if self.terminated { &body[..body.len().saturating_sub(2)] } else { body };
        body.trim_start_matches('-').trim_end_matches('-').trim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Tag(TagKind),
    Str(u8),
    Group(u8),
}

/// Classify every template region in `text`, left to right.
///
/// Regions never overlap. A stray closing marker outside a tag is plain
/// text; an unterminated opening marker owns the rest of the input.
pub fn classify(text: &str) -> Vec<TemplateRegion> {
    let bytes = text.as_bytes();
    let mut regions = Vec::new();
    let mut stack: Vec<Mode> = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match stack.last().copied() {
            None => {
                if let Some(kind) = TagKind::from_opening(&bytes[i..]) {
                    stack.push(Mode::Tag(kind));
                    start = i;
                    i += 2;
                    continue;
                }
            }
            Some(Mode::Tag(kind)) => {
                if bytes[i..].starts_with(kind.closer().as_bytes()) {
                    i += 2;
                    regions.push(TemplateRegion { start, end: i, kind, terminated: true });
                    stack.clear();
                    continue;
                }
                if kind != TagKind::Comment {
                    push_nested(&mut stack, b);
                }
            }
            Some(Mode::Str(quote)) => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == quote {
                    stack.pop();
                }
            }
            Some(Mode::Group(closer)) => {
                if b == closer {
                    stack.pop();
                } else {
                    push_nested(&mut stack, b);
                }
            }
        }
        i += 1;
    }

    if let Some(Mode::Tag(kind)) = stack.first().copied() {
        regions.push(TemplateRegion { start, end: bytes.len(), kind, terminated: false });
    }

    regions
}

fn push_nested(stack: &mut Vec<Mode>, b: u8) {
    match b {
        b'\'' | b'"' => stack.push(Mode::Str(b)),
        b'(' => stack.push(Mode::Group(b')')),
        b'[' => stack.push(Mode::Group(b']')),
        b'{' => stack.push(Mode::Group(b'}')),
        _ => {}
    }
}
