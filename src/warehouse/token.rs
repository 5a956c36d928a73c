//! Token model for the external tokenizer contract
//!
//! The tokenizer is a black box that produces an ordered token sequence
//! from a buffer already normalized to NFC and a single line-ending
//! convention. Each token carries a type string, an optional secondary
//! tag, a nesting delta, an optional raw line-range map, an optional
//! content payload, and (for inline containers) nested child tokens.
//! Tokens are immutable for the lifetime of a warehouse.

use std::fmt;

/// Nesting delta of a token: opens a scope, closes one, or neither
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Nesting {
    /// +1: opens a structural scope
    Open,
    /// 0: self-closing, no scope change
    SelfClosing,
    /// -1: closes a structural scope
    Close,
}

impl TryFrom<i8> for Nesting {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Nesting::Open),
            0 => Ok(Nesting::SelfClosing),
            -1 => Ok(Nesting::Close),
            other => Err(format!("invalid nesting delta {} (expected -1, 0 or 1)", other)),
        }
    }
}

impl From<Nesting> for i8 {
    fn from(nesting: Nesting) -> i8 {
        match nesting {
            Nesting::Open => 1,
            Nesting::SelfClosing => 0,
            Nesting::Close => -1,
        }
    }
}

impl fmt::Display for Nesting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Nesting::Open => "open",
            Nesting::SelfClosing => "self-closing",
            Nesting::Close => "close",
        };
        write!(f, "{}", name)
    }
}

/// A validated, half-open line range `[start, end)` in the normalized buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    /// Validate a raw tokenizer map. Negative or inverted ranges are
    /// rejected rather than propagated; the token is simply left without
    /// a valid mapping.
    pub fn from_raw(raw: (i64, i64)) -> Option<LineSpan> {
        let (start, end) = raw;
        if start < 0 || end < 0 || end < start {
            return None;
        }
        Some(LineSpan {
            start: start as usize,
            end: end as usize,
        })
    }
}

/// One token as produced by the external tokenizer
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Token {
    /// Type string, e.g. "heading_open", "fence", "text"
    pub kind: String,
    /// Optional secondary key, e.g. an HTML tag name like "h2"
    #[serde(default)]
    pub tag: Option<String>,
    /// Nesting delta
    pub nesting: Nesting,
    /// Raw line-range map as given by the tokenizer; validated during
    /// index building, never trusted directly
    #[serde(default)]
    pub map: Option<(i64, i64)>,
    /// Content payload for textual tokens
    #[serde(default)]
    pub content: String,
    /// Nested inline tokens, for inline containers only
    #[serde(default)]
    pub children: Vec<Token>,
}

impl Token {
    /// Create a token with the given kind and nesting; other fields empty
    pub fn new(kind: impl Into<String>, nesting: Nesting) -> Token {
        Token {
            kind: kind.into(),
            tag: None,
            nesting,
            map: None,
            content: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Token {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_map(mut self, start: i64, end: i64) -> Token {
        self.map = Some((start, end));
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Token {
        self.content = content.into();
        self
    }

    pub fn with_children(mut self, children: Vec<Token>) -> Token {
        self.children = children;
        self
    }

    /// Whether this token's content participates in text extraction
    pub fn is_textual(&self) -> bool {
        matches!(self.kind.as_str(), "text" | "code_inline")
    }

    /// Heading level 1-6 derived from an "h1".."h6" tag, if present
    pub fn heading_level(&self) -> Option<u8> {
        let tag = self.tag.as_deref()?;
        let digit = tag.strip_prefix('h')?;
        match digit.parse::<u8>() {
            Ok(level @ 1..=6) => Some(level),
            _ => None,
        }
    }
}

/// Collect textual fragments from a token, descending into inline children.
///
/// Fragments are pushed in document order. Callers decide how to join them;
/// heading-title extraction joins with no separator so that emphasis
/// boundaries inside a heading never introduce spurious spaces.
pub(crate) fn collect_fragments(token: &Token, out: &mut Vec<String>) {
    if !token.children.is_empty() {
        for child in &token.children {
            collect_fragments(child, out);
        }
        return;
    }
    if token.is_textual() && !token.content.is_empty() {
        out.push(token.content.clone());
    }
}
