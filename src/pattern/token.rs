use regex::Regex;
use std::sync::Arc;

/// A single typed element of a compiled pattern.
///
/// `Static` values carry raw bytes as authored (including literal `.`
/// and `/` separators) — the radix tree matches on bytes, not
/// pre-split segments, so separators are ordinary content for prefix
/// comparison purposes.
#[derive(Debug, Clone)]
pub enum TokenKind {
    Static(String),
    Param { name: String, regex: Option<Arc<Regex>> },
    Wildcard { name: String, regex: Option<Arc<Regex>> },
}

/// One element of a parsed pattern's token stream.
///
/// `host_boundary` is set on the last token belonging to the hostname
/// portion of a pattern (always `false` for patterns with no
/// hostname prefix). `Tree::insert` uses it to mark the node it lands
/// on as `is_host_boundary`.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub host_boundary: bool,
}

impl Token {
    pub fn static_bytes(value: impl Into<String>) -> Self {
        Token {
            kind: TokenKind::Static(value.into()),
            host_boundary: false,
        }
    }

    pub fn param(name: impl Into<String>, regex: Option<Arc<Regex>>) -> Self {
        Token {
            kind: TokenKind::Param {
                name: name.into(),
                regex,
            },
            host_boundary: false,
        }
    }

    pub fn wildcard(name: impl Into<String>, regex: Option<Arc<Regex>>) -> Self {
        Token {
            kind: TokenKind::Wildcard {
                name: name.into(),
                regex,
            },
            host_boundary: false,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        !matches!(self.kind, TokenKind::Static(_))
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, TokenKind::Wildcard { .. })
    }
}

/// Output of `Parser::parse`: the token stream ready to drive
/// `Tree::insert` without reparsing, plus the metadata insert needs.
#[derive(Debug, Clone)]
pub struct ParsedPattern {
    pub tokens: Vec<Token>,
    pub param_count: usize,
    /// Byte offset into the original pattern string where the path
    /// portion begins (0 if the pattern carries no hostname).
    pub host_split: usize,
}
