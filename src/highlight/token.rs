//! Token types shared by the line grammar and the rule scanner.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a highlighted span.
///
/// The serialized names are the classes consumed by the host highlighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "comment")]
    Comment,
    #[serde(rename = "label.term")]
    TermLabel,
    #[serde(rename = "label.fact-type")]
    FactTypeLabel,
    #[serde(rename = "label.rule")]
    RuleLabel,
    #[serde(rename = "term")]
    Term,
    #[serde(rename = "verb")]
    Verb,
    #[serde(rename = "modal-operator")]
    ModalOperator,
    #[serde(rename = "quantification")]
    Quantification,
    #[serde(rename = "other")]
    Other,
    /// Whitespace and plain separators
    #[serde(rename = "text")]
    Text,
    /// Input no grammar rule accounted for
    #[serde(rename = "free-text")]
    FreeText,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Comment => "comment",
            TokenKind::TermLabel => "label.term",
            TokenKind::FactTypeLabel => "label.fact-type",
            TokenKind::RuleLabel => "label.rule",
            TokenKind::Term => "term",
            TokenKind::Verb => "verb",
            TokenKind::ModalOperator => "modal-operator",
            TokenKind::Quantification => "quantification",
            TokenKind::Other => "other",
            TokenKind::Text => "text",
            TokenKind::FreeText => "free-text",
        }
    }

    /// Whitespace tokens are not significant for lookback decisions
    pub fn is_significant(&self) -> bool {
        !matches!(self, TokenKind::Text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single highlighted span of a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(value: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(value, TokenKind::Text)
    }
}

/// Split `span` into leading whitespace, core and trailing whitespace,
/// emitting the whitespace as `text` and the core as `kind`.
pub(crate) fn push_trimmed(tokens: &mut Vec<Token>, span: &str, kind: TokenKind) {
    if span.is_empty() {
        return;
    }
    let core = span.trim();
    if core.is_empty() {
        tokens.push(Token::text(span));
        return;
    }
    let lead_len = span.len() - span.trim_start().len();
    let core_end = lead_len + core.len();
    if lead_len > 0 {
        tokens.push(Token::text(&span[..lead_len]));
    }
    tokens.push(Token::new(core, kind));
    if core_end < span.len() {
        tokens.push(Token::text(&span[core_end..]));
    }
}

/// Emit a run of filler words: each word as `kind`, whitespace as `text`.
pub(crate) fn push_words(tokens: &mut Vec<Token>, span: &str, kind: TokenKind) {
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (idx, ch) in span.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != is_space => {
                push_run(tokens, &span[start..idx], prev, kind);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if let Some(prev) = in_space {
        push_run(tokens, &span[start..], prev, kind);
    }
}

fn push_run(tokens: &mut Vec<Token>, run: &str, is_space: bool, kind: TokenKind) {
    if is_space {
        tokens.push(Token::text(run));
    } else {
        tokens.push(Token::new(run, kind));
    }
}
