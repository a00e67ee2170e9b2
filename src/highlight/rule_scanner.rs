//! RuleScanner: Cursor-driven tokenizer for `Rule:` bodies
//!
//! Rule bodies interleave modal operators, quantifications, terms and verbs
//! with free text in no fixed layout, so instead of one line pattern the body
//! is scanned left to right. At each cursor the categories are tried in
//! priority order:
//!
//! 1. a single whitespace character
//! 2. modal operators
//! 3. quantifications
//! 4. terms
//! 5. verbs
//! 6. other
//!
//! A vocabulary category only matches when the phrase is followed by a space
//! or the end of the line. The space is emitted as its own `text` token.
//! When nothing matches, the next word becomes `other`, so the cursor always
//! advances.

use regex::Regex;

use crate::highlight::pattern::{CompiledPattern, PatternSet};
use crate::highlight::token::{Token, TokenKind};
use crate::highlight::vocabulary::CollectionName;

/// Categories in priority order (after whitespace)
const PRIORITY: [(CollectionName, TokenKind); 5] = [
    (CollectionName::Modalities, TokenKind::ModalOperator),
    (CollectionName::Quantifications, TokenKind::Quantification),
    (CollectionName::Terms, TokenKind::Term),
    (CollectionName::Verbs, TokenKind::Verb),
    (CollectionName::Other, TokenKind::Other),
];

/// Articles that only quantify right after a modal operator
const ARTICLES: [&str; 2] = ["a", "the"];

struct Category {
    kind: TokenKind,
    regex: Regex,
}

/// Scanner for rule bodies, built from one session's patterns
pub struct RuleScanner {
    categories: Vec<Category>,
}

impl RuleScanner {
    pub fn new(patterns: &PatternSet) -> Self {
        let categories = PRIORITY
            .iter()
            .filter_map(|&(name, kind)| {
                let regex = anchored_word(patterns.get(name))?;
                Some(Category { kind, regex })
            })
            .collect();

        Self { categories }
    }

    /// Number of categories with a usable pattern
    pub fn active_categories(&self) -> usize {
        self.categories.len()
    }

    /// Tokenize a rule body, appending to `tokens`.
    pub fn scan(&self, body: &str, tokens: &mut Vec<Token>) {
        let mut cursor = 0;
        let mut last_significant: Option<TokenKind> = None;

        while cursor < body.len() {
            let rest = &body[cursor..];

            if let Some(ws) = rest.chars().next().filter(|c| c.is_whitespace()) {
                tokens.push(Token::text(&rest[..ws.len_utf8()]));
                cursor += ws.len_utf8();
                continue;
            }

            let emitted = tokens.len();
            let consumed = match self.scan_category(rest, last_significant, tokens) {
                Some(consumed) => consumed,
                None => {
                    // Fallback: the next word as free text
                    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                    tokens.push(Token::new(&rest[..end], TokenKind::Other));
                    end
                }
            };

            if let Some(kind) = tokens[emitted..]
                .iter()
                .rev()
                .map(|t| t.kind)
                .find(TokenKind::is_significant)
            {
                last_significant = Some(kind);
            }
            cursor += consumed;
        }
    }

    /// Try each category at the start of `rest`. Returns bytes consumed.
    fn scan_category(
        &self,
        rest: &str,
        last_significant: Option<TokenKind>,
        tokens: &mut Vec<Token>,
    ) -> Option<usize> {
        for category in &self.categories {
            let Some(found) = category.regex.find(rest) else {
                continue;
            };
            let matched = found.as_str();
            let (value, trailing_space) = match matched.strip_suffix(' ') {
                Some(value) => (value, true),
                None => (matched, false),
            };
            if value.is_empty() {
                continue;
            }

            tokens.push(Token::new(value, disambiguate(category.kind, value, last_significant)));
            if trailing_space {
                tokens.push(Token::text(" "));
            }
            return Some(found.end());
        }
        None
    }
}

/// Bare articles are ordinary words unless a modal operator precedes them.
fn disambiguate(kind: TokenKind, value: &str, last_significant: Option<TokenKind>) -> TokenKind {
    if kind == TokenKind::Quantification
        && ARTICLES.contains(&value)
        && last_significant != Some(TokenKind::ModalOperator)
    {
        return TokenKind::Other;
    }
    kind
}

/// `^(?:alternation)(?: |$)`, or None for unusable patterns
fn anchored_word(pattern: &CompiledPattern) -> Option<Regex> {
    let source = pattern.source()?;
    match Regex::new(&format!("^{}(?: |$)", source)) {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::warn!("rule category pattern rejected: {}", err);
            None
        }
    }
}
