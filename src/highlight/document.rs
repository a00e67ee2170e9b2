//! TokenizedDocument: Per-line token cache with incremental re-tokenization
//!
//! # Architecture
//! - Every line keeps its tokens and the state it hands to the next line
//! - Edits mark a dirty region; `retokenize` walks forward from it
//! - After the edited lines, walking stops as soon as a line ends in the same
//!   state as before, since nothing below can change
//! - Vocabulary updates invalidate from line 0 with no early stop

use serde::{Deserialize, Serialize};

use crate::highlight::channel::DocumentSource;
use crate::highlight::grammar::{split_lines, Grammar, LineState, LineTokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dirty {
    from: usize,
    /// Lines before this index are re-tokenized unconditionally
    force_until: usize,
}

impl Dirty {
    fn merge(self, other: Dirty) -> Dirty {
        Dirty {
            from: self.from.min(other.from),
            force_until: self.force_until.max(other.force_until),
        }
    }
}

/// Statistics for one `retokenize` pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetokenizeStats {
    pub from_line: usize,
    pub lines_tokenized: usize,
    /// Stopped before the end because line states converged
    pub converged: bool,
    pub elapsed_us: u64,
}

/// Document lines plus their cached tokenization
#[derive(Debug, Clone, Default)]
pub struct TokenizedDocument {
    lines: Vec<String>,
    results: Vec<LineTokens>,
    dirty: Option<Dirty>,
}

impl TokenizedDocument {
    pub fn new(text: &str) -> Self {
        let mut doc = Self::default();
        doc.set_text(text);
        doc
    }

    /// Replace the whole text
    pub fn set_text(&mut self, text: &str) {
        self.lines = split_lines(text).map(str::to_string).collect();
        self.results.clear();
        self.mark(Dirty {
            from: 0,
            force_until: usize::MAX,
        });
    }

    /// Replace line `index`, or append when `index` is one past the end.
    /// Returns false for indices further out.
    pub fn update_line(&mut self, index: usize, text: &str) -> bool {
        match index.cmp(&self.lines.len()) {
            std::cmp::Ordering::Less => self.lines[index] = text.to_string(),
            std::cmp::Ordering::Equal => self.lines.push(text.to_string()),
            std::cmp::Ordering::Greater => return false,
        }
        self.mark(Dirty {
            from: index,
            force_until: index + 1,
        });
        true
    }

    /// Remove line `index`
    pub fn remove_line(&mut self, index: usize) -> bool {
        if index >= self.lines.len() {
            return false;
        }
        self.lines.remove(index);
        if index < self.results.len() {
            self.results.remove(index);
        }
        // The following line now starts from a different predecessor
        self.mark(Dirty {
            from: index,
            force_until: index + 1,
        });
        true
    }

    /// Forget everything from `from_line` on
    pub fn invalidate_from(&mut self, from_line: usize) {
        self.mark(Dirty {
            from: from_line,
            force_until: usize::MAX,
        });
    }

    fn mark(&mut self, dirty: Dirty) {
        self.dirty = Some(match self.dirty {
            Some(existing) => existing.merge(dirty),
            None => dirty,
        });
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Bring the cache up to date with `grammar`
    pub fn retokenize(&mut self, grammar: &Grammar) -> RetokenizeStats {
        let started = instant::Instant::now();
        let Some(dirty) = self.dirty.take() else {
            return RetokenizeStats::default();
        };

        let from = dirty.from.min(self.results.len()).min(self.lines.len());
        let mut state = match from {
            0 => LineState::Start,
            n => self.results[n - 1].state,
        };

        let mut stats = RetokenizeStats {
            from_line: from,
            ..RetokenizeStats::default()
        };

        for index in from..self.lines.len() {
            let fresh = grammar.tokenize_line(state, &self.lines[index]);
            stats.lines_tokenized += 1;
            state = fresh.state;

            let unchanged_exit = self
                .results
                .get(index)
                .is_some_and(|old| old.state == fresh.state);

            if index < self.results.len() {
                self.results[index] = fresh;
            } else {
                self.results.push(fresh);
            }

            if index + 1 >= dirty.force_until && unchanged_exit && index + 1 < self.lines.len() {
                stats.converged = true;
                break;
            }
        }

        self.results.truncate(self.lines.len());
        stats.elapsed_us = started.elapsed().as_micros() as u64;
        tracing::trace!(
            "retokenized {} lines from {} (converged: {})",
            stats.lines_tokenized,
            stats.from_line,
            stats.converged
        );
        stats
    }

    /// Cached tokens of a line; None when out of range or not yet tokenized
    pub fn line_tokens(&self, index: usize) -> Option<&LineTokens> {
        self.results.get(index)
    }

    pub fn results(&self) -> &[LineTokens] {
        &self.results
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl DocumentSource for TokenizedDocument {
    fn request_retokenize(&mut self, from_line: usize) {
        self.invalidate_from(from_line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::config::HighlightConfig;
    use crate::highlight::pattern::PatternSet;
    use crate::highlight::token::TokenKind;
    use crate::highlight::vocabulary::VocabularyStore;

    fn grammar(terms: &[&str]) -> Grammar {
        let config = HighlightConfig::default();
        let mut store = VocabularyStore::new();
        store.update([("terms", terms.iter().map(|s| s.to_string()).collect())]);
        Grammar::build(&PatternSet::build(&store, &config), &config)
    }

    #[test]
    fn test_full_tokenization() {
        let g = grammar(&["car"]);
        let mut doc = TokenizedDocument::new("Term: car\n# note\nRule: car");
        let stats = doc.retokenize(&g);

        assert_eq!(stats.lines_tokenized, 3);
        assert!(!stats.converged);
        assert_eq!(doc.results().len(), 3);
        assert_eq!(doc.line_tokens(1).unwrap().tokens[0].kind, TokenKind::Comment);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_clean_document_does_nothing() {
        let g = grammar(&[]);
        let mut doc = TokenizedDocument::new("a\nb");
        doc.retokenize(&g);
        assert_eq!(doc.retokenize(&g).lines_tokenized, 0);
    }

    #[test]
    fn test_line_edit_stops_when_states_converge() {
        let g = grammar(&["car"]);
        let text = (0..20).map(|i| format!("# line {}", i)).collect::<Vec<_>>().join("\n");
        let mut doc = TokenizedDocument::new(&text);
        doc.retokenize(&g);

        doc.update_line(5, "Term: car");
        let stats = doc.retokenize(&g);
        assert_eq!(stats.from_line, 5);
        assert_eq!(stats.lines_tokenized, 1);
        assert!(stats.converged);
        assert_eq!(doc.line_tokens(5).unwrap().tokens[2].kind, TokenKind::Term);
    }

    #[test]
    fn test_state_change_propagates() {
        let g = grammar(&["car"]);
        let mut doc = TokenizedDocument::new("# intro\ncar\n# end");
        doc.retokenize(&g);
        assert_eq!(doc.line_tokens(1).unwrap().tokens[0].kind, TokenKind::FreeText);

        // A dangling label hands the `term` state to the next line
        doc.update_line(0, "Term: ");
        let stats = doc.retokenize(&g);
        assert_eq!(stats.lines_tokenized, 2);
        assert!(stats.converged);
        assert_eq!(doc.line_tokens(1).unwrap().tokens[0].kind, TokenKind::Term);
    }

    #[test]
    fn test_invalidate_ignores_convergence() {
        let g = grammar(&[]);
        let mut doc = TokenizedDocument::new("a\nb\nc");
        doc.retokenize(&g);

        doc.invalidate_from(0);
        let stats = doc.retokenize(&g);
        assert_eq!(stats.lines_tokenized, 3);
        assert!(!stats.converged);
    }

    #[test]
    fn test_trailing_newline_is_a_line() {
        let g = grammar(&["car"]);
        let mut doc = TokenizedDocument::new("Term: car\n");
        assert_eq!(doc.line_count(), 2);
        doc.retokenize(&g);
        assert_eq!(doc.results().len(), 2);
        assert!(doc.line_tokens(1).unwrap().tokens.is_empty());
        assert!(doc.update_line(1, "Rule: car"));
    }

    #[test]
    fn test_append_and_remove_lines() {
        let g = grammar(&["car"]);
        let mut doc = TokenizedDocument::new("Term: car");
        doc.retokenize(&g);

        assert!(doc.update_line(1, "Rule: car"));
        assert!(!doc.update_line(5, "nope"));
        doc.retokenize(&g);
        assert_eq!(doc.results().len(), 2);

        assert!(doc.remove_line(0));
        doc.retokenize(&g);
        assert_eq!(doc.results().len(), 1);
        assert_eq!(doc.line_tokens(0).unwrap().tokens[0].kind, TokenKind::RuleLabel);
        assert_eq!(doc.line_count(), 1);
    }
}
