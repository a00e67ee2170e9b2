//! VocabularyContext: Everything the tokenizer reads, owned by one session
//!
//! Store, compiled patterns and grammar always change together under
//! `&mut self`, so a tokenization can never observe a half-applied update.

use crate::highlight::config::HighlightConfig;
use crate::highlight::grammar::{Grammar, LineState, LineTokens};
use crate::highlight::pattern::PatternSet;
use crate::highlight::vocabulary::{CollectionName, VocabularyStore};

pub struct VocabularyContext {
    config: HighlightConfig,
    store: VocabularyStore,
    patterns: PatternSet,
    grammar: Grammar,
    generation: u32,
}

impl Default for VocabularyContext {
    fn default() -> Self {
        Self::new(HighlightConfig::default())
    }
}

impl VocabularyContext {
    /// Empty vocabulary: every vocabulary category is unusable until the
    /// first update arrives.
    pub fn new(config: HighlightConfig) -> Self {
        let store = VocabularyStore::new();
        let patterns = PatternSet::build(&store, &config);
        let grammar = Grammar::build(&patterns, &config);
        Self {
            config,
            store,
            patterns,
            grammar,
            generation: 0,
        }
    }

    /// Replace the incoming collections, recompile what changed and rebuild
    /// the grammar. Returns the changed collections.
    pub fn update<I, K>(&mut self, incoming: I) -> Vec<CollectionName>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let changed = self.store.update(incoming);
        self.patterns.recompile(&self.store, &self.config, &changed);
        self.grammar = Grammar::build(&self.patterns, &self.config);
        self.generation = self.generation.wrapping_add(1);
        tracing::debug!(
            "vocabulary generation {}: {} collections changed, {} phrases",
            self.generation,
            changed.len(),
            self.store.phrase_count()
        );
        changed
    }

    pub fn tokenize_line(&self, state: LineState, line: &str) -> LineTokens {
        self.grammar.tokenize_line(state, line)
    }

    pub fn tokenize_document(&self, text: &str) -> Vec<LineTokens> {
        self.grammar.tokenize_document(text)
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn store(&self) -> &VocabularyStore {
        &self.store
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Number of updates applied so far
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
