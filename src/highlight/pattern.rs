//! PatternCompiler: One alternation pattern per vocabulary collection
//!
//! Entries are escaped literals joined longest-first, so that a leftmost-first
//! regex engine prefers "a b" over its prefix "a". The output is always a
//! single non-capturing group and can be embedded in larger line patterns
//! without disturbing their named slots.
//!
//! A collection that yields no usable entries is tagged `Unusable` instead of
//! producing a pattern that matches nothing.

use regex::Regex;
use std::collections::HashMap;

use crate::highlight::config::HighlightConfig;
use crate::highlight::error::HighlightError;
use crate::highlight::vocabulary::{CollectionName, VocabularyStore};

/// Digit pattern substituted for the quantity placeholder
const QUANTITY_PATTERN: &str = r"\d+";

// =============================================================================
// CompiledPattern
// =============================================================================

/// Why a collection produced no pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unusable {
    /// No non-empty entries
    Empty,
    /// The assembled alternation was rejected by the regex engine
    Invalid(String),
}

/// Compiled alternation for one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledPattern {
    Usable {
        /// `(?:longest|…|shortest)`
        source: String,
        alternatives: usize,
    },
    Unusable(Unusable),
}

impl CompiledPattern {
    /// Pattern source, or None when the pattern can never match
    pub fn source(&self) -> Option<&str> {
        match self {
            CompiledPattern::Usable { source, .. } => Some(source),
            CompiledPattern::Unusable(_) => None,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, CompiledPattern::Usable { .. })
    }

    pub fn alternatives(&self) -> usize {
        match self {
            CompiledPattern::Usable { alternatives, .. } => *alternatives,
            CompiledPattern::Unusable(_) => 0,
        }
    }
}

// =============================================================================
// Compilation
// =============================================================================

/// Compile one collection.
///
/// Only `quantifications` has an entry transform: the configured placeholder
/// becomes `\d+`.
pub fn compile(
    name: CollectionName,
    phrases: &[String],
    config: &HighlightConfig,
) -> CompiledPattern {
    let placeholder = match name {
        CollectionName::Quantifications if !config.quantity_placeholder.is_empty() => {
            Some(config.quantity_placeholder.as_str())
        }
        _ => None,
    };
    build(name.as_str(), phrases.iter().map(String::as_str), placeholder)
}

/// Compile the verb pattern: vocabulary verbs plus the special copula verbs,
/// competing in the same longest-first ordering.
pub fn compile_verbs(verbs: &[String], config: &HighlightConfig) -> CompiledPattern {
    let merged = verbs
        .iter()
        .chain(config.special_verbs.iter())
        .map(String::as_str);
    build(CollectionName::Verbs.as_str(), merged, None)
}

fn build<'a>(
    label: &str,
    phrases: impl Iterator<Item = &'a str>,
    placeholder: Option<&str>,
) -> CompiledPattern {
    let mut entries: Vec<&str> = phrases.filter(|p| !p.trim().is_empty()).collect();
    if entries.is_empty() {
        return CompiledPattern::Unusable(Unusable::Empty);
    }

    // Stable: equal lengths keep arrival order
    entries.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let escaped_placeholder = placeholder.map(regex::escape);
    let alternatives: Vec<String> = entries
        .iter()
        .map(|entry| {
            let escaped = regex::escape(entry);
            match &escaped_placeholder {
                Some(marker) => escaped.replace(marker.as_str(), QUANTITY_PATTERN),
                None => escaped,
            }
        })
        .collect();

    let source = format!("(?:{})", alternatives.join("|"));
    if let Err(err) = Regex::new(&source) {
        let err = HighlightError::Pattern {
            collection: label.to_string(),
            source: err,
        };
        tracing::warn!("{}", err);
        return CompiledPattern::Unusable(Unusable::Invalid(err.to_string()));
    }

    CompiledPattern::Usable {
        source,
        alternatives: alternatives.len(),
    }
}

// =============================================================================
// PatternSet
// =============================================================================

/// The compiled patterns of one session, keyed by collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    patterns: HashMap<CollectionName, CompiledPattern>,
}

impl PatternSet {
    /// Compile every collection of `store`
    pub fn build(store: &VocabularyStore, config: &HighlightConfig) -> Self {
        let mut set = Self {
            patterns: HashMap::new(),
        };
        set.recompile(store, config, &CollectionName::ALL);
        set
    }

    /// Recompile only the given collections
    pub fn recompile(
        &mut self,
        store: &VocabularyStore,
        config: &HighlightConfig,
        changed: &[CollectionName],
    ) {
        for &name in changed {
            let pattern = match name {
                CollectionName::Verbs => compile_verbs(store.get(name), config),
                _ => compile(name, store.get(name), config),
            };
            tracing::debug!(
                "compiled '{}' ({} alternatives)",
                name,
                pattern.alternatives()
            );
            self.patterns.insert(name, pattern);
        }
    }

    pub fn get(&self, name: CollectionName) -> &CompiledPattern {
        static EMPTY: CompiledPattern = CompiledPattern::Unusable(Unusable::Empty);
        self.patterns.get(&name).unwrap_or(&EMPTY)
    }

    /// Collections with no usable pattern, for diagnostics
    pub fn unusable(&self) -> Vec<(CollectionName, Unusable)> {
        let mut out: Vec<_> = self
            .patterns
            .iter()
            .filter_map(|(name, pattern)| match pattern {
                CompiledPattern::Unusable(reason) => Some((*name, reason.clone())),
                CompiledPattern::Usable { .. } => None,
            })
            .collect();
        out.sort_by_key(|(name, _)| *name);
        out
    }
}
