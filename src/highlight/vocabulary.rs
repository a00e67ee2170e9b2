//! VocabularyStore: Named phrase collections supplied by the parser
//!
//! Collections are replaced wholesale on every update. Names the store does
//! not know are ignored so the parser can add categories without breaking
//! older highlighters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::highlight::token::TokenKind;

// =============================================================================
// Collection names
// =============================================================================

/// The known vocabulary categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionName {
    Conditions,
    Facts,
    Modalities,
    Other,
    Quantifications,
    Relations,
    SpecialFacts,
    Terms,
    Verbs,
}

impl CollectionName {
    pub const ALL: [CollectionName; 9] = [
        CollectionName::Conditions,
        CollectionName::Facts,
        CollectionName::Modalities,
        CollectionName::Other,
        CollectionName::Quantifications,
        CollectionName::Relations,
        CollectionName::SpecialFacts,
        CollectionName::Terms,
        CollectionName::Verbs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Conditions => "conditions",
            CollectionName::Facts => "facts",
            CollectionName::Modalities => "modalities",
            CollectionName::Other => "other",
            CollectionName::Quantifications => "quantifications",
            CollectionName::Relations => "relations",
            CollectionName::SpecialFacts => "specialFacts",
            CollectionName::Terms => "terms",
            CollectionName::Verbs => "verbs",
        }
    }

    /// Token kind a phrase from this collection is highlighted as, if any
    pub fn token_kind(&self) -> Option<TokenKind> {
        match self {
            CollectionName::Terms => Some(TokenKind::Term),
            CollectionName::Verbs => Some(TokenKind::Verb),
            CollectionName::Modalities => Some(TokenKind::ModalOperator),
            CollectionName::Quantifications => Some(TokenKind::Quantification),
            CollectionName::Other => Some(TokenKind::Other),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or(())
    }
}

// =============================================================================
// Payload decoding
// =============================================================================

/// Decode one collection from the parser payload.
///
/// Accepts an array of phrases or an object `{ key: phrase }`. Object keys
/// only provide iteration order: integer keys ascending, then the rest.
/// Anything else, and any non-string phrase, decodes as nothing.
pub fn phrases_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| match (index_key(a), index_key(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.cmp(b),
            });
            entries
                .into_iter()
                .filter_map(|(_, v)| v.as_str().map(str::to_string))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Canonical array-index keys ("0", "12", not "012")
fn index_key(key: &str) -> Option<u32> {
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse().ok()
}

// =============================================================================
// VocabularyStore
// =============================================================================

/// Per-session registry of vocabulary collections
#[derive(Debug, Clone, Default)]
pub struct VocabularyStore {
    collections: HashMap<CollectionName, Vec<String>>,
}

impl VocabularyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every known collection present in `incoming`.
    ///
    /// Returns the collections whose contents actually changed, in schema
    /// order. Collections absent from `incoming` keep their contents.
    pub fn update<I, K>(&mut self, incoming: I) -> Vec<CollectionName>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut changed = Vec::new();

        for (name, phrases) in incoming {
            let Ok(name) = name.as_ref().parse::<CollectionName>() else {
                tracing::trace!("ignoring unknown collection '{}'", name.as_ref());
                continue;
            };
            let current = self.collections.entry(name).or_default();
            if *current != phrases {
                *current = phrases;
                if !changed.contains(&name) {
                    changed.push(name);
                }
            }
        }

        changed.sort();
        changed
    }

    /// Phrases of a collection in arrival order
    pub fn get(&self, name: CollectionName) -> &[String] {
        self.collections
            .get(&name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of phrases across all collections
    pub fn phrase_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.phrase_count() == 0
    }

    /// Phrases starting with `prefix` (case-insensitive), for editor completion.
    ///
    /// Highlighted categories only, terms first. Each phrase appears once.
    pub fn completions(&self, prefix: &str, limit: usize) -> Vec<Completion> {
        const ORDER: [CollectionName; 5] = [
            CollectionName::Terms,
            CollectionName::Verbs,
            CollectionName::Modalities,
            CollectionName::Quantifications,
            CollectionName::Other,
        ];

        if limit == 0 || self.is_empty() {
            return Vec::new();
        }

        let needle = prefix.to_lowercase();
        let mut out: Vec<Completion> = Vec::new();

        'outer: for name in ORDER {
            let Some(kind) = name.token_kind() else { continue };
            for phrase in self.get(name) {
                if out.len() >= limit {
                    break 'outer;
                }
                if phrase.is_empty() || !phrase.to_lowercase().starts_with(&needle) {
                    continue;
                }
                if out.iter().any(|c| c.phrase == *phrase) {
                    continue;
                }
                out.push(Completion {
                    phrase: phrase.clone(),
                    kind,
                });
            }
        }

        out
    }
}

/// A completion candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub phrase: String,
    pub kind: TokenKind,
}
