//! VocabularyUpdateChannel: Applying parser results to a session
//!
//! The parser answers with
//! ```json
//! { "collections": { "terms": { "0": "medicine" }, "errors": { "3": "Unknown term" } } }
//! ```
//! Each delivery replaces the annotations, updates the vocabulary, rebuilds
//! the grammar and asks the document to re-tokenize from line 0. Deliveries
//! apply in arrival order; the last one wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::highlight::context::VocabularyContext;
use crate::highlight::error::{HighlightError, Result};
use crate::highlight::vocabulary::{phrases_from_value, CollectionName};

// =============================================================================
// Collaborator seams
// =============================================================================

/// Receives the full annotation set after every update
pub trait AnnotationSink {
    fn set_annotations(&mut self, annotations: &[Annotation]);
}

/// The open document, as far as the channel needs it
pub trait DocumentSource {
    /// Everything from `from_line` on must be tokenized again
    fn request_retokenize(&mut self, from_line: usize);
}

/// User-visible error channel for transport failures
pub trait Notifier {
    fn notify_error(&mut self, message: &str);
}

impl AnnotationSink for Vec<Annotation> {
    fn set_annotations(&mut self, annotations: &[Annotation]) {
        self.clear();
        self.extend_from_slice(annotations);
    }
}

impl Notifier for Vec<String> {
    fn notify_error(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

// =============================================================================
// Annotations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

/// A parser message attached to a 0-based row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub row: u32,
    pub column: u32,
    pub text: String,
    #[serde(rename = "type")]
    pub severity: Severity,
}

// =============================================================================
// VocabularyUpdate
// =============================================================================

/// One "vocabulary updated" event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyUpdate {
    /// Collection name to phrases, as received (unknown names included)
    pub collections: Vec<(String, Vec<String>)>,
    /// 1-based line number to message
    pub errors: Vec<(u32, String)>,
}

impl VocabularyUpdate {
    /// Decode a parser response body.
    ///
    /// Only unparseable JSON is an error; missing or malformed parts decode
    /// as empty.
    pub fn from_json(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        let mut update = Self::default();

        if let Some(collections) = value.get("collections").and_then(Value::as_object) {
            for (name, phrases) in collections {
                if name == "errors" {
                    update.push_errors(phrases);
                } else {
                    update.collections.push((name.clone(), phrases_from_value(phrases)));
                }
            }
        }
        if let Some(errors) = value.get("errors") {
            update.push_errors(errors);
        }

        update.errors.sort_by_key(|(line, _)| *line);
        update
    }

    fn push_errors(&mut self, errors: &Value) {
        let Some(errors) = errors.as_object() else {
            return;
        };
        for (key, message) in errors {
            let line = match key.trim().parse::<u32>() {
                Ok(line) if line > 0 => line,
                _ => {
                    tracing::warn!("skipping parser error with line key '{}'", key);
                    continue;
                }
            };
            let text = match message {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            self.errors.push((line, text));
        }
    }

    /// Errors as 0-based annotations
    pub fn annotations(&self) -> Vec<Annotation> {
        self.errors
            .iter()
            .map(|(line, text)| Annotation {
                row: line - 1,
                column: 0,
                text: text.clone(),
                severity: Severity::Error,
            })
            .collect()
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// What a delivery did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub changed: Vec<CollectionName>,
    pub annotations: usize,
    pub retokenize_from: usize,
    pub generation: u32,
}

/// Apply one update: annotations, vocabulary, grammar, re-tokenize request.
pub fn deliver(
    context: &mut VocabularyContext,
    update: &VocabularyUpdate,
    sink: &mut dyn AnnotationSink,
    document: &mut dyn DocumentSource,
) -> UpdateOutcome {
    let annotations = update.annotations();
    sink.set_annotations(&annotations);

    let changed = context.update(
        update
            .collections
            .iter()
            .map(|(name, phrases)| (name.as_str(), phrases.clone())),
    );

    document.request_retokenize(0);

    UpdateOutcome {
        changed,
        annotations: annotations.len(),
        retokenize_from: 0,
        generation: context.generation(),
    }
}

/// Report a failed parser round trip once. The vocabulary is left alone.
pub fn deliver_failure(error: &HighlightError, notifier: &mut dyn Notifier) {
    tracing::warn!("{}", error);
    notifier.notify_error(&error.to_string());
}
