//! HighlightSession: One open SBVR document and its vocabulary
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! const session = new HighlightSession();
//! session.setDocument(editor.getValue());
//! session.retokenize();
//!
//! const body = await fetchVocabulary(session.parserEndpoint(), editor.getValue());
//! const outcome = session.applyParserResponse(body);
//! editor.setAnnotations(session.annotations());
//! session.retokenize();
//! ```

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::highlight::channel::{
    deliver, deliver_failure, Annotation, UpdateOutcome, VocabularyUpdate,
};
use crate::highlight::config::HighlightConfig;
use crate::highlight::context::VocabularyContext;
use crate::highlight::document::{RetokenizeStats, TokenizedDocument};
use crate::highlight::error::HighlightError;
use crate::highlight::grammar::{LineState, LineTokens};
use crate::highlight::vocabulary::{CollectionName, Completion};
use crate::highlight::worker::ParseScheduler;

/// Vocabulary, document cache and annotations of one editor session
#[wasm_bindgen]
pub struct HighlightSession {
    context: VocabularyContext,
    document: TokenizedDocument,
    annotations: Vec<Annotation>,
    /// Transport failures not yet shown to the user
    notifications: Vec<String>,
}

impl Default for HighlightSession {
    fn default() -> Self {
        Self::new(HighlightConfig::default())
    }
}

impl HighlightSession {
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            context: VocabularyContext::new(config),
            document: TokenizedDocument::default(),
            annotations: Vec::new(),
            notifications: Vec::new(),
        }
    }

    pub fn tokenize_line(&self, state: LineState, line: &str) -> LineTokens {
        self.context.tokenize_line(state, line)
    }

    pub fn tokenize_document(&self, text: &str) -> Vec<LineTokens> {
        self.context.tokenize_document(text)
    }

    pub fn set_document(&mut self, text: &str) {
        self.document.set_text(text);
    }

    pub fn update_line(&mut self, index: usize, text: &str) -> bool {
        self.document.update_line(index, text)
    }

    pub fn remove_line(&mut self, index: usize) -> bool {
        self.document.remove_line(index)
    }

    pub fn retokenize(&mut self) -> RetokenizeStats {
        self.document.retokenize(self.context.grammar())
    }

    pub fn line_tokens(&self, index: usize) -> Option<&LineTokens> {
        self.document.line_tokens(index)
    }

    pub fn line_count(&self) -> usize {
        self.document.line_count()
    }

    /// Where the worker posts document text
    pub fn parser_endpoint(&self) -> &str {
        &self.context.config().parser_endpoint
    }

    /// Debounce scheduler for this session's parse delay
    pub fn scheduler(&self) -> ParseScheduler {
        ParseScheduler::from_config(self.context.config())
    }

    /// Apply a decoded "vocabulary updated" event
    pub fn apply_update(&mut self, update: &VocabularyUpdate) -> UpdateOutcome {
        deliver(
            &mut self.context,
            update,
            &mut self.annotations,
            &mut self.document,
        )
    }

    /// Decode and apply a parser response body. An unparseable body counts
    /// as a transport failure and leaves the vocabulary untouched.
    pub fn apply_parser_response(&mut self, body: &str) -> Result<UpdateOutcome, HighlightError> {
        match VocabularyUpdate::from_json(body) {
            Ok(update) => Ok(self.apply_update(&update)),
            Err(err) => {
                self.report_transport_failure(&err);
                Err(err)
            }
        }
    }

    pub fn report_transport_failure(&mut self, error: &HighlightError) {
        deliver_failure(error, &mut self.notifications);
    }

    /// Drain pending transport failure messages
    pub fn take_notifications(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notifications)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn completions(&self, prefix: &str, limit: usize) -> Vec<Completion> {
        self.context.store().completions(prefix, limit)
    }

    pub fn collection(&self, name: CollectionName) -> &[String] {
        self.context.store().get(name)
    }

    pub fn generation(&self) -> u32 {
        self.context.generation()
    }

    pub fn context(&self) -> &VocabularyContext {
        &self.context
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
impl HighlightSession {
    /// Create a session (JS binding). `config` may be omitted.
    #[wasm_bindgen(constructor)]
    pub fn js_new(config: JsValue) -> Result<HighlightSession, JsValue> {
        if config.is_undefined() || config.is_null() {
            return Ok(Self::default());
        }
        let config: HighlightConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?;
        Ok(Self::new(config))
    }

    /// Tokenize one line: returns { tokens: [{ value, kind }], state }
    #[wasm_bindgen(js_name = tokenizeLine)]
    pub fn js_tokenize_line(&self, state: &str, line: &str) -> Result<JsValue, JsValue> {
        let state: LineState = state.parse().map_err(|e: String| JsValue::from_str(&e))?;
        to_js(&self.tokenize_line(state, line))
    }

    #[wasm_bindgen(js_name = tokenizeDocument)]
    pub fn js_tokenize_document(&self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.tokenize_document(text))
    }

    #[wasm_bindgen(js_name = setDocument)]
    pub fn js_set_document(&mut self, text: &str) {
        self.set_document(text);
    }

    #[wasm_bindgen(js_name = updateLine)]
    pub fn js_update_line(&mut self, index: usize, text: &str) -> bool {
        self.update_line(index, text)
    }

    #[wasm_bindgen(js_name = removeLine)]
    pub fn js_remove_line(&mut self, index: usize) -> bool {
        self.remove_line(index)
    }

    #[wasm_bindgen(js_name = retokenize)]
    pub fn js_retokenize(&mut self) -> Result<JsValue, JsValue> {
        let stats = self.retokenize();
        to_js(&stats)
    }

    /// Cached tokens of a line, or null
    #[wasm_bindgen(js_name = lineTokens)]
    pub fn js_line_tokens(&self, index: usize) -> Result<JsValue, JsValue> {
        match self.line_tokens(index) {
            Some(line) => to_js(line),
            None => Ok(JsValue::NULL),
        }
    }

    /// Apply a raw parser response body
    #[wasm_bindgen(js_name = applyParserResponse)]
    pub fn js_apply_parser_response(&mut self, body: &str) -> Result<JsValue, JsValue> {
        match self.apply_parser_response(body) {
            Ok(outcome) => to_js(&outcome),
            Err(e) => {
                web_sys::console::error_1(&format!("[HighlightSession] {}", e).into());
                Err(JsValue::from_str(&e.to_string()))
            }
        }
    }

    /// Apply an already decoded payload { collections, errors? }
    #[wasm_bindgen(js_name = applyVocabularyUpdate)]
    pub fn js_apply_vocabulary_update(&mut self, payload: JsValue) -> Result<JsValue, JsValue> {
        let value: serde_json::Value = serde_wasm_bindgen::from_value(payload)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse update: {}", e)))?;
        let outcome = self.apply_update(&VocabularyUpdate::from_value(&value));
        to_js(&outcome)
    }

    /// Report a failed parser request once; the vocabulary stays as it is
    #[wasm_bindgen(js_name = reportTransportFailure)]
    pub fn js_report_transport_failure(&mut self, message: &str) {
        let error = HighlightError::Transport(message.to_string());
        web_sys::console::error_1(&format!("[HighlightSession] {}", error).into());
        self.report_transport_failure(&error);
    }

    #[wasm_bindgen(js_name = takeNotifications)]
    pub fn js_take_notifications(&mut self) -> Result<JsValue, JsValue> {
        let notifications = self.take_notifications();
        to_js(&notifications)
    }

    /// Current annotations: [{ row, column, text, type }]
    #[wasm_bindgen(js_name = annotations)]
    pub fn js_annotations(&self) -> Result<JsValue, JsValue> {
        to_js(&self.annotations)
    }

    #[wasm_bindgen(js_name = completions)]
    pub fn js_completions(&self, prefix: &str, limit: usize) -> Result<JsValue, JsValue> {
        to_js(&self.completions(prefix, limit))
    }

    /// Phrases of a named collection
    #[wasm_bindgen(js_name = collection)]
    pub fn js_collection(&self, name: &str) -> Result<JsValue, JsValue> {
        let name: CollectionName = name
            .parse()
            .map_err(|_| JsValue::from_str(&format!("Unknown collection: {}", name)))?;
        to_js(&self.collection(name))
    }

    #[wasm_bindgen(js_name = lineCount)]
    pub fn js_line_count(&self) -> usize {
        self.line_count()
    }

    #[wasm_bindgen(js_name = parserEndpoint)]
    pub fn js_parser_endpoint(&self) -> String {
        self.parser_endpoint().to_string()
    }

    #[wasm_bindgen(js_name = createScheduler)]
    pub fn js_create_scheduler(&self) -> ParseScheduler {
        self.scheduler()
    }

    #[wasm_bindgen(js_name = vocabularyGeneration)]
    pub fn js_vocabulary_generation(&self) -> u32 {
        self.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::token::TokenKind;

    #[test]
    fn test_update_then_retokenize() {
        let mut session = HighlightSession::default();
        session.set_document("Term: medicine\nRule: each medicine");
        session.retokenize();
        assert_eq!(session.line_tokens(0).unwrap().tokens[2].kind, TokenKind::FreeText);

        let outcome = session
            .apply_parser_response(
                r#"{ "collections": {
                    "terms": ["medicine"],
                    "quantifications": ["each"],
                    "errors": { "2": "Rule needs a verb" }
                } }"#,
            )
            .unwrap();
        assert_eq!(outcome.retokenize_from, 0);

        let stats = session.retokenize();
        assert_eq!(stats.lines_tokenized, 2);
        assert_eq!(session.line_tokens(0).unwrap().tokens[2].kind, TokenKind::Term);
        assert_eq!(session.annotations().len(), 1);
        assert_eq!(session.annotations()[0].row, 1);
    }

    #[test]
    fn test_transport_settings_come_from_config() {
        let session = HighlightSession::new(HighlightConfig {
            parser_endpoint: "/api/sbvr".to_string(),
            parse_delay_ms: 300,
            ..HighlightConfig::default()
        });
        assert_eq!(session.parser_endpoint(), "/api/sbvr");

        let mut scheduler = session.scheduler();
        scheduler.note_change(0.0);
        assert!(!scheduler.poll(299.0, "Term: car"));
        assert!(scheduler.poll(300.0, "Term: car"));

        assert_eq!(HighlightSession::default().parser_endpoint(), "/horilka/parser");
    }

    #[test]
    fn test_bad_body_keeps_vocabulary() {
        let mut session = HighlightSession::default();
        session
            .apply_parser_response(r#"{ "collections": { "terms": ["car"] } }"#)
            .unwrap();

        assert!(session.apply_parser_response("Internal Server Error").is_err());
        assert_eq!(session.collection(CollectionName::Terms), &["car".to_string()]);
        assert_eq!(session.take_notifications().len(), 1);
        assert!(session.take_notifications().is_empty());
    }

    #[test]
    fn test_completions_follow_vocabulary() {
        let mut session = HighlightSession::default();
        session
            .apply_parser_response(r#"{ "collections": { "terms": ["pharmacist", "pharmacy"] } }"#)
            .unwrap();
        let phrases: Vec<String> = session
            .completions("pharm", 10)
            .into_iter()
            .map(|c| c.phrase)
            .collect();
        assert_eq!(phrases, vec!["pharmacist".to_string(), "pharmacy".to_string()]);
    }
}
