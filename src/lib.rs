//! sbvr-highlight: Vocabulary-driven SBVR syntax highlighting
//!
//! A Rust/WASM core for highlighting SBVR business vocabularies and rules.
//! The lexical grammar is rebuilt from the vocabulary a remote parser
//! reports for the open document.
//!
//! # Architecture
//!
//! ## Highlight Components
//! - `vocabulary.rs` - VocabularyStore: Named phrase collections from the parser
//! - `pattern.rs` - PatternCompiler: Longest-first alternations per collection
//! - `grammar.rs` - LineStateMachine: Per-line tokenizer with carried state
//! - `rule_scanner.rs` - RuleLineScanner: Category scan with article disambiguation
//! - `channel.rs` - VocabularyUpdateChannel: Parser payloads to annotations and rebuilds
//! - `document.rs` - TokenizedDocument: Incremental per-line token cache
//! - `worker.rs` - ParseScheduler + fetch transport
//! - `session.rs` - HighlightSession: The WASM-facing session object
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { HighlightSession, ParseScheduler, fetchVocabulary } from 'sbvr-highlight';
//!
//! await init();
//!
//! const session = new HighlightSession({ parserEndpoint: '/horilka/parser' });
//! const scheduler = session.createScheduler();
//!
//! editor.on('change', () => scheduler.noteChange(performance.now()));
//! setInterval(async () => {
//!   const text = editor.getValue();
//!   if (!scheduler.poll(performance.now(), text)) return;
//!   try {
//!     session.applyParserResponse(await fetchVocabulary(session.parserEndpoint(), text));
//!   } catch (e) {
//!     scheduler.markFailed();
//!     session.reportTransportFailure(String(e));
//!   }
//!   session.setDocument(text);
//!   session.retokenize();
//! }, 250);
//!
//! const { tokens, state } = session.tokenizeLine('start', 'Term: medicine');
//! ```

pub mod highlight;

pub use highlight::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook and console logging for the browser
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    // Pattern rejections and skipped annotations are logged through tracing;
    // the start hook may run more than once in tests.
    #[cfg(target_arch = "wasm32")]
    let _ = tracing_wasm::try_set_as_global_default();
}

/// Prefix the editor inserts when toggling line comments
#[wasm_bindgen(js_name = lineCommentStart)]
pub fn line_comment_start() -> String {
    "#".to_string()
}

/// Indentation for a new line: SBVR statements never indent
#[wasm_bindgen(js_name = nextLineIndent)]
pub fn next_line_indent(_state: &str, _line: &str) -> String {
    String::new()
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("sbvr-highlight v{}", env!("CARGO_PKG_VERSION"))
}
