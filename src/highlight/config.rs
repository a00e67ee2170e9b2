//! Highlighter configuration
//!
//! Every field has a default, so hosts only pass what they override:
//! ```javascript,ignore
//! const session = new HighlightSession({ parseDelayMs: 500 });
//! ```

use serde::{Deserialize, Serialize};

/// Default parser endpoint the worker posts document text to
pub const DEFAULT_PARSER_ENDPOINT: &str = "/horilka/parser";

/// Quiet period before the worker re-parses after an edit
pub const DEFAULT_PARSE_DELAY_MS: u32 = 1000;

/// Marker the parser uses for numeric slots in quantifications
/// ("at least NRO and at most NRO")
pub const DEFAULT_QUANTITY_PLACEHOLDER: &str = "NRO";

/// Copula-like verbs that compete with the vocabulary verbs
pub const DEFAULT_SPECIAL_VERBS: [&str; 2] = ["is state of", "is property of"];

/// Highlighter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HighlightConfig {
    /// Endpoint receiving the raw document text
    pub parser_endpoint: String,

    /// Debounce before a changed document is sent to the parser
    pub parse_delay_ms: u32,

    /// Placeholder replaced by a digit pattern in quantifications
    pub quantity_placeholder: String,

    /// Verb phrases always present in the verb pattern
    pub special_verbs: Vec<String>,

    /// Match `Term:` / `Fact Type:` / `Rule:` labels case-insensitively
    pub case_insensitive_labels: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            parser_endpoint: DEFAULT_PARSER_ENDPOINT.to_string(),
            parse_delay_ms: DEFAULT_PARSE_DELAY_MS,
            quantity_placeholder: DEFAULT_QUANTITY_PLACEHOLDER.to_string(),
            special_verbs: DEFAULT_SPECIAL_VERBS.iter().map(|v| v.to_string()).collect(),
            case_insensitive_labels: true,
        }
    }
}
