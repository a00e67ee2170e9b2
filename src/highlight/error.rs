use thiserror::Error;

/// Errors surfaced by the highlighter.
///
/// Tokenization itself never fails; these only come out of payload decoding,
/// pattern compilation and the parser transport.
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("invalid parser payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("pattern for '{collection}' failed to compile: {source}")]
    Pattern {
        collection: String,
        #[source]
        source: regex::Error,
    },

    #[error("parser transport failed: {0}")]
    Transport(String),

    #[error("parser responded with HTTP {0}")]
    Status(u16),
}

pub type Result<T> = std::result::Result<T, HighlightError>;
