pub mod token;
pub mod config;
pub mod error;
pub mod vocabulary;
pub mod pattern;
pub mod rule_scanner;
pub mod grammar;
pub mod context;
pub mod channel;
pub mod document;
pub mod worker;
pub mod session;

pub use token::*;
pub use config::*;
pub use error::HighlightError;
pub use vocabulary::*;
pub use pattern::*;
pub use rule_scanner::*;
pub use grammar::*;
pub use context::*;
pub use channel::*;
pub use document::*;
pub use worker::*;
pub use session::*;
