//! Conversation history pruning for a fixed context window.

mod message;
mod optimizer;


pub use message::{Message, Role};
pub use optimizer::{WindowConfig, optimize};

/// History budget used when the caller gives none
pub const DEFAULT_HISTORY_TOKENS: usize = 12_000;
