mod cache;
mod counter;
mod error;


pub use cache::CachedCounter;
pub use counter::{HeuristicCounter, TiktokenCounter};
pub use error::TokenizerError;

/// Default model whose tokenizer sizes ingestion chunks
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Core trait that all token counters must implement
///
/// Counting must be a pure function of the text: the same string always
/// yields the same count under one counter instance.
pub trait TokenCounter {
    /// Number of tokens `text` occupies under this tokenizer
    fn count(&self, text: &str) -> usize;
}
