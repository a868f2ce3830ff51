//! Composes the prompt for one question: retrieved passages, pruned
//! history and a token usage breakdown.

mod assembler;
mod passage;


pub use assembler::{AssembledContext, ContextAssembler, ContextConfig, TokenUsage};
pub use passage::render_passage;

/// Passages included when the caller gives no `top_k`
pub const DEFAULT_TOP_K: usize = 5;

/// Tokens reserved for retrieved passages by default
pub const DEFAULT_CONTEXT_TOKENS: usize = 4_000;

/// Joins rendered passages in the context block
pub const PASSAGE_SEPARATOR: &str = "\n\n";
