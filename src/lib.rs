// Public API exports
pub mod boundary;
pub mod chunker;
pub mod context;
pub mod retrieval;
pub mod tokenizer;
pub mod window;

// Re-export main types for convenience
pub use tokenizer::{
    CachedCounter, DEFAULT_EMBEDDING_MODEL, HeuristicCounter, TiktokenCounter, TokenCounter,
    TokenizerError,
};

pub use boundary::{Boundary, BoundaryKind, find_boundary, find_split};

pub use chunker::{
    Chunk, ChunkMetadata, ChunkStats, DEFAULT_MAX_TOKENS, PropertyListing, Record, SegmentError,
    Segmenter, SegmenterConfig, StrategyKind, segment,
};

pub use window::{Message, Role, WindowConfig, optimize};

pub use retrieval::{
    MergeConfig, QueryVariation, SearchAnalytics, SearchMatch, VariationRun, merge,
    unique_variations,
};

pub use context::{AssembledContext, ContextAssembler, ContextConfig, TokenUsage};
