//! Merging results of several reformulated queries into one ranking.

mod analytics;
mod merger;
mod types;


pub use analytics::{ScoreDistribution, SearchAnalytics, VariationStats};
pub use merger::{MergeConfig, QueryVariation, VariationRun, merge, unique_variations};
pub use types::SearchMatch;

/// Rank penalty per query variation when none is configured
pub const DEFAULT_PENALTY_PER_VARIATION: f32 = 0.05;

/// Similarity cut-off when none is configured
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;

/// Query variations searched per question, original query included
pub const DEFAULT_MAX_VARIATIONS: usize = 5;
