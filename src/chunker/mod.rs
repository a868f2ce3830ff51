//! Record segmentation under a token budget.
//!
//! A [`Record`] carries fixed attributes that must appear in every chunk
//! and one long free-text field. [`Segmenter::segment`] reserves room for
//! the fixed attributes and a structural overhead, splits the free text
//! with the configured [`SplitStrategy`], then stamps every chunk with
//! its position and the final chunk count.

mod chunk;
mod error;
mod halving;
mod record;
mod splitter;

#[cfg(test)]
mod tests;

pub use chunk::{CHUNK_NUMBER_KEY, Chunk, ChunkMetadata, ChunkStats, TOTAL_CHUNKS_KEY};
pub use error::SegmentError;
pub use halving::NaturalHalving;
pub use record::{PropertyListing, Record};
pub use splitter::{GreedyPacking, Piece, SplitStrategy};

use crate::tokenizer::{CachedCounter, TokenCounter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::iter;

/// Maximum target tokens per chunk (configurable)
pub const DEFAULT_MAX_TOKENS: usize = 2000;

/// Tokens reserved for JSON structure and position keys
pub const DEFAULT_OVERHEAD: usize = 100;

/// Share of the estimated character window used when cutting paragraphs
pub const DEFAULT_CHAR_MARGIN: f64 = 0.9;

/// Per-record payload ceiling of the vector store
pub const DEFAULT_PAYLOAD_CEILING: usize = 40 * 1024;

/// Which splitting algorithm the segmenter runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Greedy paragraph packing; bounded chunk size
    #[default]
    Greedy,
    /// One natural split, at most two chunks
    Halving,
    /// Natural splits repeated until every piece fits
    RecursiveHalving,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub max_tokens: usize,
    pub overhead: usize,
    pub char_margin: f64,
    pub strategy: StrategyKind,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            overhead: DEFAULT_OVERHEAD,
            char_margin: DEFAULT_CHAR_MARGIN,
            strategy: StrategyKind::Greedy,
        }
    }
}

/// Splits records into chunks whose payload fits `max_tokens`
pub struct Segmenter<'a> {
    config: SegmenterConfig,
    counter: &'a dyn TokenCounter,
}

impl<'a> Segmenter<'a> {
    /// Create a segmenter with default limits
    pub fn new(counter: &'a dyn TokenCounter) -> Self {
        Self::with_config(counter, SegmenterConfig::default())
    }

    pub fn with_config(counter: &'a dyn TokenCounter, config: SegmenterConfig) -> Self {
        Self { config, counter }
    }

    /// Set the token budget per chunk
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the reserved structural overhead
    pub fn overhead(mut self, overhead: usize) -> Self {
        self.config.overhead = overhead;
        self
    }

    /// Set the character-window safety margin, clamped to (0, 1]
    pub fn char_margin(mut self, margin: f64) -> Self {
        self.config.char_margin = margin.clamp(f64::EPSILON, 1.0);
        self
    }

    /// Select the splitting strategy
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Split `record` into ordered chunks
    ///
    /// Fails when a fixed attribute would be overwritten by the text slice
    /// or a position key, or when the fixed attributes leave no room for
    /// text.
    pub fn segment(&self, record: &Record) -> Result<Vec<Chunk>, SegmentError> {
        check_reserved_keys(record)?;

        let counter = CachedCounter::new(self.counter);
        let SegmenterConfig {
            max_tokens,
            overhead,
            ..
        } = self.config;

        let fixed_tokens = counter.count(&record.fixed_json()?);
        let available = fixed_tokens
            .checked_add(overhead)
            .and_then(|reserved| max_tokens.checked_sub(reserved))
            .filter(|&n| n > 0)
            .ok_or(SegmentError::FixedFieldsExceedBudget {
                fixed_tokens,
                overhead,
                max_tokens,
            })?;

        let pieces = self.split_strategy().split(&record.text, available, &counter);

        // Second pass: the total is only known now
        let chunks = if pieces.is_empty() {
            vec![self.build_chunk(record, None, 1, 1)?]
        } else {
            let total = pieces.len();
            pieces
                .iter()
                .enumerate()
                .map(|(i, piece)| self.build_chunk(record, Some(piece), i + 1, total))
                .collect::<Result<Vec<_>, _>>()?
        };

        tracing::debug!(
            chunks = chunks.len(),
            fixed_tokens,
            available,
            cache_hits = counter.hits(),
            strategy = ?self.config.strategy,
            "segmented record"
        );

        Ok(chunks)
    }

    fn split_strategy(&self) -> Box<dyn SplitStrategy> {
        match self.config.strategy {
            StrategyKind::Greedy => Box::new(GreedyPacking {
                char_margin: self.config.char_margin,
            }),
            StrategyKind::Halving => Box::new(NaturalHalving { recursive: false }),
            StrategyKind::RecursiveHalving => Box::new(NaturalHalving { recursive: true }),
        }
    }

    /// Serialize one chunk and check its measured size
    fn build_chunk(
        &self,
        record: &Record,
        piece: Option<&Piece>,
        chunk_number: usize,
        total_chunks: usize,
    ) -> Result<Chunk, SegmentError> {
        let mut payload = record.fields.clone();
        if let Some(piece) = piece {
            payload.insert(record.text_field.clone(), Value::from(piece.text.as_str()));
        }
        payload.insert(CHUNK_NUMBER_KEY.to_string(), Value::from(chunk_number));
        payload.insert(TOTAL_CHUNKS_KEY.to_string(), Value::from(total_chunks));

        let text = serde_json::to_string(&payload)?;
        let token_count = self.counter.count(&text);
        let over_budget = token_count > self.config.max_tokens;

        if over_budget {
            tracing::warn!(
                chunk_number,
                token_count,
                max_tokens = self.config.max_tokens,
                "chunk exceeds max_tokens after packing; overhead or margin needs tuning"
            );
        }

        Ok(Chunk {
            metadata: ChunkMetadata {
                chunk_number,
                total_chunks,
                token_count,
                payload_bytes: text.len(),
                paragraph_count: piece.map_or(0, |p| p.paragraphs),
                degraded: piece.is_some_and(|p| p.degraded),
                over_budget,
            },
            slice: piece.map(|p| p.text.clone()).unwrap_or_default(),
            payload,
            text,
        })
    }
}

/// Keys written into every payload must not collide with fixed attributes
fn check_reserved_keys(record: &Record) -> Result<(), SegmentError> {
    let position_keys = [CHUNK_NUMBER_KEY, TOTAL_CHUNKS_KEY];

    if position_keys.contains(&record.text_field.as_str()) {
        return Err(SegmentError::ReservedKey(record.text_field.clone()));
    }

    match iter::once(record.text_field.as_str())
        .chain(position_keys)
        .find(|key| record.fields.contains_key(*key))
    {
        Some(key) => Err(SegmentError::ReservedKey(key.to_string())),
        None => Ok(()),
    }
}

/// Segment with default overhead, margin and the greedy strategy
pub fn segment(
    record: &Record,
    max_tokens: usize,
    counter: &dyn TokenCounter,
) -> Result<Vec<Chunk>, SegmentError> {
    Segmenter::new(counter).max_tokens(max_tokens).segment(record)
}
