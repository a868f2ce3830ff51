use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Payload key holding the 1-based chunk position
pub const CHUNK_NUMBER_KEY: &str = "chunk_number";
/// Payload key holding the number of chunks the record produced
pub const TOTAL_CHUNKS_KEY: &str = "total_chunks";

/// A bounded slice of a record, ready for upload
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    /// Canonical JSON of `payload`
    pub text: String,
    /// Fixed attributes + text slice + position, as a flat map
    pub payload: Map<String, Value>,
    /// The free-text slice carried by this chunk
    pub slice: String,
    /// Metadata about the chunk
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMetadata {
    /// 1-based position within the record
    pub chunk_number: usize,
    /// Chunks produced for the record
    pub total_chunks: usize,
    /// Measured token count of the serialized payload
    pub token_count: usize,
    /// UTF-8 size of the serialized payload
    pub payload_bytes: usize,
    /// Paragraphs packed into this chunk
    pub paragraph_count: usize,
    /// Produced by character-window splitting of an oversized paragraph
    pub degraded: bool,
    /// Payload measured above max_tokens despite packing
    pub over_budget: bool,
}

impl Chunk {
    /// Flat key-value metadata for the vector store
    pub fn upload_metadata(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Payload without the text slice and position keys
    pub fn fixed_fields(&self, text_field: &str) -> Map<String, Value> {
        let mut fields = self.payload.clone();
        fields.remove(text_field);
        fields.remove(CHUNK_NUMBER_KEY);
        fields.remove(TOTAL_CHUNKS_KEY);
        fields
    }

    /// Upload id: `{prefix}_{YYYYmmddHHMMSS}_{record}_{i}`
    ///
    /// `record` is the record's 0-based position in its upload batch and
    /// `i` the 0-based chunk index, so ids stay unique when a batch shares
    /// one timestamp.
    pub fn upload_id(&self, prefix: &str, record: usize, at: DateTime<Utc>) -> String {
        format!(
            "{}_{}_{}_{}",
            prefix,
            at.format("%Y%m%d%H%M%S"),
            record,
            self.metadata.chunk_number - 1
        )
    }

    /// SHA-256 of the payload, hex encoded
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.text.as_bytes()))
    }
}

/// Size summary over one segmentation result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkStats {
    pub chunk_count: usize,
    pub total_tokens: usize,
    pub total_bytes: usize,
    pub largest_bytes: usize,
    pub degraded: usize,
    pub over_budget: usize,
    /// Chunk numbers whose payload exceeds the byte ceiling
    pub over_ceiling: Vec<usize>,
}

impl ChunkStats {
    pub fn from_chunks(chunks: &[Chunk], byte_ceiling: usize) -> Self {
        let mut stats = Self {
            chunk_count: chunks.len(),
            ..Self::default()
        };

        for chunk in chunks {
            let meta = &chunk.metadata;
            stats.total_tokens += meta.token_count;
            stats.total_bytes += meta.payload_bytes;
            stats.largest_bytes = stats.largest_bytes.max(meta.payload_bytes);
            stats.degraded += usize::from(meta.degraded);
            stats.over_budget += usize::from(meta.over_budget);
            if meta.payload_bytes > byte_ceiling {
                stats.over_ceiling.push(meta.chunk_number);
            }
        }

        stats
    }

    /// Every chunk is within both the token budget and the byte ceiling
    pub fn all_within_limits(&self) -> bool {
        self.over_budget == 0 && self.over_ceiling.is_empty()
    }
}
