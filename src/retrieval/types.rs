use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One hit returned by the vector store for one query variation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    /// Raw similarity in [0, 1]
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Position of the originating query variation; 0 is the user's query
    #[serde(default)]
    pub query_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_variation: Option<String>,
    /// Filled in by [`merge`](super::merge)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_score: Option<f32>,
}

impl SearchMatch {
    pub fn new(id: impl Into<String>, score: f32, query_index: usize) -> Self {
        Self {
            id: id.into(),
            score,
            metadata: Map::new(),
            query_index,
            query_variation: None,
            adjusted_score: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.query_variation = Some(variation.into());
        self
    }

    /// Raw score minus the rank penalty of the originating variation
    pub fn penalized(&self, penalty_per_variation: f32) -> f32 {
        self.score - self.query_index as f32 * penalty_per_variation
    }

    /// Adjusted score if merged, raw score otherwise
    pub fn rank_score(&self) -> f32 {
        self.adjusted_score.unwrap_or(self.score)
    }

    /// Stored passage text, if the store kept one
    pub fn text(&self) -> Option<&str> {
        self.metadata.get("text").and_then(Value::as_str)
    }
}
