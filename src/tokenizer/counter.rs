use super::{TokenCounter, TokenizerError};
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base};

/// BPE tokenizer shared with the embedding and completion models
///
/// Size guarantees downstream only hold when this matches the model that
/// actually consumes the text.
pub struct TiktokenCounter {
    name: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Load the tokenizer for a model name ("gpt-4", "text-embedding-3-large")
    /// or an encoding name ("cl100k_base", "o200k_base", "p50k_base")
    pub fn for_model(model: &str) -> Result<Self, TokenizerError> {
        let name = model.to_ascii_lowercase();

        let loaded = match name.as_str() {
            "cl100k_base" => cl100k_base(),
            "o200k_base" => o200k_base(),
            "p50k_base" => p50k_base(),
            // embedding-3 models share the cl100k vocabulary
            n if n.starts_with("text-embedding-3") => cl100k_base(),
            n => match get_bpe_from_model(n) {
                Ok(bpe) => Ok(bpe),
                Err(_) => return Err(TokenizerError::UnknownModel(model.to_string())),
            },
        };

        let bpe = loaded.map_err(|e| TokenizerError::Load {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { name, bpe })
    }

    /// The cl100k_base encoding
    pub fn cl100k() -> Result<Self, TokenizerError> {
        Self::for_model("cl100k_base")
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Cheap estimate: 1 token per 4 bytes of UTF-8
///
/// Multi-byte scripts come out higher than their real token cost, so
/// budgets sized with this counter err on the safe side.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.len() / 4).max(1)
    }
}
