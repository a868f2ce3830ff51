use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Unknown model or encoding: {0}")]
    UnknownModel(String),

    #[error("Failed to load tokenizer {name}: {reason}")]
    Load { name: String, reason: String },
}
