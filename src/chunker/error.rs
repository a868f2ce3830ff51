use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error(
        "Fixed fields take {fixed_tokens} tokens plus {overhead} overhead, leaving no room under max_tokens {max_tokens}"
    )]
    FixedFieldsExceedBudget {
        fixed_tokens: usize,
        overhead: usize,
        max_tokens: usize,
    },

    #[error("Key {0:?} is written into every chunk and cannot be a fixed field")]
    ReservedKey(String),

    #[error("Failed to serialize chunk payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
