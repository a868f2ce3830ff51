//! Natural split points for oversized text.
//!
//! Given a span that does not fit a token budget, pick the offset nearest
//! its middle that lands on the most significant boundary available:
//! paragraph, sentence, clause, then word. Used by the halving chunker.

mod patterns;

#[cfg(test)]
mod tests;

pub use patterns::BoundaryKind;

use crate::tokenizer::TokenCounter;
use patterns::PATTERNS;

/// A chosen split point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Byte offset into the text, always on a char boundary
    pub offset: usize,
    /// Which pattern produced it; `None` for "fits whole" and midpoint fallback
    pub kind: Option<BoundaryKind>,
}

/// Byte offset to split `text` at so the left part fits `max_tokens`
///
/// Returns `text.len()` when the whole text already fits.
pub fn find_split(text: &str, max_tokens: usize, counter: &dyn TokenCounter) -> usize {
    find_boundary(text, max_tokens, counter).offset
}

/// Like [`find_split`], also reporting which boundary was used
///
/// If no boundary pattern yields a left part within budget, the raw
/// middle-character offset is returned and the left part may still be
/// oversized. Callers must tolerate that.
pub fn find_boundary(text: &str, max_tokens: usize, counter: &dyn TokenCounter) -> Boundary {
    if counter.count(text) <= max_tokens {
        return Boundary {
            offset: text.len(),
            kind: None,
        };
    }

    let target = midpoint(text);

    let patterns = match PATTERNS.as_ref() {
        Ok(patterns) => patterns.as_slice(),
        Err(e) => {
            tracing::error!(error = %e, "boundary patterns failed to compile");
            &[]
        }
    };

    for (kind, pattern) in patterns {
        let nearest = pattern
            .find_iter(text)
            .map(|m| m.end())
            .filter(|&end| end > 0 && end < text.len())
            .min_by_key(|&end| end.abs_diff(target));

        if let Some(end) = nearest {
            if counter.count(&text[..end]) <= max_tokens {
                return Boundary {
                    offset: end,
                    kind: Some(*kind),
                };
            }
        }
    }

    tracing::debug!(
        len = text.len(),
        max_tokens,
        "no natural boundary within budget, splitting at midpoint"
    );

    Boundary {
        offset: target,
        kind: None,
    }
}

/// Byte offset of the middle character
fn midpoint(text: &str) -> usize {
    let half = text.chars().count() / 2;
    text.char_indices()
        .nth(half)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
