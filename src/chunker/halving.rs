use super::splitter::{Piece, SplitStrategy, paragraphs};
use crate::boundary::find_split;
use crate::tokenizer::TokenCounter;

/// Two-way split at the natural boundary nearest the middle
///
/// Without `recursive` this yields at most two pieces, and either may
/// still exceed the budget for long inputs. With `recursive`, oversized
/// halves are split again until they fit or cannot be cut further.
#[derive(Debug, Clone, Copy)]
pub struct NaturalHalving {
    pub recursive: bool,
}

impl SplitStrategy for NaturalHalving {
    fn split(&self, text: &str, available: usize, counter: &dyn TokenCounter) -> Vec<Piece> {
        let text = text.trim();
        if text.is_empty() {
            return vec![];
        }

        if !self.recursive {
            return match halve(text, available, counter) {
                Some((left, right)) => vec![piece(left), piece(right)],
                None => vec![piece(text)],
            };
        }

        // Explicit stack keeps depth off the call stack; right is pushed
        // first so pieces come out in text order.
        let mut pieces = Vec::new();
        let mut pending = vec![text];

        while let Some(span) = pending.pop() {
            match halve(span, available, counter) {
                Some((left, right)) => {
                    pending.push(right);
                    pending.push(left);
                }
                None => pieces.push(piece(span)),
            }
        }

        pieces
    }
}

/// Split `span` in two if it exceeds `available`
///
/// `None` when it fits, or when the split would leave an empty side.
fn halve<'a>(
    span: &'a str,
    available: usize,
    counter: &dyn TokenCounter,
) -> Option<(&'a str, &'a str)> {
    if counter.count(span) <= available {
        return None;
    }

    let offset = find_split(span, available, counter);
    let (left, right) = (span[..offset].trim(), span[offset..].trim());

    if left.is_empty() || right.is_empty() {
        tracing::warn!(
            len = span.len(),
            available,
            "span exceeds budget but has no usable split point"
        );
        return None;
    }

    Some((left, right))
}

fn piece(text: &str) -> Piece {
    Piece {
        text: text.to_string(),
        paragraphs: paragraphs(text).count(),
        degraded: false,
    }
}
