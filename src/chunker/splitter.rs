use crate::tokenizer::TokenCounter;
use std::iter;

/// A slice of free text assigned to one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// The text slice
    pub text: String,
    /// Paragraphs packed into this piece
    pub paragraphs: usize,
    /// Cut on character windows instead of natural boundaries
    pub degraded: bool,
}

/// Splits free text into pieces that each fit `available` tokens
///
/// `available` is the budget left after the fixed fields and overhead.
/// An empty result means "no free text".
pub trait SplitStrategy {
    fn split(&self, text: &str, available: usize, counter: &dyn TokenCounter) -> Vec<Piece>;
}

/// Non-empty trimmed lines
pub(super) fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Greedy paragraph packing with a character-window fallback:
/// - Merge consecutive paragraphs while they fit
/// - Start a new piece when the next paragraph would overflow
/// - Cut paragraphs that exceed the budget on their own into windows
#[derive(Debug, Clone, Copy)]
pub struct GreedyPacking {
    /// Fraction of the estimated window actually used (0, 1]
    pub char_margin: f64,
}

impl SplitStrategy for GreedyPacking {
    fn split(&self, text: &str, available: usize, counter: &dyn TokenCounter) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut current_batch: Vec<&str> = Vec::new();
        let mut current_tokens = 0;

        for paragraph in paragraphs(text) {
            let paragraph_tokens = counter.count(paragraph);

            // If this paragraph alone exceeds the budget, split it separately
            if paragraph_tokens > available {
                if !current_batch.is_empty() {
                    pieces.push(pack(&current_batch));
                    current_batch.clear();
                    current_tokens = 0;
                }

                pieces.extend(char_windows(
                    paragraph,
                    paragraph_tokens,
                    available,
                    self.char_margin,
                ));
                continue;
            }

            if current_tokens + paragraph_tokens > available && !current_batch.is_empty() {
                pieces.push(pack(&current_batch));
                current_batch.clear();
                current_tokens = 0;
            }

            current_tokens += paragraph_tokens;
            current_batch.push(paragraph);
        }

        if !current_batch.is_empty() {
            pieces.push(pack(&current_batch));
        }

        pieces
    }
}

/// Join a batch of paragraphs into one piece
fn pack(batch: &[&str]) -> Piece {
    Piece {
        text: batch.join("\n"),
        paragraphs: batch.len(),
        degraded: false,
    }
}

/// Cut an oversized paragraph into fixed-size character windows
///
/// The window is derived from the paragraph's own chars-per-token ratio,
/// shrunk by `margin` because token and character boundaries don't line
/// up. Always at least one character wide.
pub(super) fn char_windows(
    paragraph: &str,
    paragraph_tokens: usize,
    available: usize,
    margin: f64,
) -> Vec<Piece> {
    let char_count = paragraph.chars().count();
    let chars_per_token = char_count as f64 / paragraph_tokens.max(1) as f64;
    let window = ((available as f64 * chars_per_token * margin) as usize).max(1);

    tracing::warn!(
        paragraph_tokens,
        available,
        window_chars = window,
        "paragraph exceeds chunk budget, splitting into character windows"
    );

    let bounds: Vec<usize> = paragraph
        .char_indices()
        .map(|(i, _)| i)
        .step_by(window)
        .chain(iter::once(paragraph.len()))
        .collect();

    bounds
        .windows(2)
        .map(|w| Piece {
            text: paragraph[w[0]..w[1]].to_string(),
            paragraphs: 1,
            degraded: true,
        })
        .collect()
}
