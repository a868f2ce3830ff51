use regex::Regex;
use std::sync::LazyLock;

/// Boundary classes, most semantically significant first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// Blank line between paragraphs
    ParagraphBreak,
    /// Sentence-ending punctuation directly followed by a newline
    SentenceLineEnd,
    /// Sentence-ending punctuation
    SentenceEnd,
    /// Exclamation or question mark
    Exclamation,
    /// Bare newline
    Newline,
    /// Comma, semicolon, colon and their full-width forms
    Clause,
    /// Word gap
    Space,
}

/// Pattern sources in priority order
const SOURCES: [(BoundaryKind, &str); 7] = [
    (BoundaryKind::ParagraphBreak, r"\n[ \t]*\n+"),
    (BoundaryKind::SentenceLineEnd, r"[。．.]\n"),
    (BoundaryKind::SentenceEnd, r"[。．.]"),
    (BoundaryKind::Exclamation, r"[!?！？]"),
    (BoundaryKind::Newline, r"\n"),
    (BoundaryKind::Clause, r"[、，,;；:：]"),
    (BoundaryKind::Space, "[ \u{3000}]"),
];

/// Every pattern compiled, or the first compile error
pub(super) static PATTERNS: LazyLock<Result<Vec<(BoundaryKind, Regex)>, regex::Error>> =
    LazyLock::new(compile);

fn compile() -> Result<Vec<(BoundaryKind, Regex)>, regex::Error> {
    let mut patterns = Vec::with_capacity(SOURCES.len());
    for (kind, src) in SOURCES {
        patterns.push((kind, Regex::new(src)?));
    }
    Ok(patterns)
}
