use super::*;
use crate::tokenizer::testing::WordCounter;

#[test]
fn test_fits_returns_len() {
    let text = "short text here";
    assert_eq!(find_split(text, 10, &WordCounter), text.len());
}

#[test]
fn test_prefers_paragraph_break() {
    let text = "one two three.\n\nfour five six. seven eight";
    let b = find_boundary(text, 5, &WordCounter);

    assert_eq!(b.kind, Some(BoundaryKind::ParagraphBreak));
    assert_eq!(&text[..b.offset], "one two three.\n\n");
}

#[test]
fn test_falls_through_when_left_half_too_big() {
    // The only paragraph break leaves 6 words on the left
    let text = "a b c d e f\n\ng h";
    let b = find_boundary(text, 4, &WordCounter);

    assert_ne!(b.kind, Some(BoundaryKind::ParagraphBreak));
    assert!(WordCounter.count(&text[..b.offset]) <= 4);
}

#[test]
fn test_sentence_nearest_midpoint() {
    let text = "aa bb. cc dd. ee ff. gg hh.";
    let b = find_boundary(text, 6, &WordCounter);

    assert_eq!(b.kind, Some(BoundaryKind::SentenceEnd));
    assert_eq!(&text[..b.offset], "aa bb. cc dd.");
}

#[test]
fn test_japanese_sentence_boundary() {
    let text = "駅近 物件です。 静か 環境です。 公園 あります。 学校 近い。";
    let b = find_boundary(text, 5, &WordCounter);

    assert_eq!(b.kind, Some(BoundaryKind::SentenceEnd));
    assert!(text.is_char_boundary(b.offset));
    assert!(text[..b.offset].ends_with('。'));
}

#[test]
fn test_space_boundary_when_no_punctuation() {
    let text = "alpha beta gamma delta epsilon zeta";
    let b = find_boundary(text, 4, &WordCounter);

    assert_eq!(b.kind, Some(BoundaryKind::Space));
    assert_eq!(&text[..b.offset], "alpha beta gamma ");
}

#[test]
fn test_midpoint_fallback_is_char_boundary() {
    // One long "word": no boundary can help
    let text = "東京都渋谷区渋谷一丁目一番一号東京都渋谷区";
    let counter = crate::tokenizer::HeuristicCounter;
    let b = find_boundary(text, 2, &counter);

    assert_eq!(b.kind, None);
    assert!(b.offset > 0 && b.offset < text.len());
    assert!(text.is_char_boundary(b.offset));
    assert_eq!(text[..b.offset].chars().count(), text.chars().count() / 2);
}

#[test]
fn test_offset_always_in_range() {
    for text in ["", "x", "a b", "a. b. c. d.", "\n\n\n"] {
        let offset = find_split(text, 0, &WordCounter);
        assert!(offset <= text.len());
    }
}
