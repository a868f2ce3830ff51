use super::*;
use crate::tokenizer::HeuristicCounter;
use crate::tokenizer::testing::{WordCounter, words};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

fn make_record(text: &str) -> Record {
    Record::new("text", text)
        .with_field("name", "Test")
        .with_field("category", "mansion")
}

fn strip_ws(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[test]
fn test_short_text_single_chunk() {
    let record = make_record("駅近の便利な物件です。周辺にはスーパーと公園があります。");

    let chunks = segment(&record, 8000, &HeuristicCounter).unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata.chunk_number, 1);
    assert_eq!(chunks[0].metadata.total_chunks, 1);
    assert!(!chunks[0].metadata.over_budget);
}

#[test]
fn test_fifty_char_text_single_chunk() {
    let record = make_record(&"x".repeat(50));
    let chunks = segment(&record, 8000, &WordCounter).unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].slice, "x".repeat(50));
}

#[test]
fn test_twenty_paragraphs_pack_three_per_chunk() {
    let paragraphs = vec![words(600); 20];
    let record = make_record(&paragraphs.join("\n"));

    let chunks = segment(&record, 2000, &WordCounter).unwrap();

    assert_eq!(chunks.len(), 7);
    let counts: Vec<usize> = chunks.iter().map(|c| c.metadata.paragraph_count).collect();
    assert_eq!(counts, vec![3, 3, 3, 3, 3, 3, 2]);

    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.metadata.chunk_number, i + 1);
        assert_eq!(chunk.metadata.total_chunks, 7);
        assert!(!chunk.metadata.over_budget);
        assert!(!chunk.metadata.degraded);
    }
}

#[test]
fn test_empty_text_yields_fixed_only_chunk() {
    for text in ["", "  \n\n \t"] {
        let chunks = segment(&make_record(text), 2000, &WordCounter).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].slice, "");
        assert!(!chunks[0].payload.contains_key("text"));
        assert_eq!(chunks[0].payload["name"], "Test");
        assert_eq!(chunks[0].payload[TOTAL_CHUNKS_KEY], 1);
    }
}

#[test]
fn test_fixed_fields_over_budget_is_error() {
    let record = make_record("some text");

    // 1 token of fixed fields + 100 overhead leaves nothing
    for max_tokens in [50, 100, 101] {
        let result = segment(&record, max_tokens, &WordCounter);
        assert!(matches!(
            result,
            Err(SegmentError::FixedFieldsExceedBudget {
                fixed_tokens: 1,
                overhead: 100,
                ..
            })
        ));
    }

    assert!(segment(&record, 102, &WordCounter).is_ok());
}

#[test]
fn test_oversized_paragraph_degrades_to_windows() {
    let paragraph = words(5000);
    let chunks = segment(&make_record(&paragraph), 2000, &WordCounter).unwrap();

    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.metadata.degraded));
    assert!(chunks.iter().all(|c| !c.metadata.over_budget));

    let joined: String = chunks.iter().map(|c| c.slice.as_str()).collect();
    assert_eq!(joined, paragraph);
}

#[test]
fn test_flush_before_and_after_degraded_paragraph() {
    let text = format!("small one\n{}\nsmall two", words(5000));
    let chunks = segment(&make_record(&text), 2000, &WordCounter).unwrap();

    assert_eq!(chunks.first().unwrap().slice, "small one");
    assert_eq!(chunks.last().unwrap().slice, "small two");
    assert!(!chunks.first().unwrap().metadata.degraded);
    assert!(chunks[1..chunks.len() - 1].iter().all(|c| c.metadata.degraded));
}

#[test]
fn test_fixed_fields_identical_across_chunks() {
    let record = make_record(&vec![words(500); 10].join("\n"))
        .with_field("latitude", "35.6580")
        .with_field("longitude", "139.7016");
    let expected = record.fixed_json().unwrap();

    let chunks = segment(&record, 1200, &WordCounter).unwrap();
    assert!(chunks.len() > 1);

    for chunk in &chunks {
        let fixed = serde_json::to_string(&chunk.fixed_fields("text")).unwrap();
        assert_eq!(fixed, expected);
    }
}

#[test]
fn test_payload_is_canonical_json() {
    let chunks = segment(&make_record("hello world"), 2000, &WordCounter).unwrap();

    assert_eq!(
        chunks[0].text,
        r#"{"category":"mansion","chunk_number":1,"name":"Test","text":"hello world","total_chunks":1}"#
    );
    assert_eq!(chunks[0].metadata.payload_bytes, chunks[0].text.len());
}

#[test]
fn test_multibyte_payload_not_escaped() {
    let chunks = segment(&make_record("東京都渋谷区"), 2000, &WordCounter).unwrap();
    assert!(chunks[0].text.contains("東京都渋谷区"));
}

#[test]
fn test_halving_two_chunks() {
    let text = "aa bb cc. dd ee ff. gg hh ii. jj kk ll.";
    let segmenter = Segmenter::new(&WordCounter)
        .max_tokens(110)
        .strategy(StrategyKind::Halving);

    let chunks = segmenter.segment(&make_record(text)).unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].slice, "aa bb cc. dd ee ff.");
    assert_eq!(chunks[1].slice, "gg hh ii. jj kk ll.");
    assert!(chunks.iter().all(|c| c.metadata.total_chunks == 2));
}

#[test]
fn test_halving_fits_single_chunk() {
    let segmenter = Segmenter::new(&WordCounter).strategy(StrategyKind::Halving);
    let chunks = segmenter.segment(&make_record("short text.")).unwrap();
    assert_eq!(chunks.len(), 1);
}

#[test]
fn test_halving_long_text_is_not_bounded() {
    // 400 words against 49 available tokens: each half is ~200
    let text = vec!["one two three four five."; 80].join(" ");
    let segmenter = Segmenter::new(&WordCounter)
        .max_tokens(150)
        .strategy(StrategyKind::Halving);

    let chunks = segmenter.segment(&make_record(&text)).unwrap();

    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.metadata.over_budget));
}

#[test]
fn test_recursive_halving_bounds_every_chunk() {
    let text = vec!["one two three four five."; 80].join(" ");
    let segmenter = Segmenter::new(&WordCounter)
        .max_tokens(150)
        .strategy(StrategyKind::RecursiveHalving);

    let chunks = segmenter.segment(&make_record(&text)).unwrap();

    assert!(chunks.len() >= 4);
    assert!(chunks.iter().all(|c| !c.metadata.over_budget));
    assert_eq!(
        strip_ws(&chunks.iter().map(|c| c.slice.as_str()).collect::<String>()),
        strip_ws(&text)
    );
}

#[test]
fn test_property_listing_conversion() {
    let listing: PropertyListing = serde_json::from_str(
        r#"{
            "property_name": "テスト物件",
            "property_type": "マンション",
            "prefecture": "東京都",
            "city": "渋谷区",
            "property_details": "駅近の便利な物件です。"
        }"#,
    )
    .unwrap();
    let record = Record::from(listing);

    assert_eq!(record.text_field, "property_details");
    assert_eq!(record.fields["latitude"], "0.0");
    assert_eq!(record.fields["longitude"], "0.0");
    assert_eq!(record.fields["detailed_address"], "");

    let chunks = segment(&record, 8000, &HeuristicCounter).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].payload["property_details"], "駅近の便利な物件です。");
}

#[test]
fn test_upload_id_and_fingerprint() {
    let record = make_record(&vec![words(600); 4].join("\n"));
    let chunks = segment(&record, 1000, &WordCounter).unwrap();
    let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

    assert_eq!(chunks[0].upload_id("property", 0, at), "property_20250102030405_0_0");
    assert_eq!(chunks[1].upload_id("property", 0, at), "property_20250102030405_0_1");
    assert_eq!(chunks[1].upload_id("property", 3, at), "property_20250102030405_3_1");

    let fp = chunks[0].fingerprint();
    assert_eq!(fp.len(), 64);
    assert_ne!(fp, chunks[1].fingerprint());
}

#[test]
fn test_upload_ids_unique_across_batch() {
    let records = [
        make_record(&vec![words(600); 4].join("\n")),
        make_record("short listing"),
        make_record(&vec![words(600); 2].join("\n")),
    ];
    let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

    let mut ids = std::collections::HashSet::new();
    let mut total = 0;
    for (i, record) in records.iter().enumerate() {
        for chunk in segment(record, 1000, &WordCounter).unwrap() {
            total += 1;
            assert!(ids.insert(chunk.upload_id("property", i, at)));
        }
    }

    assert_eq!(ids.len(), total);
    assert!(ids.contains("property_20250102030405_1_0"));
}

#[test]
fn test_fixed_field_colliding_with_text_field_is_rejected() {
    let record = Record::new("d", "alpha").with_field("d", "fixed");

    let result = segment(&record, 1000, &WordCounter);

    assert!(matches!(result, Err(SegmentError::ReservedKey(key)) if key == "d"));
}

#[test]
fn test_fixed_field_colliding_with_position_keys_is_rejected() {
    for key in [CHUNK_NUMBER_KEY, TOTAL_CHUNKS_KEY] {
        let record = make_record("alpha").with_field(key, "A-17");
        let result = segment(&record, 1000, &WordCounter);
        assert!(matches!(result, Err(SegmentError::ReservedKey(k)) if k == key));
    }

    let record = Record::new(CHUNK_NUMBER_KEY, "alpha");
    assert!(matches!(
        segment(&record, 1000, &WordCounter),
        Err(SegmentError::ReservedKey(_))
    ));
}

#[test]
fn test_huge_overhead_is_budget_error() {
    let record = make_record("some text");

    let result = Segmenter::new(&WordCounter)
        .max_tokens(1000)
        .overhead(usize::MAX)
        .segment(&record);

    assert!(matches!(
        result,
        Err(SegmentError::FixedFieldsExceedBudget {
            fixed_tokens: 1,
            overhead: usize::MAX,
            max_tokens: 1000,
        })
    ));
}

#[test]
fn test_chunk_stats() {
    let record = make_record(&vec![words(600); 5].join("\n"));
    let chunks = segment(&record, 1000, &WordCounter).unwrap();

    let stats = ChunkStats::from_chunks(&chunks, DEFAULT_PAYLOAD_CEILING);
    assert_eq!(stats.chunk_count, 5);
    assert_eq!(stats.degraded, 0);
    assert!(stats.all_within_limits());
    assert_eq!(
        stats.total_bytes,
        chunks.iter().map(|c| c.text.len()).sum::<usize>()
    );

    let tight = ChunkStats::from_chunks(&chunks, 100);
    assert_eq!(tight.over_ceiling, vec![1, 2, 3, 4, 5]);
    assert!(!tight.all_within_limits());
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: SegmenterConfig =
        serde_json::from_str(r#"{"max_tokens": 8000, "strategy": "recursive_halving"}"#).unwrap();

    assert_eq!(config.max_tokens, 8000);
    assert_eq!(config.overhead, DEFAULT_OVERHEAD);
    assert_eq!(config.strategy, StrategyKind::RecursiveHalving);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_greedy_chunks_are_consistent(
        sizes in prop::collection::vec(1usize..400, 0..30),
        max_tokens in 300usize..3000,
    ) {
        let text = sizes.iter().map(|&n| words(n)).collect::<Vec<_>>().join("\n");
        let record = make_record(&text);
        let chunks = segment(&record, max_tokens, &WordCounter).unwrap();
        let fixed = record.fixed_json().unwrap();

        prop_assert!(!chunks.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.metadata.chunk_number, i + 1);
            prop_assert_eq!(chunk.metadata.total_chunks, chunks.len());
            prop_assert!(chunk.metadata.token_count <= max_tokens || chunk.metadata.over_budget);
            prop_assert_eq!(&serde_json::to_string(&chunk.fixed_fields("text")).unwrap(), &fixed);
        }

        let rebuilt: String = chunks.iter().map(|c| strip_ws(&c.slice)).collect();
        prop_assert_eq!(rebuilt, strip_ws(&text));
    }
}
