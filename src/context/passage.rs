use crate::retrieval::SearchMatch;
use serde_json::Value;

/// Metadata key holding the passage body
const TEXT_KEY: &str = "text";

/// Render a match as `key: value` lines, a blank line, then its text
///
/// Only string metadata is rendered, in key order. Either part may be
/// missing, in which case no blank line is emitted.
pub fn render_passage(m: &SearchMatch) -> String {
    let header: Vec<String> = m
        .metadata
        .iter()
        .filter(|(key, _)| key.as_str() != TEXT_KEY)
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some(format!("{key}: {s}")),
            _ => None,
        })
        .collect();

    match (header.is_empty(), m.text()) {
        (false, Some(text)) => format!("{}\n\n{}", header.join("\n"), text),
        (false, None) => header.join("\n"),
        (true, Some(text)) => text.to_string(),
        (true, None) => String::new(),
    }
}
