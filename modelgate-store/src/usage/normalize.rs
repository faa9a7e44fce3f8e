//! Provider tool-usage vocabulary normalization.

use std::collections::BTreeMap;

/// Canonical key for web search/grounding calls.
pub const WEB_SEARCH: &str = "web_search";

/// Maps a provider-specific tool usage key to the canonical vocabulary.
///
/// Unknown keys are kept as they are.
pub fn canonical_tool_key(key: &str) -> &str {
    match key {
        "web_search_requests" | "grounding_queries" => WEB_SEARCH,
        other => other,
    }
}

/// Normalizes a raw tool usage map.
///
/// Keys that map to the same canonical key are summed. An absent or empty
/// map yields `None`.
pub fn normalize_server_tool_use(
    raw: Option<&BTreeMap<String, u64>>,
) -> Option<BTreeMap<String, u64>> {
    let raw = raw.filter(|m| !m.is_empty())?;

    let mut normalized = BTreeMap::new();
    for (key, value) in raw {
        *normalized
            .entry(canonical_tool_key(key).to_string())
            .or_insert(0) += *value;
    }
    Some(normalized)
}

/// Adds every entry of `from` onto `into`.
pub fn merge_tool_use(into: &mut BTreeMap<String, u64>, from: &BTreeMap<String, u64>) {
    for (key, value) in from {
        *into.entry(key.clone()).or_insert(0) += *value;
    }
}
