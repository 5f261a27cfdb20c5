//! Local keyword search.
//!
//! Scoring is plain lexical overlap:
//!
//! ```text
//! score = |{ k ∈ keywords : k ⊂ haystack }| / |keywords|
//! ```
//!
//! where `keywords` are the whitespace-separated, lower-cased query tokens
//! and the haystack of an entry is its content, id and topic labels (all
//! lower-cased). Ids carry the key of a `remember` call, so
//! `"what model does Blake prefer"` finds `ai-model-preference` even when
//! the stored value never says "model".

use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::types::{LocalMemory, MemoryResult, SearchOptions};

/// Split a query into lower-cased keywords.
#[must_use]
pub fn keywords(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Text an entry is matched against.
fn haystack(memory: &LocalMemory) -> String {
    let mut text = memory.content.to_lowercase();
    text.push('\n');
    text.push_str(&memory.id.to_lowercase());
    for topic in &memory.metadata.topics {
        text.push('\n');
        text.push_str(&topic.to_lowercase());
    }
    text
}

/// Fraction of `keywords` found as substrings of `memory`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score(memory: &LocalMemory, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let text = haystack(memory);
    let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
    hits as f64 / keywords.len() as f64
}

fn passes_filters(memory: &LocalMemory, options: &SearchOptions) -> bool {
    if let Some(container) = &options.container {
        if &memory.container != container {
            return false;
        }
    }
    if !options.containers.is_empty() && !options.containers.contains(&memory.container) {
        return false;
    }
    if let Some(category) = options.category {
        if memory.metadata.category != Some(category) {
            return false;
        }
    }
    true
}

/// Rank `memories` against `query`.
///
/// Only entries matching at least one keyword are returned. Results are
/// sorted by descending score; equal scores keep store order.
///
/// An empty or whitespace-only query returns nothing. A naive whitespace
/// split would yield one empty keyword that matches every entry and turn the
/// search into a listing; listing goes through the store instead.
#[must_use]
pub fn search_local(memories: &[LocalMemory], query: &str, options: &SearchOptions) -> Vec<MemoryResult> {
    let keywords = keywords(query);
    if keywords.is_empty() {
        return Vec::new();
    }
    let threshold = options.threshold.unwrap_or(0.0);

    let mut scored: Vec<(f64, &LocalMemory)> = memories
        .iter()
        .filter(|m| passes_filters(m, options))
        .map(|m| (score(m, &keywords), m))
        .filter(|(s, _)| *s > 0.0 && *s >= threshold)
        .collect();

    // `sort_by_key` is stable, so ties keep insertion order.
    scored.sort_by_key(|(s, _)| Reverse(OrderedFloat(*s)));
    scored.truncate(options.effective_limit());

    scored
        .into_iter()
        .map(|(score, m)| MemoryResult {
            id: m.id.clone(),
            content: m.content.clone(),
            container: m.container.clone(),
            metadata: m.metadata.clone(),
            score,
            created_at: m.created_at.clone(),
        })
        .collect()
}
