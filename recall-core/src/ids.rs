//! Deterministic memory identifiers.
//!
//! Ids are slugs built from key parts, so storing the same logical memory
//! twice (same container, topic, key…) lands on the same id and replaces the
//! earlier entry.

/// Build a slug id from `parts`.
///
/// Each part is lower-cased and every run of characters outside `[a-z0-9]`
/// becomes a single `-`. Parts are joined with `-`, repeated dashes are
/// collapsed and leading/trailing dashes are trimmed.
///
/// ```
/// use recall_core::ids::generate_id;
/// assert_eq!(generate_id(&["Blake", "preference", "AI model"]), "blake-preference-ai-model");
/// ```
#[must_use]
pub fn generate_id<S: AsRef<str>>(parts: &[S]) -> String {
    let mut id = String::new();
    for part in parts {
        if !id.is_empty() {
            id.push('-');
        }
        let mut in_gap = false;
        for ch in part.as_ref().chars().flat_map(char::to_lowercase) {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                in_gap = false;
                id.push(ch);
            } else if !in_gap {
                in_gap = true;
                id.push('-');
            }
        }
    }
    collapse_dashes(&id)
}

fn collapse_dashes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(ch);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// The first `max_chars` characters of `text`, for ids derived from long
/// free text (decisions, learnings).
#[must_use]
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
