//! Duplicate title detection
//!
//! A deliberately blunt containment heuristic: normalize both titles and
//! flag a duplicate when either normalized form contains the other. It
//! misses paraphrases and occasionally over-matches, but it is fast,
//! dependency-free, and catches the common case of an agent re-recording
//! the same lesson with minor wording drift.

/// Minimum normalized length for a string to count as contained.
/// Keeps short fragments like "fix bug" from matching everything.
const MIN_OVERLAP_LEN: usize = 10;

/// Normalize a title for comparison: lowercase, punctuation stripped,
/// whitespace collapsed to single spaces.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether two titles duplicate each other under the containment rule.
pub fn titles_match(a: &str, b: &str) -> bool {
    let na = normalize_title(a);
    let nb = normalize_title(b);
    (nb.len() >= MIN_OVERLAP_LEN && na.contains(&nb))
        || (na.len() >= MIN_OVERLAP_LEN && nb.contains(&na))
}

/// Find the first existing title the candidate duplicates.
pub fn find_duplicate<'a, I>(title: &str, existing: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let norm = normalize_title(title);
    existing.into_iter().find(|e| {
        let en = normalize_title(e);
        (en.len() >= MIN_OVERLAP_LEN && norm.contains(&en))
            || (norm.len() >= MIN_OVERLAP_LEN && en.contains(&norm))
    })
}

/// Whether the candidate duplicates any existing title.
pub fn is_duplicate<'a, I>(title: &str, existing: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    find_duplicate(title, existing).is_some()
}
