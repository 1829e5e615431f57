//! English plural detection and singularization for URL type segments.
//!
//! Rules come from `pluralizer` (the pluralize.js rule set).
//!
//! # Invariants
//! - Only the last hyphen-separated segment is inflected (`hot-drinks` ->
//!   `hot-drink`, `service-people` -> `service-person`).
//! - Uncountable words count as plural and singularize to themselves.

/// Returns whether `word` reads as an English plural.
///
/// A word is plural when pluralizing it changes nothing.
pub fn is_plural(word: &str) -> bool {
    let (_, last) = split_last_segment(word);
    !last.is_empty() && pluralizer::pluralize(last, 2, false) == last
}

/// Returns the singular form of `word`; singular words come back as-is.
pub fn singularize(word: &str) -> String {
    let (prefix, last) = split_last_segment(word);
    format!("{prefix}{}", pluralizer::pluralize(last, 1, false))
}

fn split_last_segment(word: &str) -> (&str, &str) {
    match word.rfind('-') {
        Some(index) => word.split_at(index + 1),
        None => ("", word),
    }
}
