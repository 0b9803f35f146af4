//! Note filtering and page matching.
//!
//! Notes reference pages by listing web addresses and tags in their `url`
//! field. A page is matched by its hostname, so a note listing
//! `example.com/docs` is counted for every tab on `example.com`.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Note;

static EXTRACT_HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:[\w-]+://)?(/?[\w-]+(?:\.[\w-]+)*))").expect("valid regex")
});
static STRIP_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^,)|(,$)").expect("valid regex"));
static STRIP_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:[\w-]+://)?(.*)").expect("valid regex"));
static WORD_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("valid regex"));

/// Return the lowercase hostname of `url`, or an empty string.
///
/// # Examples
///
/// ```
/// use spidernotes_core::search::get_hostname;
///
/// assert_eq!(get_hostname("https://Docs.Example.com/page"), "docs.example.com");
/// assert_eq!(get_hostname("   "), "");
/// ```
pub fn get_hostname(url: &str) -> String {
    EXTRACT_HOSTNAME
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|hostname| hostname.as_str().to_lowercase())
        .unwrap_or_default()
}

/// Return `url` without its scheme.
pub fn strip_scheme(url: &str) -> String {
    STRIP_SCHEME
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map_or_else(|| url.to_string(), |rest| rest.as_str().to_string())
}

/// Remove one leading and one trailing comma.
pub fn strip_comma(text: &str) -> String {
    STRIP_COMMA.replace_all(text, "").into_owned()
}

/// Split on commas and whitespace into unique, non-empty words.
pub fn split_unique_words(text: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in WORD_DELIMITER.split(text) {
        if !word.is_empty() && !words.iter().any(|seen| seen == word) {
            words.push(word.to_string());
        }
    }
    words
}

/// Readable notes matching `query`, newest first.
pub fn filter_notes<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let mut matching: Vec<&Note> = notes
        .iter()
        .filter(|note| note.is_readable() && note.matches(query))
        .collect();
    matching.sort_by(|a, b| b.modified.cmp(&a.modified));
    matching
}

/// Number of readable notes that reference the hostname of `url`.
pub fn count_matches(notes: &[Note], url: &str) -> usize {
    let hostname = get_hostname(url);
    if hostname.is_empty() {
        return 0;
    }
    notes
        .iter()
        .filter(|note| note.is_readable() && note.matches(&hostname))
        .count()
}
