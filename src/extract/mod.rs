//! Structured clinical extraction.
//!
//! A single generic match-filter-extract routine consumes the declarative
//! phrase tables in `patterns`: find a phrase case-insensitively, reject it
//! if the enclosing sentence negates it or marks it as historical, and cut a
//! verbatim sentence-bounded snippet around the match for citation.

pub(crate) mod admission;
pub(crate) mod community;
pub(crate) mod patterns;

use std::ops::Range;

/// Character budget per side of a match when a sentence boundary is further
/// away than this; keeps snippets usable as highlight targets.
const SNIPPET_CONTEXT_CHARS: usize = 150;

/// How far before a match the immediate-negation prefixes are checked.
const NEGATION_LOOKBEHIND_CHARS: usize = 30;

/// A phrase located in a note body, with its enclosing sentence.
#[derive(Debug, Clone)]
pub(crate) struct PhraseMatch {
    pub range: Range<usize>,
    pub sentence: Range<usize>,
}

/// Case-insensitive search for `needle` in `haystack` starting at byte
/// offset `from` (a char boundary). Returns the byte range of the match in
/// the original string, so snippets stay verbatim substrings.
pub(crate) fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    for (offset, _) in haystack[from..].char_indices() {
        let start = from + offset;
        if let Some(len) = match_len_ci(&haystack[start..], needle) {
            return Some(start..start + len);
        }
    }
    None
}

/// If `hay` starts with `needle` case-insensitively, the byte length of the
/// matched prefix of `hay`.
fn match_len_ci(hay: &str, needle: &str) -> Option<usize> {
    let mut len = 0;
    let mut hay_chars = hay.chars();
    for nc in needle.chars() {
        let hc = hay_chars.next()?;
        if !hc.to_lowercase().eq(nc.to_lowercase()) {
            return None;
        }
        len += hc.len_utf8();
    }
    Some(len)
}

fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

/// Byte range of the sentence enclosing `range` (terminators excluded).
fn sentence_bounds(body: &str, range: &Range<usize>) -> Range<usize> {
    let start = body[..range.start]
        .rfind(is_sentence_terminator)
        .map(|i| i + body[i..].chars().next().map_or(1, |c| c.len_utf8()))
        .unwrap_or(0);
    let end = body[range.end..]
        .find(is_sentence_terminator)
        .map(|i| range.end + i)
        .unwrap_or(body.len());
    start..end
}

/// Step `index` down to the nearest char boundary.
fn floor_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Step `index` up to the nearest char boundary.
fn ceil_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Find every occurrence of any of `phrases`, in body order.
fn all_matches(body: &str, phrases: &[&str]) -> Vec<PhraseMatch> {
    let mut found: Vec<PhraseMatch> = Vec::new();
    for phrase in phrases {
        let mut from = 0;
        while let Some(range) = find_ci(body, phrase, from) {
            from = ceil_boundary(body, range.start + 1);
            let sentence = sentence_bounds(body, &range);
            found.push(PhraseMatch { range, sentence });
        }
    }
    found.sort_by_key(|m| m.range.start);
    found
}

/// Does a negation cue sit immediately before the match or anywhere in the
/// enclosing sentence?
fn is_negated(body: &str, m: &PhraseMatch) -> bool {
    let lookbehind_start = floor_boundary(
        body,
        m.range.start.saturating_sub(NEGATION_LOOKBEHIND_CHARS).max(m.sentence.start),
    );
    let before = body[lookbehind_start..m.range.start].to_lowercase();
    if patterns::NEGATION_PREFIXES.iter().any(|p| before.contains(p)) {
        return true;
    }
    let sentence = body[m.sentence.clone()].to_lowercase();
    patterns::NEGATION_SENTENCE_CUES.iter().any(|p| sentence.contains(p))
}

/// Does the enclosing sentence refer backwards (history, previous episodes)?
fn is_historical(body: &str, m: &PhraseMatch) -> bool {
    let sentence = body[m.sentence.clone()].to_lowercase();
    patterns::HISTORY_MARKERS.iter().any(|p| sentence.contains(p))
}

/// Is the match inside adverse-reaction context ("allergic to X")?
fn is_adverse_context(body: &str, m: &PhraseMatch) -> bool {
    let sentence = body[m.sentence.clone()].to_lowercase();
    patterns::ADVERSE_REACTION_MARKERS.iter().any(|p| sentence.contains(p))
}

/// First occurrence of any of `phrases` that survives the negation and
/// historicity filters (and, for medications, the adverse-reaction filter).
pub(crate) fn first_valid_match(
    body: &str,
    phrases: &[&str],
    check_adverse: bool,
) -> Option<PhraseMatch> {
    all_matches(body, phrases).into_iter().find(|m| {
        !is_negated(body, m)
            && !is_historical(body, m)
            && !(check_adverse && is_adverse_context(body, m))
    })
}

/// Cut the citation snippet for a match: the enclosing sentence, capped at
/// the character budget on each side of the match. Always a contiguous,
/// case-preserved substring of `body`.
pub(crate) fn snippet(body: &str, m: &PhraseMatch) -> String {
    let mut start = m.sentence.start;
    let mut end = m.sentence.end;
    if m.range.start - start > SNIPPET_CONTEXT_CHARS {
        start = floor_boundary(body, m.range.start - SNIPPET_CONTEXT_CHARS);
    }
    if end - m.range.end > SNIPPET_CONTEXT_CHARS {
        end = floor_boundary(body, m.range.end + SNIPPET_CONTEXT_CHARS);
    }
    body[start..end].trim().to_string()
}

/// Re-locate a snippet inside a note body: case-insensitive substring
/// search, extended to sentence boundaries with the same rules the
/// extractor used. This is the contract the presentation layer relies on to
/// highlight citations independently.
pub fn locate_snippet(body: &str, snippet: &str) -> Option<Range<usize>> {
    let range = find_ci(body, snippet, 0)?;
    Some(sentence_bounds(body, &range))
}
