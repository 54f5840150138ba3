//! Alignment between a canonical matching key and a candidate string.
//!
//! Normalisation deletes literals and whitespace, so a position in the
//! canonical form of typed text does not correspond to the same position in
//! a candidate's placeholder form. [`reverse_index`] walks both strings,
//! skipping filler spans in the candidate, and reports where the match ends.

use crate::lexer::filler_span_at;
use crate::normalize::canonical_form;

/// Return whether `ch` counts as a word character during alignment.
///
/// Word characters are Unicode alphanumerics and `_`, which covers Latin and
/// Cyrillic step text alike.
#[must_use]
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Map the end of a canonical prefix back to a byte offset in `candidate`.
///
/// The walk compares every canonical char except the last one, skipping
/// filler spans in the candidate whenever it sits on a non-word char. It
/// stops at the first mismatch or when the candidate is exhausted. A non-word
/// char that starts no filler span is compared as-is.
///
/// The result is always a char boundary of `candidate` and never exceeds its
/// length. An empty canonical string yields `0`.
///
/// # Examples
///
/// ```
/// use gherkin_snippets::{canonical_form, reverse_index};
///
/// let typed = canonical_form("I have <n> items");
/// assert_eq!(reverse_index(&typed, "I have 5 items"), "I have ".len());
/// ```
#[must_use]
pub fn reverse_index(canonical: &str, candidate: &str) -> usize {
    let typed: Vec<char> = canonical.chars().collect();
    let Some(last) = typed.len().checked_sub(1) else {
        return 0;
    };
    let chars: Vec<char> = candidate.chars().collect();

    let mut i = 0;
    let mut offset = 0;
    while i < last {
        let cursor = skip_filler(&chars, i + offset);
        offset = cursor - i;

        let (Some(expected), Some(actual)) = (typed.get(i), chars.get(cursor)) else {
            break;
        };
        if !eq_ignore_case(*expected, *actual) {
            break;
        }
        i += 1;
    }

    char_to_byte_offset(candidate, (i + offset).min(chars.len()))
}

/// Return the part of `candidate` left unmatched by the typed text.
///
/// `typed` is raw step text; it is normalised to canonical form before
/// alignment. The last typed char is never compared, so the suffix starts
/// with it when the rest of the text matched.
///
/// # Examples
///
/// ```
/// use gherkin_snippets::unmatched_suffix;
///
/// assert_eq!(unmatched_suffix("I have 3 it", "I have <> items"), "items");
/// ```
#[must_use]
pub fn unmatched_suffix<'a>(typed: &str, candidate: &'a str) -> &'a str {
    let offset = reverse_index(&canonical_form(typed), candidate);
    candidate.get(offset..).unwrap_or_default()
}

fn skip_filler(chars: &[char], mut cursor: usize) -> usize {
    while let Some(&ch) = chars.get(cursor) {
        if is_word_char(ch) {
            break;
        }
        match filler_span_at(chars, cursor) {
            Some(span) => cursor = span.end(),
            None => break,
        }
    }
    cursor
}

fn eq_ignore_case(left: char, right: char) -> bool {
    left == right || left.to_lowercase().eq(right.to_lowercase())
}

fn char_to_byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(byte, _)| byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "anything")]
    #[case("", "")]
    fn empty_canonical_aligns_to_start(#[case] canonical: &str, #[case] candidate: &str) {
        assert_eq!(reverse_index(canonical, candidate), 0);
    }

    #[test]
    fn placeholder_in_typed_text_stops_before_the_value() {
        let typed = canonical_form("I have <n> items");
        assert_eq!(reverse_index(&typed, "I have 5 items"), 7);
    }

    #[test]
    fn skips_sentinels_in_the_candidate() {
        let typed = canonical_form("I have 3 it");
        assert_eq!(reverse_index(&typed, "I have <> items"), 10);
    }

    #[test]
    fn comparison_ignores_case() {
        assert_eq!(reverse_index("IHAVEx", "i have many"), 6);
        assert_eq!(
            reverse_index("ЯОТКРЫВАЮ", "я открываю меню"),
            "я открыва".len()
        );
    }

    #[test]
    fn last_canonical_char_is_not_compared() {
        assert_eq!(reverse_index("abc", "abc"), 2);
        assert_eq!(reverse_index("abz", "abc"), 2);
    }

    #[test]
    fn punctuation_without_a_span_is_compared_directly() {
        assert_eq!(reverse_index("a,bx", "a, b"), 4);
        assert_eq!(reverse_index("a,bx", "a; b"), 1);
    }

    #[rstest]
    #[case("abcdef", "abc", 3)]
    #[case("abcx", "ab  'q'", 7)]
    #[case("abcx", "ab   ", 5)]
    #[case("ab", "", 0)]
    #[case("abcd", "ab 'unterminated", 3)]
    fn never_reads_past_the_candidate(
        #[case] canonical: &str,
        #[case] candidate: &str,
        #[case] expected: usize,
    ) {
        let offset = reverse_index(canonical, candidate);
        assert_eq!(offset, expected);
        assert!(offset <= candidate.len());
    }

    #[test]
    fn offsets_are_byte_positions_on_char_boundaries() {
        let candidate = "я вижу <> окно";
        let offset = reverse_index(&canonical_form("я вижу 2 ок"), candidate);
        assert!(candidate.is_char_boundary(offset));
        assert_eq!(candidate.get(offset..), Some("окно"));
    }

    #[test]
    fn unmatched_suffix_returns_remaining_text() {
        assert_eq!(unmatched_suffix("I have 3 it", "I have <> items"), "items");
        assert_eq!(unmatched_suffix("", "whole"), "whole");
        assert_eq!(unmatched_suffix("longer than candidate", "lo"), "");
    }
}
