//! Filler-span lexer shared by snippet normalisation and alignment.
//!
//! Step text carries spans whose content is irrelevant when matching a step
//! against its definition: quoted literals, `<placeholder>` tokens and
//! whitespace. Both the normaliser and the alignment engine recognise these
//! spans through this module so the two never disagree on where a span
//! starts or ends.
//!
//! The lexer operates on `char` slices; span lengths are counted in chars.

/// Kind of filler span recognised in step text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// A single whitespace character.
    Whitespace,
    /// A `'''…'''` block. Six consecutive quotes inside escape one delimiter.
    TripleQuoted,
    /// A `'…'` literal. `''` inside escapes one quote.
    SingleQuoted,
    /// A `"…"` literal. `""` inside escapes one quote.
    DoubleQuoted,
    /// An `<name>` placeholder token.
    Placeholder,
}

impl SpanKind {
    /// Sentinel text substituted for the span in placeholder form.
    ///
    /// Whitespace is preserved in placeholder form, so its sentinel is a
    /// single space.
    ///
    /// # Examples
    ///
    /// ```
    /// use gherkin_snippets::SpanKind;
    ///
    /// assert_eq!(SpanKind::DoubleQuoted.sentinel(), "\"\"");
    /// assert_eq!(SpanKind::Placeholder.sentinel(), "<>");
    /// ```
    #[must_use]
    pub const fn sentinel(self) -> &'static str {
        match self {
            Self::Whitespace => " ",
            Self::TripleQuoted => "''''''",
            Self::SingleQuoted => "''",
            Self::DoubleQuoted => "\"\"",
            Self::Placeholder => "<>",
        }
    }
}

/// A recognised span: its kind, start index and length in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillerSpan {
    /// What the span contains.
    pub kind: SpanKind,
    /// Index of the first char of the span.
    pub start: usize,
    /// Number of chars covered by the span, delimiters included.
    pub len: usize,
}

impl FillerSpan {
    /// Index one past the last char of the span.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }
}

const TRIPLE_QUOTE: [char; 3] = ['\'', '\'', '\''];
const SINGLE_QUOTE: [char; 1] = ['\''];
const DOUBLE_QUOTE: [char; 1] = ['"'];

/// Recognise a quoted literal or placeholder starting exactly at `pos`.
///
/// At the same start position triple quotes win over single quotes. Returns
/// `None` when `pos` is out of range or no complete span starts there.
///
/// # Examples
///
/// ```
/// use gherkin_snippets::{literal_span_at, SpanKind};
///
/// let chars: Vec<char> = "say \"it\"\"s\" now".chars().collect();
/// let span = literal_span_at(&chars, 4).expect("double-quoted literal");
/// assert_eq!(span.kind, SpanKind::DoubleQuoted);
/// assert_eq!(span.len, 7);
/// ```
#[must_use]
pub fn literal_span_at(chars: &[char], pos: usize) -> Option<FillerSpan> {
    match chars.get(pos)? {
        '\'' => delimited_span(chars, pos, &TRIPLE_QUOTE, SpanKind::TripleQuoted)
            .or_else(|| delimited_span(chars, pos, &SINGLE_QUOTE, SpanKind::SingleQuoted)),
        '"' => delimited_span(chars, pos, &DOUBLE_QUOTE, SpanKind::DoubleQuoted),
        '<' => placeholder_span(chars, pos),
        _ => None,
    }
}

/// Recognise any filler span starting exactly at `pos`.
///
/// Candidates are tried in order: whitespace, triple-quoted, single-quoted,
/// double-quoted, placeholder. Whitespace spans cover one char; callers skip
/// runs by calling this repeatedly.
#[must_use]
pub fn filler_span_at(chars: &[char], pos: usize) -> Option<FillerSpan> {
    if chars.get(pos)?.is_whitespace() {
        return Some(FillerSpan {
            kind: SpanKind::Whitespace,
            start: pos,
            len: 1,
        });
    }
    literal_span_at(chars, pos)
}

fn starts_with(chars: &[char], pos: usize, delimiter: &[char]) -> bool {
    chars
        .get(pos..pos.saturating_add(delimiter.len()))
        .is_some_and(|window| window == delimiter)
}

/// Match `delimiter … delimiter` where a doubled delimiter inside is content.
///
/// When a doubled delimiter is followed by text that never closes, the match
/// falls back to the last position where the first half of a doubled
/// delimiter could have closed the span.
fn delimited_span(
    chars: &[char],
    pos: usize,
    delimiter: &[char],
    kind: SpanKind,
) -> Option<FillerSpan> {
    let quote = *delimiter.first()?;
    if !starts_with(chars, pos, delimiter) {
        return None;
    }
    let width = delimiter.len();
    let mut cursor = pos + width;
    let mut fallback = None;

    while let Some(&ch) = chars.get(cursor) {
        if starts_with(chars, cursor, delimiter) {
            let end = cursor + width;
            if starts_with(chars, end, delimiter) {
                fallback = Some(end);
                cursor = end + width;
                continue;
            }
            return Some(span_until(kind, pos, end));
        }
        if ch == quote {
            // A stray quote shorter than the delimiter cannot be content.
            break;
        }
        cursor += 1;
    }

    fallback.map(|end| span_until(kind, pos, end))
}

fn placeholder_span(chars: &[char], pos: usize) -> Option<FillerSpan> {
    let mut cursor = pos + 1;
    while let Some(&ch) = chars.get(cursor) {
        match ch {
            '>' => return Some(span_until(SpanKind::Placeholder, pos, cursor + 1)),
            '<' => return None,
            _ => cursor += 1,
        }
    }
    None
}

const fn span_until(kind: SpanKind, start: usize, end: usize) -> FillerSpan {
    FillerSpan {
        kind,
        start,
        len: end - start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    fn span_text(text: &str, pos: usize) -> Option<(SpanKind, String)> {
        let chars = chars(text);
        literal_span_at(&chars, pos).map(|span| {
            let covered = chars
                .iter()
                .skip(span.start)
                .take(span.len)
                .collect::<String>();
            (span.kind, covered)
        })
    }

    #[rstest]
    #[case("'abc' tail", SpanKind::SingleQuoted, "'abc'")]
    #[case("\"abc\" tail", SpanKind::DoubleQuoted, "\"abc\"")]
    #[case("'''block''' tail", SpanKind::TripleQuoted, "'''block'''")]
    #[case("<count> items", SpanKind::Placeholder, "<count>")]
    #[case("'' rest", SpanKind::SingleQuoted, "''")]
    #[case("''''''", SpanKind::TripleQuoted, "''''''")]
    #[case("<>", SpanKind::Placeholder, "<>")]
    fn recognises_literal_spans(
        #[case] text: &str,
        #[case] kind: SpanKind,
        #[case] covered: &str,
    ) {
        assert_eq!(span_text(text, 0), Some((kind, covered.to_string())));
    }

    #[rstest]
    #[case("'it''s' done", "'it''s'")]
    #[case("\"say \"\"hi\"\"\" done", "\"say \"\"hi\"\"\"")]
    #[case("'''a''''''b''' done", "'''a''''''b'''")]
    fn doubled_delimiter_stays_inside_one_span(#[case] text: &str, #[case] covered: &str) {
        let covered_text = span_text(text, 0).map(|(_, text)| text);
        assert_eq!(covered_text.as_deref(), Some(covered));
    }

    #[test]
    fn doubled_delimiter_without_closer_falls_back_to_first_half() {
        assert_eq!(
            span_text("'a''", 0),
            Some((SpanKind::SingleQuoted, "'a'".to_string()))
        );
    }

    #[rstest]
    #[case("'unterminated")]
    #[case("\"unterminated")]
    #[case("<open < nested>")]
    #[case("<never closed")]
    #[case("plain")]
    fn rejects_incomplete_spans(#[case] text: &str) {
        assert_eq!(span_text(text, 0), None);
    }

    #[test]
    fn stray_quote_inside_triple_block_falls_back_to_single_quotes() {
        assert_eq!(
            span_text("'''a'b'''", 0),
            Some((SpanKind::SingleQuoted, "'''a'".to_string()))
        );
    }

    #[test]
    fn filler_span_prefers_whitespace() {
        let text = chars(" 'x'");
        assert_eq!(
            filler_span_at(&text, 0),
            Some(FillerSpan {
                kind: SpanKind::Whitespace,
                start: 0,
                len: 1,
            })
        );
        assert_eq!(filler_span_at(&text, 1).map(|span| span.end()), Some(4));
    }

    #[test]
    fn out_of_range_positions_yield_nothing() {
        let text = chars("ab");
        assert_eq!(filler_span_at(&text, 2), None);
        assert_eq!(filler_span_at(&text, usize::MAX), None);
    }
}
