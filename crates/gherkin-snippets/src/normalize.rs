//! Snippet normalisation of step text.
//!
//! Two forms are produced from the same lexer:
//!
//! - the *canonical* form deletes every quoted literal and placeholder and
//!   then strips all whitespace, giving a dense key for matching;
//! - the *placeholder* form swaps each literal or placeholder for a fixed
//!   sentinel (`''''''`, `''`, `""`, `<>`) and keeps word spacing, giving a
//!   stable display and alignment form.

use crate::lexer::{SpanKind, literal_span_at};

/// Which normalised form to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnippetForm {
    /// Literals and placeholders removed, whitespace stripped.
    #[default]
    Canonical,
    /// Literals and placeholders replaced by sentinels, whitespace kept.
    Placeholder,
}

/// Normalise step text into the requested form.
///
/// # Examples
///
/// ```
/// use gherkin_snippets::{to_snippet, SnippetForm};
///
/// let text = "I send \"hello\" to <user>";
/// assert_eq!(to_snippet(text, SnippetForm::Canonical), "Isendto");
/// assert_eq!(to_snippet(text, SnippetForm::Placeholder), "I send \"\" to <>");
/// ```
#[must_use]
pub fn to_snippet(text: &str, form: SnippetForm) -> String {
    match form {
        SnippetForm::Canonical => canonical_form(text),
        SnippetForm::Placeholder => placeholder_form(text),
    }
}

/// Produce the canonical matching key for step text.
///
/// Deleting a span can bring two delimiters together, so deletion repeats
/// until no span is left. This keeps the transform idempotent.
#[must_use]
pub fn canonical_form(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let (next, replaced) = replace_literals(&current, |_| "");
        current = next;
        if !replaced {
            break;
        }
    }
    current.retain(|ch| !ch.is_whitespace());
    current
}

/// Produce the placeholder form of step text.
#[must_use]
pub fn placeholder_form(text: &str) -> String {
    replace_literals(text, SpanKind::sentinel).0
}

fn replace_literals(text: &str, replacement: impl Fn(SpanKind) -> &'static str) -> (String, bool) {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut replaced = false;
    let mut pos = 0;

    while let Some(&ch) = chars.get(pos) {
        if let Some(span) = literal_span_at(&chars, pos) {
            out.push_str(replacement(span.kind));
            replaced = true;
            pos = span.end();
        } else {
            out.push(ch);
            pos += 1;
        }
    }

    (out, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("I have <n> items", "Ihaveitems", "I have <> items")]
    #[case("the user 'bob' logs in", "theuserlogsin", "the user '' logs in")]
    #[case("a doc '''\nline\n'''", "adoc", "a doc ''''''")]
    #[case("I type \"a \"\"quoted\"\" word\"", "Itype", "I type \"\"")]
    #[case("it's open", "it'sopen", "it's open")]
    #[case("  spaced   out  ", "spacedout", "  spaced   out  ")]
    #[case("", "", "")]
    fn produces_both_forms(
        #[case] text: &str,
        #[case] canonical: &str,
        #[case] placeholder: &str,
    ) {
        assert_eq!(to_snippet(text, SnippetForm::Canonical), canonical);
        assert_eq!(to_snippet(text, SnippetForm::Placeholder), placeholder);
    }

    #[rstest]
    #[case("I open the main menu")]
    #[case("Я открываю главное   меню")]
    #[case("tabs\tand\nnewlines")]
    fn plain_text_forms_agree_without_whitespace(#[case] text: &str) {
        let mut placeholder = placeholder_form(text);
        placeholder.retain(|ch| !ch.is_whitespace());
        assert_eq!(canonical_form(text), placeholder);
    }

    #[rstest]
    #[case("I have <n> items")]
    #[case("<a \"<\" b>")]
    #[case("'x' \"y\" '''z''' <w>")]
    #[case("odd ' and \" quotes")]
    fn canonical_form_is_idempotent(#[case] text: &str) {
        let once = canonical_form(text);
        assert_eq!(canonical_form(&once), once);
    }

    #[test]
    fn placeholder_form_is_stable_under_reapplication() {
        let once = placeholder_form("I say 'hi' and \"bye\" to <who> with '''doc'''");
        assert_eq!(placeholder_form(&once), once);
    }

    #[test]
    fn quotes_inside_other_literals_are_content() {
        assert_eq!(canonical_form("I see \"it's fine\" now"), "Iseenow");
        assert_eq!(placeholder_form("I see \"it's fine\" now"), "I see \"\" now");
    }

    #[test]
    fn deleting_a_span_can_expose_another() {
        assert_eq!(canonical_form("<a \"<\" b>"), "");
    }
}
