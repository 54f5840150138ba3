//! Behavioural tests for snippet normalisation and alignment working together.

use gherkin_snippets::{
    SnippetForm, canonical_form, placeholder_form, reverse_index, split_step_line, to_snippet,
    unmatched_suffix,
};
use rstest::rstest;

#[rstest]
#[case("I press the \"OK\" button")]
#[case("Я нажимаю кнопку 'Записать'")]
#[case("the <field> equals '''long\ntext'''")]
fn canonical_of_placeholder_form_matches_canonical(#[case] text: &str) {
    assert_eq!(canonical_form(&placeholder_form(text)), canonical_form(text));
}

#[test]
fn doubled_delimiters_are_one_literal_in_every_form() {
    let text = "I enter 'O''Brien' as name";
    assert_eq!(to_snippet(text, SnippetForm::Canonical), "Ienterasname");
    assert_eq!(
        to_snippet(text, SnippetForm::Placeholder),
        "I enter '' as name"
    );
}

#[test]
fn typed_step_aligns_against_stored_placeholder_form() {
    let line = split_step_line("    When I enter 'bob' as na", "en");
    let typed = line.map(|step| step.text).unwrap_or_default();
    let candidate = placeholder_form("I enter 'alice' as name");

    let offset = reverse_index(&canonical_form(typed), &candidate);
    assert_eq!(candidate.get(..offset), Some("I enter '' as n"));
    assert_eq!(unmatched_suffix(typed, &candidate), "ame");
}
