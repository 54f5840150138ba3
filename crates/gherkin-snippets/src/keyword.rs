//! Localised step keyword tables and step-line splitting.
//!
//! Completion works on the raw line under the cursor. When the document
//! parses, the parser already knows the keyword and [`split_with_keyword`]
//! applies it. Otherwise the tables here recognise the keyword at the start
//! of the line for the document's language so the remaining text can be
//! normalised and matched.

/// Language assumed when a document carries no `# language:` directive.
pub const DEFAULT_LANGUAGE: &str = "en";

const EN_KEYWORDS: &[&str] = &["* ", "Given ", "When ", "Then ", "And ", "But "];

const RU_KEYWORDS: &[&str] = &[
    "* ",
    "Допустим ",
    "Дано ",
    "Пусть ",
    "Когда ",
    "Если ",
    "То ",
    "Затем ",
    "Тогда ",
    "И ",
    "К тому же ",
    "Также ",
    "Но ",
    "А ",
    "Иначе ",
];

const UK_KEYWORDS: &[&str] = &[
    "* ",
    "Припустимо ",
    "Припустимо, що ",
    "Нехай ",
    "Дано ",
    "Якщо ",
    "Коли ",
    "То ",
    "Тоді ",
    "І ",
    "А також ",
    "Та ",
    "Але ",
];

/// Return the step keywords (with their trailing space) for a language.
///
/// Unknown languages fall back to English.
///
/// # Examples
///
/// ```
/// use gherkin_snippets::step_keywords;
///
/// assert!(step_keywords("ru").contains(&"Дано "));
/// assert_eq!(step_keywords("xx"), step_keywords("en"));
/// ```
#[must_use]
pub fn step_keywords(language: &str) -> &'static [&'static str] {
    match language.to_ascii_lowercase().as_str() {
        "ru" => RU_KEYWORDS,
        "uk" => UK_KEYWORDS,
        _ => EN_KEYWORDS,
    }
}

/// A line split into indentation, step keyword and step text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLine<'a> {
    /// Leading whitespace before the keyword.
    pub indent: &'a str,
    /// The matched keyword, including its trailing space.
    pub keyword: &'a str,
    /// Everything after the keyword.
    pub text: &'a str,
}

impl StepLine<'_> {
    /// Byte offset in the line where the step text starts.
    #[must_use]
    pub fn text_start(&self) -> usize {
        self.indent.len() + self.keyword.len()
    }
}

/// Split a raw line into its step keyword and text.
///
/// Keywords are matched case-sensitively, as Gherkin does, preferring the
/// longest keyword that matches. Returns `None` when the line is not a step.
///
/// # Examples
///
/// ```
/// use gherkin_snippets::split_step_line;
///
/// let line = split_step_line("    Given I have 3 items", "en").expect("step line");
/// assert_eq!(line.keyword, "Given ");
/// assert_eq!(line.text, "I have 3 items");
/// assert_eq!(line.text_start(), 10);
/// ```
#[must_use]
pub fn split_step_line<'a>(line: &'a str, language: &str) -> Option<StepLine<'a>> {
    let body = line.trim_start();
    let indent = line.get(..line.len() - body.len())?;
    let keyword_len = step_keywords(language)
        .iter()
        .filter(|keyword| body.starts_with(**keyword))
        .map(|keyword| keyword.len())
        .max()?;
    let (keyword, text) = body.split_at_checked(keyword_len)?;
    Some(StepLine {
        indent,
        keyword,
        text,
    })
}

/// Split a raw line at a keyword already known for it, such as the one a
/// Gherkin parser reported for the step on that line.
///
/// Returns `None` when the line does not start with `keyword` after its
/// indentation.
///
/// # Examples
///
/// ```
/// use gherkin_snippets::split_with_keyword;
///
/// let line = split_with_keyword("    Soit un panier", "Soit ").expect("step line");
/// assert_eq!(line.text, "un panier");
/// assert_eq!(line.text_start(), 9);
/// ```
#[must_use]
pub fn split_with_keyword<'a>(line: &'a str, keyword: &str) -> Option<StepLine<'a>> {
    let body = line.trim_start();
    let indent = line.get(..line.len() - body.len())?;
    if keyword.is_empty() || !body.starts_with(keyword) {
        return None;
    }
    let (keyword, text) = body.split_at_checked(keyword.len())?;
    Some(StepLine {
        indent,
        keyword,
        text,
    })
}

/// Read the `# language:` directive from the header of a feature source.
///
/// Only comment and blank lines before the first other line are inspected.
///
/// # Examples
///
/// ```
/// use gherkin_snippets::language_directive;
///
/// assert_eq!(language_directive("# language: ru\nФункционал: x\n"), Some("ru"));
/// assert_eq!(language_directive("Feature: x\n# language: ru\n"), None);
/// ```
#[must_use]
pub fn language_directive(source: &str) -> Option<&str> {
    for line in source.lines() {
        let trimmed = line.trim().trim_start_matches('\u{feff}');
        if trimmed.is_empty() {
            continue;
        }
        let comment = trimmed.strip_prefix('#')?;
        let Some(value) = comment
            .trim_start()
            .strip_prefix("language")
            .and_then(|rest| rest.trim_start().strip_prefix(':'))
        else {
            continue;
        };
        return value.split_whitespace().next();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Given I start", "en", "Given ", "I start")]
    #[case("  And more", "en", "And ", "more")]
    #[case("* anything", "en", "* ", "anything")]
    #[case("    Дано я открываю меню", "ru", "Дано ", "я открываю меню")]
    #[case("К тому же шаг", "ru", "К тому же ", "шаг")]
    #[case("Припустимо, що крок", "uk", "Припустимо, що ", "крок")]
    #[case("Given ", "en", "Given ", "")]
    fn splits_step_lines(
        #[case] line: &str,
        #[case] language: &str,
        #[case] keyword: &str,
        #[case] text: &str,
    ) {
        let step = split_step_line(line, language);
        assert_eq!(step.map(|s| (s.keyword, s.text)), Some((keyword, text)));
    }

    #[rstest]
    #[case("Feature: demo", "en")]
    #[case("given lowercase", "en")]
    #[case("Given", "en")]
    #[case("Дано шаг", "en")]
    #[case("", "ru")]
    fn rejects_non_step_lines(#[case] line: &str, #[case] language: &str) {
        assert_eq!(split_step_line(line, language), None);
    }

    #[rstest]
    #[case("    Soit un panier", "Soit ", Some("un panier"))]
    #[case("  Etant donné qu'il pleut", "Etant donné qu'", Some("il pleut"))]
    #[case("\tAngenommen ein Korb", "Angenommen ", Some("ein Korb"))]
    #[case("    Given a step", "Soit ", None)]
    #[case("    Given a step", "", None)]
    fn splits_at_a_known_keyword(
        #[case] line: &str,
        #[case] keyword: &str,
        #[case] text: Option<&str>,
    ) {
        assert_eq!(split_with_keyword(line, keyword).map(|s| s.text), text);
    }

    #[test]
    fn text_start_counts_indent_and_keyword_bytes() {
        let step = split_step_line("\tКогда шаг", "ru");
        assert_eq!(step.map(|s| s.text_start()), Some(1 + "Когда ".len()));
    }

    #[rstest]
    #[case("# language: uk\n", Some("uk"))]
    #[case("\n  #language:ru\nФункционал: x", Some("ru"))]
    #[case("# comment\n# language: en-au\n", Some("en-au"))]
    #[case("Feature: x", None)]
    #[case("", None)]
    fn reads_language_directive(#[case] source: &str, #[case] expected: Option<&str>) {
        assert_eq!(language_directive(source), expected);
    }
}
