//! Feature file indexing.

use std::path::Path;

use gherkin::GherkinEnv;
use gherkin_snippets::{DEFAULT_LANGUAGE, SnippetForm, language_directive, to_snippet};

use super::{EntryKind, FeatureIndexError, IndexEntry, LanguageInfo};

const EXPORT_TAG: &str = "ExportScenarios";

/// A feature-level tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag name, with or without the leading `@`.
    pub name: String,
}

/// A step inside a feature child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStep {
    /// Keyword as written in the source, in the document's language,
    /// including its trailing space.
    pub keyword: String,
    /// Step text after the keyword.
    pub text: String,
    /// 1-based source line.
    pub line: u32,
}

/// A background or scenario, flattened out of any enclosing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureChild {
    /// Scenario name; empty for unnamed backgrounds.
    pub name: String,
    /// 1-based line of the header.
    pub line: u32,
    /// Steps in source order.
    pub steps: Vec<DocumentStep>,
}

/// The parts of a parsed feature that the index cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDocument {
    /// Feature-level tags.
    pub tags: Vec<Tag>,
    /// Backgrounds and scenarios, including those nested in rules.
    pub children: Vec<FeatureChild>,
    /// Gherkin language tag.
    pub language: String,
}

impl FeatureDocument {
    /// Whether the feature is tagged for scenario export.
    #[must_use]
    pub fn exports_scenarios(&self) -> bool {
        self.tags.iter().any(|tag| {
            tag.name
                .trim_start_matches('@')
                .eq_ignore_ascii_case(EXPORT_TAG)
        })
    }

    /// The step that starts on the 1-based `line`, if any.
    #[must_use]
    pub fn step_at(&self, line: u32) -> Option<&DocumentStep> {
        self.children
            .iter()
            .flat_map(|child| &child.steps)
            .find(|step| step.line == line)
    }
}

/// Parses feature source text into a [`FeatureDocument`].
pub trait FeatureParser: Send + Sync {
    /// Parse `source`.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureIndexError::Parse`] when the text is not valid
    /// Gherkin.
    fn parse(&self, source: &str) -> Result<FeatureDocument, FeatureIndexError>;
}

/// [`FeatureParser`] backed by the `gherkin` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GherkinFeatureParser;

impl FeatureParser for GherkinFeatureParser {
    fn parse(&self, source: &str) -> Result<FeatureDocument, FeatureIndexError> {
        let mut text = source.to_owned();
        normalise_trailing_newline(&mut text);
        let feature = gherkin::Feature::parse(&text, GherkinEnv::default())?;

        let mut children = Vec::new();
        if let Some(background) = feature.background.as_ref() {
            children.push(background_child(background));
        }
        children.extend(feature.scenarios.iter().map(scenario_child));
        for rule in &feature.rules {
            if let Some(background) = rule.background.as_ref() {
                children.push(background_child(background));
            }
            children.extend(rule.scenarios.iter().map(scenario_child));
        }

        Ok(FeatureDocument {
            tags: feature
                .tags
                .iter()
                .map(|name| Tag { name: name.clone() })
                .collect(),
            children,
            language: language_directive(&text).unwrap_or(DEFAULT_LANGUAGE).to_owned(),
        })
    }
}

fn normalise_trailing_newline(text: &mut String) {
    if !text.ends_with('\n') {
        text.push('\n');
    }
}

fn line_number(position: gherkin::LineCol) -> u32 {
    u32::try_from(position.line).unwrap_or(u32::MAX)
}

fn document_steps(steps: &[gherkin::Step]) -> Vec<DocumentStep> {
    steps
        .iter()
        .map(|step| DocumentStep {
            keyword: step.keyword.clone(),
            text: step.value.clone(),
            line: line_number(step.position),
        })
        .collect()
}

fn background_child(background: &gherkin::Background) -> FeatureChild {
    FeatureChild {
        name: background.name.clone(),
        line: line_number(background.position),
        steps: document_steps(&background.steps),
    }
}

fn scenario_child(scenario: &gherkin::Scenario) -> FeatureChild {
    FeatureChild {
        name: scenario.name.clone(),
        line: line_number(scenario.position),
        steps: document_steps(&scenario.steps),
    }
}

/// Turn a parsed feature into index entries and its language record.
///
/// Every step yields a non-exported entry. When the feature carries the
/// `@ExportScenarios` tag, every named child also yields an exported entry
/// ahead of its steps.
#[must_use]
pub fn index_feature_document(
    document: &FeatureDocument,
    filename: &Path,
) -> (Vec<IndexEntry>, LanguageInfo) {
    let exported = document.exports_scenarios();
    let mut entries = Vec::new();

    for child in &document.children {
        if exported && !child.name.trim().is_empty() {
            entries.push(IndexEntry {
                id: child.name.to_lowercase(),
                name: child.name.clone(),
                snippet: to_snippet(&child.name, SnippetForm::Canonical),
                description: child.name.clone(),
                filename: filename.to_path_buf(),
                line: child.line,
                endline: child.line,
                is_exported: true,
                kind: EntryKind::ExportedScenario,
            });
        }
        entries.extend(child.steps.iter().map(|step| step_entry(step, filename)));
    }

    let language = LanguageInfo {
        filename: filename.to_path_buf(),
        language: document.language.clone(),
    };
    (entries, language)
}

fn step_entry(step: &DocumentStep, filename: &Path) -> IndexEntry {
    let name = to_snippet(&step.text, SnippetForm::Placeholder);
    IndexEntry {
        id: name.to_lowercase(),
        snippet: to_snippet(&step.text, SnippetForm::Canonical),
        name,
        description: step.text.clone(),
        filename: filename.to_path_buf(),
        line: step.line,
        endline: step.line,
        is_exported: false,
        kind: EntryKind::Step,
    }
}

/// Parse `source` with `parser` and index it as `filename`.
///
/// # Errors
///
/// Propagates the parser's error.
pub(crate) fn index_feature_source(
    parser: &dyn FeatureParser,
    filename: &Path,
    source: &str,
) -> Result<(Vec<IndexEntry>, LanguageInfo), FeatureIndexError> {
    let document = parser.parse(source)?;
    Ok(index_feature_document(&document, filename))
}

/// Read `filename` from disk and index it.
///
/// # Errors
///
/// Returns [`FeatureIndexError::Read`] when the file cannot be read, or the
/// parser's error.
pub(crate) fn index_feature_file(
    parser: &dyn FeatureParser,
    filename: &Path,
) -> Result<(Vec<IndexEntry>, LanguageInfo), FeatureIndexError> {
    let source = std::fs::read_to_string(filename)?;
    index_feature_source(parser, filename, &source)
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests use explicit failures for clarity"
)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(source: &str) -> FeatureDocument {
        GherkinFeatureParser.parse(source).expect("valid feature")
    }

    #[test]
    fn flattens_backgrounds_scenarios_and_rules() {
        let document = parse(concat!(
            "Feature: shop\n",
            "  Background:\n",
            "    Given a clean basket\n",
            "  Scenario: add\n",
            "    When I add \"apple\"\n",
            "    Then I have <n> items\n",
            "  Rule: discounts\n",
            "    Background:\n",
            "      Given a coupon\n",
            "    Scenario: apply\n",
            "      When I apply it\n",
        ));

        let names: Vec<_> = document.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["", "add", "", "apply"]);
        let steps: Vec<_> = document
            .children
            .iter()
            .flat_map(|c| c.steps.iter().map(|s| (s.text.as_str(), s.line)))
            .collect();
        assert_eq!(
            steps,
            vec![
                ("a clean basket", 3),
                ("I add \"apple\"", 5),
                ("I have <n> items", 6),
                ("a coupon", 9),
                ("I apply it", 11),
            ]
        );
        assert_eq!(document.language, "en");
    }

    #[test]
    fn language_comes_from_the_directive() {
        let document = parse(concat!(
            "# language: ru\n",
            "Функционал: корзина\n",
            "  Сценарий: добавление\n",
            "    Когда я добавляю товар\n",
        ));
        assert_eq!(document.language, "ru");
        assert_eq!(document.children.len(), 1);
    }

    #[rstest]
    #[case("# language: fr\nFonctionnalité: panier\n  Scénario: s\n    Soit un panier vide\n", 4, "Soit ", "un panier vide")]
    #[case("# language: de\nFunktionalität: Korb\n  Szenario: s\n    Angenommen ein leerer Korb\n", 4, "Angenommen ", "ein leerer Korb")]
    #[case("Feature: f\n  Scenario: s\n    Given one\n    And two\n", 4, "And ", "two")]
    fn steps_keep_their_localised_keyword(
        #[case] source: &str,
        #[case] line: u32,
        #[case] keyword: &str,
        #[case] text: &str,
    ) {
        let document = parse(source);
        let step = document.step_at(line).expect("step on line");
        assert_eq!((step.keyword.as_str(), step.text.as_str()), (keyword, text));
        assert!(document.step_at(1).is_none());
    }

    #[test]
    fn invalid_gherkin_is_a_parse_error() {
        let result = GherkinFeatureParser.parse("this is not gherkin\n");
        assert!(matches!(result, Err(FeatureIndexError::Parse(_))));
    }

    #[rstest]
    #[case("@ExportScenarios", true)]
    #[case("exportscenarios", true)]
    #[case("@EXPORTSCENARIOS", true)]
    #[case("@Export", false)]
    fn export_tag_matching(#[case] tag: &str, #[case] expected: bool) {
        let document = FeatureDocument {
            tags: vec![Tag {
                name: tag.to_string(),
            }],
            children: Vec::new(),
            language: "en".to_string(),
        };
        assert_eq!(document.exports_scenarios(), expected);
    }

    #[test]
    fn steps_are_indexed_in_both_forms() {
        let document = parse(concat!(
            "Feature: f\n",
            "  Scenario: s\n",
            "    Given I have <n> items in 'my basket'\n",
        ));
        let (entries, language) = index_feature_document(&document, Path::new("/ws/a.feature"));

        let [entry] = entries.as_slice() else {
            panic!("expected one entry, got {entries:?}");
        };
        assert_eq!(entry.name, "I have <> items in ''");
        assert_eq!(entry.id, "i have <> items in ''");
        assert_eq!(entry.snippet, "Ihaveitemsin");
        assert_eq!(entry.description, "I have <n> items in 'my basket'");
        assert_eq!((entry.line, entry.endline), (3, 3));
        assert!(!entry.is_exported);
        assert_eq!(entry.kind, EntryKind::Step);
        assert_eq!(language.filename, Path::new("/ws/a.feature"));
        assert_eq!(language.language, "en");
    }

    #[test]
    fn exported_features_index_named_scenarios() {
        let document = parse(concat!(
            "@ExportScenarios\n",
            "Feature: library\n",
            "  Background:\n",
            "    Given setup\n",
            "  Scenario: Open the \"main\" form\n",
            "    When I open it\n",
        ));
        let (entries, _) = index_feature_document(&document, Path::new("lib.feature"));

        let exported: Vec<_> = entries.iter().filter(|e| e.is_exported).collect();
        let [scenario] = exported.as_slice() else {
            panic!("expected one exported entry, got {exported:?}");
        };
        assert_eq!(scenario.name, "Open the \"main\" form");
        assert_eq!(scenario.id, "open the \"main\" form");
        assert_eq!(scenario.snippet, "Opentheform");
        assert_eq!(scenario.kind, EntryKind::ExportedScenario);
        assert_eq!(scenario.line, 5);
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn index_feature_file_reports_missing_files() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let result = index_feature_file(&GherkinFeatureParser, &dir.path().join("absent.feature"));
        assert!(matches!(result, Err(FeatureIndexError::Read(_))));
    }
}
