//! Step completion.
//!
//! The line under the cursor is split into its step keyword and text. The
//! keyword comes from the parsed document when it parses, which covers every
//! Gherkin language, and from the document language's keyword table
//! otherwise. The text typed so far is then looked up in
//! three passes, in this order, keeping the first item for every entry id:
//!
//! 1. exported scenarios from `@ExportScenarios` features;
//! 2. steps already written in the (possibly unsaved) document itself;
//! 3. steps indexed from every feature in the workspace root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_lsp::ResponseError;
use gherkin_snippets::{
    DEFAULT_LANGUAGE, StepLine, language_directive, split_step_line, split_with_keyword,
    unmatched_suffix,
};
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionParams, CompletionResponse, CompletionTextEdit,
    Documentation, Position, Range, TextEdit,
};
use tracing::debug;

use crate::indexing::{IndexEntry, IndexRegistry, MatchMode};
use crate::server::ServerState;
use crate::util::{byte_to_utf16_col, line_at, utf16_col_to_byte};

const EXPORTED_SORT: &str = "3";
const STEP_SORT: &str = "0";

/// Handle the `textDocument/completion` request.
///
/// Uses the cached text of open documents and falls back to the file on
/// disk. Non-file URIs get no completions.
///
/// # Errors
///
/// Currently always succeeds.
pub fn handle_completion(
    state: &mut ServerState,
    params: CompletionParams,
) -> Result<Option<CompletionResponse>, ResponseError> {
    let position = params.text_document_position;
    let Ok(path) = position.text_document.uri.to_file_path() else {
        return Ok(None);
    };
    let text = match state.document(&path) {
        Some(text) => text.to_owned(),
        None => match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no text for completion");
                return Ok(None);
            }
        },
    };

    let items = completion_items(state.registry(), &path, &text, position.position);
    Ok(Some(CompletionResponse::Array(items)))
}

/// Compute completion items for `position` in the document at `path`.
#[must_use]
pub fn completion_items(
    registry: &IndexRegistry,
    path: &Path,
    text: &str,
    position: Position,
) -> Vec<CompletionItem> {
    let language = document_language(registry, path, text);
    let Some(line) = line_at(text, position.line) else {
        return Vec::new();
    };
    let current_line = position.line.saturating_add(1);
    let Some(step) = step_line(registry, text, line, current_line, &language) else {
        debug!(line, language, "not a step line");
        return Vec::new();
    };
    let cursor = utf16_col_to_byte(line, position.character);
    let Some(typed) = line.get(step.text_start()..cursor) else {
        return Vec::new();
    };
    let range = Range::new(
        Position::new(position.line, byte_to_utf16_col(line, step.text_start())),
        position,
    );
    debug!(typed, language, "step completion");

    let context = ItemContext {
        range,
        root: registry.host().workspace_root(path),
    };
    let mut added = HashSet::new();
    let mut items = Vec::new();

    for entry in registry.query_exported_snippet(path, typed, MatchMode::default()) {
        if added.insert(entry.id.clone()) {
            let label = entry.name.clone();
            items.push(context.item(&entry, label, CompletionItemKind::INTERFACE, EXPORTED_SORT));
        }
    }

    for entry in registry.local_entries(path, typed, text, MatchMode::default()) {
        if entry.name == step.text || entry.line == current_line || added.contains(&entry.id) {
            continue;
        }
        let label = match unmatched_suffix(typed, &entry.name) {
            "" => entry.name.clone(),
            suffix => suffix.to_owned(),
        };
        added.insert(entry.id.clone());
        items.push(context.item(&entry, label, CompletionItemKind::FUNCTION, STEP_SORT));
    }

    for entry in registry.query_snippet(path, typed) {
        if added.insert(entry.id.clone()) {
            let label = entry.name.clone();
            items.push(context.item(&entry, label, CompletionItemKind::MODULE, STEP_SORT));
        }
    }

    items
}

/// Split `line` (the 1-based `line_number` of `text`) at its step keyword.
fn step_line<'a>(
    registry: &IndexRegistry,
    text: &str,
    line: &'a str,
    line_number: u32,
    language: &str,
) -> Option<StepLine<'a>> {
    let parsed = registry.parse_document(text).ok().and_then(|document| {
        let keyword = document.step_at(line_number)?.keyword.clone();
        split_with_keyword(line, &keyword)
    });
    parsed.or_else(|| split_step_line(line, language))
}

/// Language of the document: its own directive, then the index, then `en`.
fn document_language(registry: &IndexRegistry, path: &Path, text: &str) -> String {
    if let Some(language) = language_directive(text) {
        return language.to_owned();
    }
    registry
        .language_info(path)
        .map_or_else(|| DEFAULT_LANGUAGE.to_owned(), |info| info.language)
}

struct ItemContext {
    range: Range,
    root: Option<PathBuf>,
}

impl ItemContext {
    fn item(
        &self,
        entry: &IndexEntry,
        label: String,
        kind: CompletionItemKind,
        sort_text: &str,
    ) -> CompletionItem {
        CompletionItem {
            label,
            kind: Some(kind),
            documentation: Some(Documentation::String(self.documentation(&entry.filename))),
            sort_text: Some(sort_text.to_owned()),
            filter_text: Some(entry.name.clone()),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit::new(
                self.range,
                entry.name.clone(),
            ))),
            ..CompletionItem::default()
        }
    }

    fn documentation(&self, filename: &Path) -> String {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| filename.strip_prefix(root).ok())
            .unwrap_or(filename);
        format!("Feature: {}", relative.display())
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::host::StaticHost;
    use rstest::{fixture, rstest};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        registry: IndexRegistry,
    }

    impl Fixture {
        fn feature(&self) -> PathBuf {
            self.dir.path().join("features/current.feature")
        }
    }

    #[fixture]
    fn indexed() -> Fixture {
        let dir = TempDir::new().expect("temp dir");
        let features = dir.path().join("features");
        std::fs::create_dir_all(&features).expect("features dir");
        std::fs::write(
            features.join("library.feature"),
            concat!(
                "@ExportScenarios\n",
                "Feature: library\n",
                "  Scenario: I log in as \"admin\"\n",
                "    Given I open the login form\n",
            ),
        )
        .expect("write library");
        std::fs::write(
            features.join("basket.feature"),
            concat!(
                "Feature: basket\n",
                "  Scenario: add\n",
                "    Given I have <n> items in my basket\n",
                "    When I add \"apple\" to the basket\n",
            ),
        )
        .expect("write basket");
        let registry = IndexRegistry::new(Arc::new(StaticHost::new(
            dir.path(),
            IndexSettings::default(),
        )));
        registry.build_blocking(dir.path());
        Fixture { dir, registry }
    }

    fn complete(fixture: &Fixture, text: &str, line: u32, character: u32) -> Vec<CompletionItem> {
        completion_items(
            &fixture.registry,
            &fixture.feature(),
            text,
            Position::new(line, character),
        )
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|item| item.label.as_str()).collect()
    }

    #[rstest]
    fn indexed_steps_complete_the_typed_prefix(indexed: Fixture) {
        let text = "Feature: current\n  Scenario: s\n    Given I have\n";
        let items = complete(&indexed, text, 2, 16);

        let [item] = items.as_slice() else {
            panic!("expected one item, got {items:?}");
        };
        assert_eq!(item.label, "I have <> items in my basket");
        assert_eq!(item.kind, Some(CompletionItemKind::MODULE));
        assert_eq!(item.sort_text.as_deref(), Some("0"));
        assert_eq!(
            item.documentation,
            Some(Documentation::String(
                "Feature: features/basket.feature".to_string()
            ))
        );
        let Some(CompletionTextEdit::Edit(edit)) = item.text_edit.as_ref() else {
            panic!("expected a plain text edit");
        };
        assert_eq!(edit.range, Range::new(Position::new(2, 10), Position::new(2, 16)));
        assert_eq!(edit.new_text, "I have <> items in my basket");
    }

    #[rstest]
    fn exported_scenarios_come_first(indexed: Fixture) {
        let text = "Feature: current\n  Scenario: s\n    When I log in as \"bob\"\n";
        let items = complete(&indexed, text, 2, 26);

        let first = items.first().expect("an item");
        assert_eq!(first.label, "I log in as \"admin\"");
        assert_eq!(first.kind, Some(CompletionItemKind::INTERFACE));
        assert_eq!(first.sort_text.as_deref(), Some("3"));
    }

    #[rstest]
    fn exported_scenarios_need_their_whole_name(indexed: Fixture) {
        let text = "Feature: current\n  Scenario: s\n    When I log\n";
        let items = complete(&indexed, text, 2, 14);

        assert!(
            items
                .iter()
                .all(|item| item.kind != Some(CompletionItemKind::INTERFACE)),
            "{items:?}"
        );
    }

    #[rstest]
    fn keywords_of_any_parsed_language_are_recognised(indexed: Fixture) {
        let text = concat!(
            "# language: fr\n",
            "Fonctionnalité: courant\n",
            "  Scénario: s\n",
            "    Soit I have\n",
        );
        let items = complete(&indexed, text, 3, 15);

        assert_eq!(labels(&items), vec!["I have <> items in my basket"]);
        let Some(CompletionTextEdit::Edit(edit)) =
            items.first().and_then(|item| item.text_edit.as_ref())
        else {
            panic!("expected a plain text edit");
        };
        assert_eq!(edit.range.start, Position::new(3, 9));
    }

    #[rstest]
    fn local_steps_are_labelled_by_their_unmatched_suffix(indexed: Fixture) {
        let text = concat!(
            "Feature: current\n",
            "  Scenario: s\n",
            "    Given the draft \"x\" is saved\n",
            "    And the dra\n",
        );
        let items = complete(&indexed, text, 3, 15);

        let local: Vec<_> = items
            .iter()
            .filter(|item| item.kind == Some(CompletionItemKind::FUNCTION))
            .collect();
        let [item] = local.as_slice() else {
            panic!("expected one local item, got {items:?}");
        };
        // The alignment stops on the last typed char, so it leads the label.
        assert_eq!(item.label, "aft \"\" is saved");
        assert_eq!(item.filter_text.as_deref(), Some("the draft \"\" is saved"));
    }

    #[rstest]
    fn results_are_deduplicated_by_id(indexed: Fixture) {
        let text = concat!(
            "Feature: current\n",
            "  Scenario: s\n",
            "    Given I have <count> items in my basket\n",
            "    And I have\n",
        );
        let items = complete(&indexed, text, 3, 14);

        assert_eq!(labels(&items), vec!["e <> items in my basket"]);
        assert_eq!(
            items.first().and_then(|item| item.kind),
            Some(CompletionItemKind::FUNCTION)
        );
    }

    #[rstest]
    #[case::not_a_step("Feature: current\n  Scenario: s\n", 1, 5)]
    #[case::cursor_in_keyword("Feature: current\n  Scenario: s\n    Given I\n", 2, 6)]
    #[case::line_out_of_range("Feature: current\n", 7, 0)]
    fn non_step_positions_yield_nothing(
        indexed: Fixture,
        #[case] text: &str,
        #[case] line: u32,
        #[case] character: u32,
    ) {
        assert!(complete(&indexed, text, line, character).is_empty());
    }

    #[rstest]
    fn russian_documents_use_russian_keywords(indexed: Fixture) {
        let text = concat!(
            "# language: ru\n",
            "Функционал: текущий\n",
            "  Сценарий: с\n",
            "    Дано I have\n",
        );
        let items = complete(&indexed, text, 3, 15);
        assert_eq!(labels(&items), vec!["I have <> items in my basket"]);
        let Some(CompletionTextEdit::Edit(edit)) =
            items.first().and_then(|item| item.text_edit.as_ref())
        else {
            panic!("expected a plain text edit");
        };
        assert_eq!(edit.range.start, Position::new(3, 9));
    }

    #[rstest]
    fn documentation_falls_back_to_the_full_path(indexed: Fixture) {
        let context = ItemContext {
            range: Range::default(),
            root: None,
        };
        let path = indexed.dir.path().join("features/basket.feature");
        assert_eq!(
            context.documentation(&path),
            format!("Feature: {}", path.display())
        );
    }
}
