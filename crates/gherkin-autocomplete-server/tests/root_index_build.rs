//! Behavioural tests for building and updating a workspace root index.

mod support;

use std::path::Path;

use gherkin_autocomplete_server::indexing::{EntryKind, IndexRegistry, MatchMode};
use rstest::rstest;
use support::{BASKET_FEATURE, basket_workspace};

#[test]
fn build_collects_steps_exported_scenarios_and_module_snippets() {
    let workspace = basket_workspace().build();
    let report = workspace.index();

    assert_eq!(report.features, 2);
    assert_eq!(report.modules, 1);
    assert_eq!(report.failures, 0);
    assert_eq!(report.steps, 6);
    assert_eq!(report.snippets, 1);
    assert!(!report.superseded);
    assert!(workspace.registry.is_ready(workspace.root()));
}

type RegistryQuery = fn(&IndexRegistry, &Path) -> usize;

#[rstest]
#[case::by_name(|registry: &IndexRegistry, file: &Path| {
    registry.query(file, "I have 3 items in my basket", MatchMode::default()).len()
})]
#[case::by_any_word(|registry: &IndexRegistry, file: &Path| registry.query_any(file, "basket").len())]
#[case::by_snippet(|registry: &IndexRegistry, file: &Path| registry.query_snippet(file, "I have").len())]
#[case::exported(|registry: &IndexRegistry, file: &Path| {
    registry
        .query_exported_snippet(file, "I log in as admin", MatchMode::default())
        .len()
})]
#[case::module(|registry: &IndexRegistry, file: &Path| {
    registry.query_module_snippets(file, "открываю").len()
})]
fn first_query_on_an_unbuilt_root_finds_nothing(#[case] run: RegistryQuery) {
    let workspace = basket_workspace().build();
    let file = workspace.path("features/basket.feature");

    assert_eq!(run(&workspace.registry, &file), 0);
    // The query started the build in the background.
    assert!(workspace.registry.block_until_ready(workspace.root()));
    assert!(run(&workspace.registry, &file) > 0);
}

#[test]
fn unbuilt_root_reports_the_default_language() {
    let workspace = basket_workspace().build();
    let file = workspace.path("features/basket.feature");

    let language = workspace.registry.language_info(&file);

    assert_eq!(language.map(|info| info.language), Some("en".to_string()));
    assert!(workspace.registry.block_until_ready(workspace.root()));
}

#[expect(clippy::expect_used, reason = "behavioural tests use explicit panics")]
#[test]
fn snippet_query_finds_steps_by_words_in_order() {
    let workspace = basket_workspace().build_indexed();
    let file = workspace.path("features/basket.feature");

    let found = workspace.registry.query_snippet(&file, "I have");
    let entry = found.first().expect("matching step");
    assert_eq!(entry.name, "I have 3 items in my basket");
    assert_eq!(entry.kind, EntryKind::Step);
    assert_eq!(entry.line, 3);

    let fuzzy = workspace.registry.query_snippet(&file, "holds items");
    assert_eq!(fuzzy.len(), 1);
    assert!(workspace.registry.query_snippet(&file, "items holds").is_empty());
}

#[rstest]
#[case("I log in as admin", 1)]
#[case("i LOG in as Admin", 1)]
#[case("I log in", 0)]
#[case("I log in as admin now", 0)]
fn exported_scenarios_match_their_whole_name(#[case] typed: &str, #[case] expected: usize) {
    let workspace = basket_workspace().build_indexed();
    let file = workspace.path("features/basket.feature");

    let found = workspace
        .registry
        .query_exported_snippet(&file, typed, MatchMode::default());
    assert_eq!(found.len(), expected);
    assert!(found.iter().all(|entry| entry.kind == EntryKind::ExportedScenario));
}

#[test]
fn exported_scenarios_are_not_snippet_matches() {
    let workspace = basket_workspace().build_indexed();
    let file = workspace.path("features/basket.feature");

    let found = workspace.registry.query_snippet(&file, "I log in as admin");
    assert!(found.iter().all(|entry| !entry.is_exported));
}

#[expect(clippy::expect_used, reason = "behavioural tests use explicit panics")]
#[test]
fn module_snippets_come_from_registered_exported_methods() {
    let workspace = basket_workspace().build_indexed();
    let file = workspace.path("features/basket.feature");

    let found = workspace.registry.query_module_snippets(&file, "открываю");
    let method = found.first().expect("registered step method");
    assert_eq!(found.len(), 1);
    assert_eq!(method.name, "ЯОткрываюФорму");
    assert!(method.is_procedure);
    assert!(method.description.contains("Открывает форму"));
}

#[test]
fn updating_a_document_replaces_its_entries() {
    let workspace = basket_workspace().build_indexed();
    let file = workspace.path("features/basket.feature");
    let first = BASKET_FEATURE.replace("holds", "contains");
    let second = BASKET_FEATURE.replace("holds", "weighs");

    workspace.registry.update_single_document(&file, Some(&first));
    assert!(workspace.registry.query_snippet(&file, "holds").is_empty());
    assert_eq!(workspace.registry.query_snippet(&file, "contains").len(), 1);

    workspace.registry.update_single_document(&file, Some(&second));
    assert!(workspace.registry.query_snippet(&file, "contains").is_empty());
    assert_eq!(workspace.registry.query_snippet(&file, "weighs").len(), 1);
    assert_eq!(workspace.registry.query_snippet(&file, "I have").len(), 1);
}

#[test]
fn updating_with_unparseable_text_drops_the_document() {
    let workspace = basket_workspace().build_indexed();
    let file = workspace.path("features/basket.feature");

    workspace
        .registry
        .update_single_document(&file, Some("not gherkin at all\n"));

    assert!(workspace.registry.query_snippet(&file, "I have").is_empty());
    assert_eq!(workspace.registry.language_info(&file), None);
}

#[test]
fn updating_from_disk_reads_the_saved_file() {
    let workspace = basket_workspace().build_indexed();
    let file = workspace.path("features/basket.feature");
    workspace.write(
        "features/basket.feature",
        "Feature: Basket\n  Scenario: Empty\n    Given an empty basket\n",
    );

    workspace.registry.update_single_document(&file, None);

    assert!(workspace.registry.query_snippet(&file, "I have").is_empty());
    assert_eq!(workspace.registry.query_snippet(&file, "empty basket").len(), 1);
}

#[test]
fn rebuild_picks_up_new_files() {
    let workspace = basket_workspace().build_indexed();
    let file = workspace.path("features/basket.feature");
    workspace.write(
        "features/checkout.feature",
        "Feature: Checkout\n  Scenario: Pay\n    When I pay by card\n",
    );

    assert!(workspace.registry.query_snippet(&file, "pay by card").is_empty());
    let report = workspace.index();

    assert_eq!(report.features, 3);
    assert_eq!(workspace.registry.query_snippet(&file, "pay by card").len(), 1);
}

#[tokio::test]
async fn ensure_built_starts_a_background_build() {
    let workspace = basket_workspace().build();
    let file = workspace.path("features/basket.feature");

    assert!(!workspace.registry.ensure_built(&file));
    assert!(workspace.registry.wait_until_ready(workspace.root()).await);
    assert!(workspace.registry.ensure_built(&file));
    assert_eq!(workspace.registry.query_snippet(&file, "I have").len(), 1);
}
