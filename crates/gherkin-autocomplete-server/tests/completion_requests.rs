//! Behavioural tests for `textDocument/completion` driven through the
//! notification handlers.
//!
//! These tests run without a Tokio runtime, so index builds run on their own
//! threads and each test waits for the root before asking for completions.

mod support;

use gherkin_autocomplete_server::config::IndexSettings;
use gherkin_autocomplete_server::handlers::{
    handle_completion, handle_did_change_configuration, handle_did_open_text_document,
    handle_did_save_text_document, handle_initialised,
};
use gherkin_autocomplete_server::server::ServerState;
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionParams, CompletionResponse,
    DidChangeConfigurationParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    InitializedParams, PartialResultParams, Position, TextDocumentIdentifier, TextDocumentItem,
    TextDocumentPositionParams, Url, WorkDoneProgressParams,
};
use rstest::{fixture, rstest};
use support::{TestWorkspace, basket_workspace};

const DRAFT: &str = concat!(
    "Feature: Draft\n",
    "  Scenario: Fill the basket\n",
    "    Given I have\n",
);

struct Session {
    workspace: TestWorkspace,
    state: ServerState,
}

impl Session {
    fn open(&mut self, relative: &str, text: &str) {
        handle_did_open_text_document(
            &mut self.state,
            DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: self.workspace.uri(relative),
                    language_id: "gherkin".to_string(),
                    version: 1,
                    text: text.to_string(),
                },
            },
        );
    }

    fn save(&mut self, relative: &str, text: Option<&str>) {
        handle_did_save_text_document(
            &mut self.state,
            DidSaveTextDocumentParams {
                text_document: TextDocumentIdentifier {
                    uri: self.workspace.uri(relative),
                },
                text: text.map(str::to_string),
            },
        );
    }

    fn wait_for_index(&self) {
        assert!(
            self.state.registry().block_until_ready(self.workspace.root()),
            "workspace root was never built"
        );
    }

    fn complete_uri(&mut self, uri: Url, line: u32, character: u32) -> Option<Vec<CompletionItem>> {
        let params = CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position: Position::new(line, character),
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        };
        let response = handle_completion(&mut self.state, params).ok()??;
        match response {
            CompletionResponse::Array(items) => Some(items),
            CompletionResponse::List(list) => Some(list.items),
        }
    }

    fn complete(&mut self, relative: &str, line: u32, character: u32) -> Vec<CompletionItem> {
        let uri = self.workspace.uri(relative);
        self.complete_uri(uri, line, character).unwrap_or_default()
    }
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|item| item.label.as_str()).collect()
}

#[fixture]
fn session() -> Session {
    let workspace = basket_workspace().build();
    let mut state = workspace.server_state();
    handle_initialised(&mut state, InitializedParams {});
    let session = Session { workspace, state };
    session.wait_for_index();
    session
}

#[rstest]
fn initialised_server_completes_indexed_steps(mut session: Session) {
    session.open("features/draft.feature", DRAFT);

    let items = session.complete("features/draft.feature", 2, 16);

    assert_eq!(labels(&items), vec!["I have 3 items in my basket"]);
    assert_eq!(
        items.first().and_then(|item| item.kind),
        Some(CompletionItemKind::MODULE)
    );
}

#[rstest]
fn completion_reads_unopened_files_from_disk(mut session: Session) {
    session.workspace.write("features/draft.feature", DRAFT);

    let items = session.complete("features/draft.feature", 2, 16);

    assert_eq!(labels(&items), vec!["I have 3 items in my basket"]);
}

#[rstest]
fn unsaved_steps_of_the_open_document_are_offered(mut session: Session) {
    session.open(
        "features/draft.feature",
        concat!(
            "Feature: Draft\n",
            "  Scenario: Review\n",
            "    Given the order total is \"10\" pounds\n",
            "    Then the ord\n",
        ),
    );

    let items = session.complete("features/draft.feature", 3, 16);

    let local: Vec<_> = items
        .iter()
        .filter(|item| item.kind == Some(CompletionItemKind::FUNCTION))
        .collect();
    let [item] = local.as_slice() else {
        panic!("expected one local item, got {items:?}");
    };
    assert_eq!(item.label, "der total is \"\" pounds");
    assert_eq!(
        item.filter_text.as_deref(),
        Some("the order total is \"\" pounds")
    );
}

#[rstest]
fn exported_scenarios_are_offered_first(mut session: Session) {
    session.open(
        "features/draft.feature",
        "Feature: Draft\n  Scenario: s\n    Given I log in as admin\n",
    );

    let items = session.complete("features/draft.feature", 2, 27);

    let first = items.first().map(|item| (item.label.as_str(), item.kind));
    assert_eq!(
        first,
        Some(("I log in as admin", Some(CompletionItemKind::INTERFACE)))
    );
}

#[rstest]
fn saving_a_feature_refreshes_its_steps(mut session: Session) {
    let edited = concat!(
        "Feature: Basket\n",
        "  Scenario: Adding items\n",
        "    Given I have a voucher for 5 pounds\n",
    );
    session.save("features/basket.feature", Some(edited));
    session.open("features/draft.feature", DRAFT);

    let items = session.complete("features/draft.feature", 2, 16);

    assert_eq!(labels(&items), vec!["I have a voucher for 5 pounds"]);
}

#[rstest]
fn configuration_change_moves_the_features_path(mut session: Session) {
    session.workspace.write(
        "specs/stock.feature",
        "Feature: Stock\n  Scenario: s\n    Given I have no stock left\n",
    );
    let settings = serde_json::json!({
        "gherkin-autocomplete": { "featuresPath": "specs" }
    });
    handle_did_change_configuration(
        &mut session.state,
        DidChangeConfigurationParams { settings },
    );
    session.wait_for_index();
    session.open("features/draft.feature", DRAFT);

    let items = session.complete("features/draft.feature", 2, 16);

    assert_eq!(labels(&items), vec!["I have no stock left"]);
    assert_eq!(
        session.state.host().current_settings(),
        IndexSettings {
            features_path: Some("specs".to_string()),
            ..IndexSettings::default()
        }
    );
}

#[expect(clippy::expect_used, reason = "behavioural tests use explicit panics")]
#[rstest]
fn non_file_uris_get_no_response(mut session: Session) {
    let uri = Url::parse("untitled:Untitled-1").expect("untitled URI");

    assert!(session.complete_uri(uri, 0, 0).is_none());
}
