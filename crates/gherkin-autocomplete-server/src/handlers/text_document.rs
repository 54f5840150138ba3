//! Text document notification handlers.
//!
//! Open documents are cached so completion can see unsaved text. Saving a
//! feature file re-indexes just that file once its root is ready; saving a
//! script module rebuilds the whole root, since module registrations can
//! affect any step.

use std::path::Path;

use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, Url,
};
use tracing::debug;

use crate::discovery::has_extension;
use crate::host::IndexHost;
use crate::indexing::ScriptDialect;
use crate::server::ServerState;

fn file_path(uri: &Url, method: &str) -> Option<std::path::PathBuf> {
    let path = uri.to_file_path().ok();
    if path.is_none() {
        debug!(%uri, method, "ignoring notification for non-file URI");
    }
    path
}

fn is_feature_file_path(path: &Path) -> bool {
    has_extension(path, "feature")
}

fn is_module_file_path(path: &Path) -> bool {
    [ScriptDialect::Bsl, ScriptDialect::OneScript]
        .iter()
        .any(|dialect| has_extension(path, dialect.extension()))
}

/// Handle `textDocument/didOpen` notifications.
///
/// Caches the document text and, for feature files, makes sure the owning
/// root's index exists.
pub fn handle_did_open_text_document(state: &mut ServerState, params: DidOpenTextDocumentParams) {
    let Some(path) = file_path(&params.text_document.uri, "didOpen") else {
        return;
    };
    if is_feature_file_path(&path) {
        state.registry().ensure_built(&path);
    }
    state.set_document(path, params.text_document.text);
}

/// Handle `textDocument/didChange` notifications.
///
/// The server asks for full synchronisation, so the last change carries the
/// whole document.
pub fn handle_did_change_text_document(
    state: &mut ServerState,
    params: DidChangeTextDocumentParams,
) {
    let Some(path) = file_path(&params.text_document.uri, "didChange") else {
        return;
    };
    if let Some(change) = params.content_changes.into_iter().last() {
        state.set_document(path, change.text);
    }
}

/// Handle `textDocument/didClose` notifications.
pub fn handle_did_close_text_document(
    state: &mut ServerState,
    params: DidCloseTextDocumentParams,
) {
    if let Some(path) = file_path(&params.text_document.uri, "didClose") {
        state.remove_document(&path);
    }
}

/// Handle `textDocument/didSave` notifications.
///
/// A saved feature file is re-indexed on its own when its root is ready, or
/// triggers the root's first build otherwise. A saved `.bsl` or `.os` module
/// rebuilds its root.
pub fn handle_did_save_text_document(state: &mut ServerState, params: DidSaveTextDocumentParams) {
    let Some(path) = file_path(&params.text_document.uri, "didSave") else {
        return;
    };
    if let Some(text) = params.text.as_ref() {
        state.set_document(path.clone(), text.clone());
    }
    let Some(root) = state.host().workspace_root(&path) else {
        debug!(path = %path.display(), "saved file is outside every workspace folder");
        return;
    };

    if is_feature_file_path(&path) {
        if state.registry().is_ready(&root) {
            state
                .registry()
                .update_single_document(&path, params.text.as_deref());
        } else {
            state.registry().ensure_built(&path);
        }
    } else if is_module_file_path(&path) {
        debug!(path = %path.display(), root = %root.display(), "module saved, rebuilding root");
        drop(state.registry().build(&root));
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::indexing::MatchMode;
    use lsp_types::{
        TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentItem,
        VersionedTextDocumentIdentifier, WorkspaceFolder,
    };
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Workspace {
        dir: TempDir,
        state: ServerState,
    }

    impl Workspace {
        fn path(&self, relative: &str) -> std::path::PathBuf {
            self.dir.path().join(relative)
        }

        fn uri(&self, relative: &str) -> Url {
            Url::from_file_path(self.path(relative)).expect("file URI")
        }
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(dir.path().join("features")).expect("features dir");
        std::fs::write(
            dir.path().join("features/a.feature"),
            "Feature: a\n  Scenario: s\n    Given the old step\n",
        )
        .expect("write feature");
        let mut state = ServerState::new(ServerConfig::default());
        state.set_workspace_folders(vec![WorkspaceFolder {
            uri: Url::from_file_path(dir.path()).expect("file URI"),
            name: "ws".to_string(),
        }]);
        Workspace { dir, state }
    }

    fn names(state: &ServerState, file: &Path, prefix: &str) -> Vec<String> {
        state
            .registry()
            .query(file, prefix, MatchMode::default())
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }

    #[rstest]
    fn open_change_close_maintain_the_document_cache(mut workspace: Workspace) {
        let uri = workspace.uri("features/a.feature");
        let path = workspace.path("features/a.feature");

        handle_did_open_text_document(
            &mut workspace.state,
            DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.clone(),
                    language_id: "feature".to_string(),
                    version: 1,
                    text: "Feature: a\n".to_string(),
                },
            },
        );
        assert_eq!(workspace.state.document(&path), Some("Feature: a\n"));
        assert!(workspace.state.registry().block_until_ready(workspace.dir.path()));

        handle_did_change_text_document(
            &mut workspace.state,
            DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: uri.clone(),
                    version: 2,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: "Feature: b\n".to_string(),
                }],
            },
        );
        assert_eq!(workspace.state.document(&path), Some("Feature: b\n"));

        handle_did_close_text_document(
            &mut workspace.state,
            DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri },
            },
        );
        assert!(workspace.state.document(&path).is_none());
    }

    #[rstest]
    fn saving_a_feature_in_a_ready_root_replaces_its_steps(mut workspace: Workspace) {
        let uri = workspace.uri("features/a.feature");
        let path = workspace.path("features/a.feature");
        workspace.state.registry().build_blocking(workspace.dir.path());
        assert_eq!(names(&workspace.state, &path, "the"), vec!["the old step"]);

        let new_text = "Feature: a\n  Scenario: s\n    Given the new step\n";
        handle_did_save_text_document(
            &mut workspace.state,
            DidSaveTextDocumentParams {
                text_document: TextDocumentIdentifier { uri },
                text: Some(new_text.to_string()),
            },
        );

        assert_eq!(names(&workspace.state, &path, "the"), vec!["the new step"]);
        assert_eq!(workspace.state.document(&path), Some(new_text));
    }

    #[rstest]
    fn saving_a_feature_in_an_unbuilt_root_starts_the_build(mut workspace: Workspace) {
        let uri = workspace.uri("features/a.feature");
        assert!(!workspace.state.registry().is_ready(workspace.dir.path()));

        handle_did_save_text_document(
            &mut workspace.state,
            DidSaveTextDocumentParams {
                text_document: TextDocumentIdentifier { uri },
                text: None,
            },
        );

        assert!(workspace.state.registry().block_until_ready(workspace.dir.path()));
    }

    #[rstest]
    fn saving_a_module_rebuilds_the_root(mut workspace: Workspace) {
        let uri = workspace.uri("features/steps.os");
        let path = workspace.path("features/a.feature");
        workspace.state.registry().build_blocking(workspace.dir.path());
        std::fs::write(
            &path,
            "Feature: a\n  Scenario: s\n    Given the rebuilt step\n",
        )
        .expect("rewrite feature");

        handle_did_save_text_document(
            &mut workspace.state,
            DidSaveTextDocumentParams {
                text_document: TextDocumentIdentifier { uri },
                text: None,
            },
        );
        assert!(workspace.state.registry().block_until_ready(workspace.dir.path()));

        assert_eq!(names(&workspace.state, &path, "the"), vec!["the rebuilt step"]);
    }

    #[rstest]
    #[case("a.feature", true, false)]
    #[case("A.FEATURE", true, false)]
    #[case("steps.bsl", false, true)]
    #[case("steps.os", false, true)]
    #[case("lib.rs", false, false)]
    fn file_kinds(#[case] path: &str, #[case] feature: bool, #[case] module: bool) {
        assert_eq!(is_feature_file_path(Path::new(path)), feature);
        assert_eq!(is_module_file_path(Path::new(path)), module);
    }
}
