//! LSP lifecycle handlers for initialization and shutdown.
//!
//! This module implements the core lifecycle protocol handlers required by
//! the LSP specification: `initialize`, `initialized`, and `shutdown`.

use async_lsp::ResponseError;
use lsp_types::{
    InitializeParams, InitializeResult, InitializedParams, ServerInfo, Url, WorkspaceFolder,
};
use tracing::{debug, info, warn};

use crate::config::IndexSettings;
use crate::error::ServerError;
use crate::server::{ServerState, build_server_capabilities};

/// Handle the `initialize` request from the client.
///
/// Stores the client capabilities and workspace folders, reads index
/// settings from the initialisation options, and returns the server's
/// capabilities. Per the LSP specification, this must be the first request
/// sent by the client.
///
/// # Errors
///
/// Returns a `ResponseError` when the server is already initialized.
///
/// Malformed initialisation options are logged as warnings and do not fail
/// the request.
pub fn handle_initialise(
    state: &mut ServerState,
    params: InitializeParams,
) -> Result<InitializeResult, ResponseError> {
    if state.is_initialised() {
        return Err(response_error(
            &ServerError::AlreadyInitialised,
            async_lsp::ErrorCode::INVALID_REQUEST,
        ));
    }

    #[expect(
        deprecated,
        reason = "Some clients still populate root_uri instead of workspace_folders."
    )]
    let InitializeParams {
        capabilities,
        workspace_folders,
        root_uri,
        initialization_options,
        ..
    } = params;
    state.client_capabilities = Some(capabilities);
    state.set_workspace_folders(initial_folders(workspace_folders, root_uri));

    if let Some(options) = initialization_options {
        match IndexSettings::from_client_value(&options) {
            Ok(settings) => {
                debug!(?settings, "index settings from initialisation options");
                state.host().set_settings(settings);
            }
            Err(e) => warn!(error = %e, "ignoring initialisation options"),
        }
    }

    Ok(InitializeResult {
        capabilities: build_server_capabilities(),
        server_info: Some(ServerInfo {
            name: "gherkin-autocomplete-lsp".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    })
}

/// Handle the `initialized` notification from the client.
///
/// Marks the server as initialised and starts indexing every workspace
/// folder in the background.
pub fn handle_initialised(state: &mut ServerState, _params: InitializedParams) {
    state.mark_initialised();
    let roots = state.workspace_roots();
    let builds = state.registry().update_all(&roots);
    info!(roots = builds.len(), "server initialised");
}

/// Handle the `shutdown` request from the client.
///
/// Per the LSP specification, the server should not exit until it receives
/// the `exit` notification.
///
/// # Errors
///
/// Currently always returns `Ok(())`.
pub fn handle_shutdown(_state: &mut ServerState) -> Result<(), ResponseError> {
    info!("shutdown request received");
    Ok(())
}

/// Workspace folders, falling back to the root URI for single-root clients.
fn initial_folders(
    workspace_folders: Option<Vec<WorkspaceFolder>>,
    root_uri: Option<Url>,
) -> Vec<WorkspaceFolder> {
    match (workspace_folders, root_uri) {
        (Some(folders), _) if !folders.is_empty() => folders,
        (_, Some(uri)) => vec![WorkspaceFolder {
            name: folder_name(&uri),
            uri,
        }],
        _ => Vec::new(),
    }
}

fn folder_name(uri: &Url) -> String {
    uri.path_segments()
        .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
        .unwrap_or_default()
        .to_string()
}

/// Convert a server error to an LSP response error.
fn response_error(err: &ServerError, code: async_lsp::ErrorCode) -> ResponseError {
    ResponseError::new(code, err.to_string())
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::host::IndexHost;
    use lsp_types::ClientCapabilities;
    use rstest::{fixture, rstest};
    use std::path::{Path, PathBuf};
    use std::str::FromStr;

    #[fixture]
    fn create_test_state() -> ServerState {
        ServerState::new(ServerConfig::default())
    }

    #[fixture]
    fn create_init_params() -> InitializeParams {
        InitializeParams {
            capabilities: ClientCapabilities::default(),
            workspace_folders: None,
            ..Default::default()
        }
    }

    fn folder(path: &str) -> WorkspaceFolder {
        WorkspaceFolder {
            uri: Url::from_file_path(path).expect("valid path"),
            name: "folder".to_string(),
        }
    }

    #[rstest]
    fn handle_initialise_stores_client_capabilities(
        mut create_test_state: ServerState,
        create_init_params: InitializeParams,
    ) {
        let result = handle_initialise(&mut create_test_state, create_init_params);

        assert!(result.is_ok());
        assert!(create_test_state.client_capabilities.is_some());
    }

    #[rstest]
    fn handle_initialise_returns_server_info(
        mut create_test_state: ServerState,
        create_init_params: InitializeParams,
    ) {
        let result = handle_initialise(&mut create_test_state, create_init_params);
        let init_result = result.expect("initialization should succeed");

        let info = init_result.server_info.expect("should have server info");
        assert_eq!(info.name, "gherkin-autocomplete-lsp");
        assert!(info.version.is_some());
        assert!(init_result.capabilities.completion_provider.is_some());
    }

    #[rstest]
    fn handle_initialise_fails_when_already_initialised(
        mut create_test_state: ServerState,
        create_init_params: InitializeParams,
    ) {
        create_test_state.mark_initialised();

        let result = handle_initialise(&mut create_test_state, create_init_params);

        assert!(result.is_err());
    }

    #[rstest]
    fn handle_initialise_reads_nested_settings(mut create_test_state: ServerState) {
        let params = InitializeParams {
            initialization_options: Some(serde_json::json!({
                "gherkin-autocomplete": {
                    "featuresPath": "spec/features",
                    "srcBslPath": ["src"],
                }
            })),
            ..Default::default()
        };

        handle_initialise(&mut create_test_state, params).expect("initialise");

        let settings = create_test_state.host().current_settings();
        assert_eq!(settings.features_path(), "spec/features");
        assert_eq!(settings.src_bsl_paths, vec!["src".to_string()]);
    }

    #[rstest]
    fn handle_initialise_ignores_malformed_settings(mut create_test_state: ServerState) {
        let params = InitializeParams {
            initialization_options: Some(serde_json::json!({ "srcBslPath": 3 })),
            ..Default::default()
        };

        assert!(handle_initialise(&mut create_test_state, params).is_ok());
        assert_eq!(
            create_test_state.host().current_settings(),
            IndexSettings::default()
        );
    }

    #[rstest]
    fn handle_initialise_falls_back_to_root_uri(mut create_test_state: ServerState) {
        #[expect(deprecated, reason = "exercising single-root clients")]
        let params = InitializeParams {
            root_uri: Some(Url::from_file_path("/projects/shop").expect("valid path")),
            ..Default::default()
        };

        handle_initialise(&mut create_test_state, params).expect("initialise");

        assert_eq!(
            create_test_state.workspace_roots(),
            vec![PathBuf::from("/projects/shop")]
        );
        let folder = create_test_state
            .workspace_folders()
            .first()
            .expect("folder from root URI");
        assert_eq!(folder.name, "shop");
        assert_eq!(
            create_test_state
                .host()
                .workspace_root(Path::new("/projects/shop/features/a.feature")),
            Some(PathBuf::from("/projects/shop"))
        );
    }

    #[rstest]
    fn handle_initialised_marks_state_and_builds_roots(mut create_test_state: ServerState) {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = dir.path().to_path_buf();
        create_test_state.set_workspace_folders(vec![WorkspaceFolder {
            uri: Url::from_file_path(&root).expect("valid path"),
            name: "tmp".to_string(),
        }]);

        handle_initialised(&mut create_test_state, InitializedParams {});

        assert!(create_test_state.is_initialised());
        assert!(create_test_state.registry().block_until_ready(&root));
    }

    #[rstest]
    fn handle_shutdown_returns_ok(mut create_test_state: ServerState) {
        let result = handle_shutdown(&mut create_test_state);

        assert!(result.is_ok());
    }

    #[test]
    fn initial_folders_prefers_workspace_folders() {
        let folders = initial_folders(
            Some(vec![folder("/a")]),
            Some(Url::from_file_path("/b").expect("valid path")),
        );
        assert_eq!(folders, vec![folder("/a")]);
    }

    #[test]
    fn initial_folders_uses_root_uri_when_folders_are_empty() {
        let folders = initial_folders(
            Some(Vec::new()),
            Some(Url::from_file_path("/b").expect("valid path")),
        );
        assert_eq!(folders.len(), 1);
    }

    #[test]
    fn initial_folders_is_empty_without_any_root() {
        assert!(initial_folders(None, None).is_empty());
    }

    #[test]
    fn folder_name_ignores_non_path_urls() {
        let url = Url::from_str("https://example.com/").expect("valid URL");
        assert_eq!(folder_name(&url), "");
    }
}
