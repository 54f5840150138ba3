//! Workspace notification handlers.

use lsp_types::DidChangeConfigurationParams;
use tracing::{info, warn};

use crate::config::IndexSettings;
use crate::server::ServerState;

/// Handle `workspace/didChangeConfiguration` notifications.
///
/// New settings replace the current ones and every workspace folder is
/// re-indexed. A `null` payload re-indexes with the current settings.
/// Settings that fail to parse are logged and ignored.
pub fn handle_did_change_configuration(
    state: &mut ServerState,
    params: DidChangeConfigurationParams,
) {
    if !params.settings.is_null() {
        match IndexSettings::from_client_value(&params.settings) {
            Ok(settings) => state.host().set_settings(settings),
            Err(e) => {
                warn!(error = %e, "ignoring configuration change");
                return;
            }
        }
    }

    let roots = state.workspace_roots();
    let builds = state.registry().update_all(&roots);
    info!(roots = builds.len(), "configuration changed, rebuilding indexes");
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
    use lsp_types::{Url, WorkspaceFolder};

    #[test]
    fn configuration_change_reindexes_with_new_paths() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let spec_dir = dir.path().join("spec");
        std::fs::create_dir_all(&spec_dir).expect("spec dir");
        let feature = spec_dir.join("a.feature");
        std::fs::write(&feature, "Feature: a\n  Scenario: s\n    Given a configured step\n")
            .expect("write feature");

        let mut state = ServerState::new(ServerConfig::default());
        state.set_workspace_folders(vec![WorkspaceFolder {
            uri: Url::from_file_path(dir.path()).expect("file URI"),
            name: "ws".to_string(),
        }]);
        state.registry().build_blocking(dir.path());
        assert!(state
            .registry()
            .query(&feature, "a configured", MatchMode::default())
            .is_empty());

        handle_did_change_configuration(
            &mut state,
            DidChangeConfigurationParams {
                settings: serde_json::json!({
                    "gherkin-autocomplete": { "featuresPath": "spec" }
                }),
            },
        );
        assert!(state.registry().block_until_ready(dir.path()));

        let names: Vec<_> = state
            .registry()
            .query(&feature, "a configured", MatchMode::default())
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["a configured step"]);
    }

    #[test]
    fn malformed_configuration_keeps_previous_settings() {
        let mut state = ServerState::new(ServerConfig::default());
        state.host().set_settings(IndexSettings {
            features_path: Some("spec".to_string()),
            ..IndexSettings::default()
        });

        handle_did_change_configuration(
            &mut state,
            DidChangeConfigurationParams {
                settings: serde_json::json!({ "featureLibraries": 42 }),
            },
        );

        assert_eq!(state.host().current_settings().features_path(), "spec");
    }

    #[test]
    fn null_configuration_rebuilds_with_current_settings() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let mut state = ServerState::new(ServerConfig::default());
        state.set_workspace_folders(vec![WorkspaceFolder {
            uri: Url::from_file_path(dir.path()).expect("file URI"),
            name: "ws".to_string(),
        }]);

        handle_did_change_configuration(
            &mut state,
            DidChangeConfigurationParams {
                settings: serde_json::Value::Null,
            },
        );

        assert!(state.registry().block_until_ready(dir.path()));
        assert_eq!(state.host().current_settings(), IndexSettings::default());
    }
}
