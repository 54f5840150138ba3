//! Core language server state and service construction.
//!
//! This module defines the central state shared across all LSP handlers and
//! the [`ClientHost`] through which the index talks back to the client.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_lsp::ClientSocket;
use lsp_types::{
    ClientCapabilities, CompletionOptions, LogMessageParams, MessageType, SaveOptions,
    ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, WorkspaceFolder, notification,
};
use tracing::debug;

use crate::config::{IndexSettings, ServerConfig};
use crate::host::{IndexHost, innermost_root};
use crate::indexing::IndexRegistry;

/// [`IndexHost`] backed by the connected LSP client.
///
/// Workspace folders and settings are updated by the lifecycle and
/// configuration handlers; builds read them from any thread.
#[derive(Debug, Default)]
pub struct ClientHost {
    client: Option<ClientSocket>,
    folders: RwLock<Vec<PathBuf>>,
    settings: RwLock<IndexSettings>,
}

impl ClientHost {
    /// Create a host that forwards messages to `client`.
    #[must_use]
    pub fn new(client: Option<ClientSocket>) -> Self {
        Self {
            client,
            ..Self::default()
        }
    }

    /// Replace the known workspace folders.
    pub fn set_folders(&self, folders: Vec<PathBuf>) {
        *self.folders.write().unwrap_or_else(PoisonError::into_inner) = folders;
    }

    /// The known workspace folders.
    #[must_use]
    pub fn folders(&self) -> Vec<PathBuf> {
        self.folders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the index settings.
    pub fn set_settings(&self, settings: IndexSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// The current index settings.
    #[must_use]
    pub fn current_settings(&self) -> IndexSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IndexHost for ClientHost {
    fn post_message(&self, description: &str, _interval: Option<Duration>) {
        let Some(client) = self.client.as_ref() else {
            return;
        };
        let params = LogMessageParams {
            typ: MessageType::INFO,
            message: description.to_owned(),
        };
        if let Err(err) = client.notify::<notification::LogMessage>(params) {
            debug!(error = %err, "failed to send log message to client");
        }
    }

    fn settings(&self, _root: &Path) -> Option<IndexSettings> {
        Some(self.current_settings())
    }

    fn root_path(&self) -> Option<PathBuf> {
        self.folders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .first()
            .cloned()
    }

    fn workspace_root(&self, file: &Path) -> Option<PathBuf> {
        let folders = self.folders.read().unwrap_or_else(PoisonError::into_inner);
        innermost_root(folders.iter(), file)
    }
}

/// Central state shared across all LSP handlers.
///
/// This struct holds the in-memory state of the language server: client
/// details, the text of open documents and the step index. It is passed to
/// handlers via the async-lsp router.
#[derive(Debug)]
pub struct ServerState {
    /// Client capabilities received during initialisation.
    pub(crate) client_capabilities: Option<ClientCapabilities>,
    /// Workspace folders from the client.
    pub(crate) workspace_folders: Vec<WorkspaceFolder>,
    /// Whether the server has been initialised.
    initialised: bool,
    /// Configuration loaded from environment and command line.
    config: ServerConfig,
    /// Host shared with the index.
    host: Arc<ClientHost>,
    /// Step index for every workspace folder.
    registry: Arc<IndexRegistry>,
    /// Latest text of open documents, keyed by path.
    documents: HashMap<PathBuf, String>,
}

impl ServerState {
    /// Create a new server state with the given configuration.
    ///
    /// The state has no client connection, so index progress messages are
    /// dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use gherkin_autocomplete_server::config::ServerConfig;
    /// use gherkin_autocomplete_server::server::ServerState;
    ///
    /// let config = ServerConfig::default();
    /// let state = ServerState::new(config);
    /// assert!(!state.is_initialised());
    /// ```
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_client(config, None)
    }

    /// Create a new server state that reports to `client`.
    #[must_use]
    pub fn with_client(config: ServerConfig, client: Option<ClientSocket>) -> Self {
        let host = Arc::new(ClientHost::new(client));
        let registry = IndexRegistry::new(Arc::clone(&host) as Arc<dyn IndexHost>)
            .with_poll_interval(config.poll_interval());
        Self {
            client_capabilities: None,
            workspace_folders: Vec::new(),
            initialised: false,
            config,
            host,
            registry: Arc::new(registry),
            documents: HashMap::new(),
        }
    }

    /// Access the stored client capabilities, if any.
    #[must_use]
    pub fn client_capabilities(&self) -> Option<&ClientCapabilities> {
        self.client_capabilities.as_ref()
    }

    /// Store workspace folders provided by the client.
    ///
    /// Folders without a `file://` URI are kept for reference but never
    /// indexed.
    pub fn set_workspace_folders(&mut self, folders: Vec<WorkspaceFolder>) {
        let paths = folders
            .iter()
            .filter_map(|folder| folder.uri.to_file_path().ok())
            .collect();
        self.host.set_folders(paths);
        self.workspace_folders = folders;
    }

    /// Access the workspace folders provided by the client.
    #[must_use]
    pub fn workspace_folders(&self) -> &[WorkspaceFolder] {
        &self.workspace_folders
    }

    /// Filesystem paths of the workspace folders.
    #[must_use]
    pub fn workspace_roots(&self) -> Vec<PathBuf> {
        self.host.folders()
    }

    /// Access the current server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The host shared with the index.
    #[must_use]
    pub fn host(&self) -> &Arc<ClientHost> {
        &self.host
    }

    /// The step index.
    #[must_use]
    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Record the latest text of an open document.
    pub fn set_document(&mut self, path: PathBuf, text: String) {
        self.documents.insert(path, text);
    }

    /// Forget an open document.
    pub fn remove_document(&mut self, path: &Path) {
        self.documents.remove(path);
    }

    /// Latest text of an open document.
    #[must_use]
    pub fn document(&self, path: &Path) -> Option<&str> {
        self.documents.get(path).map(String::as_str)
    }

    /// Mark the server as initialised.
    pub fn mark_initialised(&mut self) {
        self.initialised = true;
    }

    /// Check if the server is initialised.
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }
}

/// Build the server capabilities to advertise to the client.
///
/// Full-text synchronisation (with text included on save) keeps the open
/// document cache current; completion serves step suggestions.
#[must_use]
pub fn build_server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(true),
                })),
                ..TextDocumentSyncOptions::default()
            },
        )),
        completion_provider: Some(CompletionOptions {
            resolve_provider: Some(false),
            ..CompletionOptions::default()
        }),
        ..ServerCapabilities::default()
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use lsp_types::Url;

    #[test]
    fn new_state_is_not_initialised() {
        let config = ServerConfig::default();
        let state = ServerState::new(config);
        assert!(!state.is_initialised());
        assert!(state.client_capabilities().is_none());
        assert!(state.workspace_folders().is_empty());
        assert!(state.workspace_roots().is_empty());
    }

    #[test]
    fn mark_initialised_sets_flag() {
        let config = ServerConfig::default();
        let mut state = ServerState::new(config);
        state.mark_initialised();
        assert!(state.is_initialised());
    }

    #[test]
    fn workspace_folders_feed_the_host() {
        let mut state = ServerState::new(ServerConfig::default());
        let root = PathBuf::from("/ws");
        state.set_workspace_folders(vec![WorkspaceFolder {
            uri: Url::from_file_path(&root).expect("file URI"),
            name: "ws".to_string(),
        }]);

        assert_eq!(state.workspace_roots(), vec![root.clone()]);
        assert_eq!(state.host().root_path(), Some(root.clone()));
        assert_eq!(
            state.host().workspace_root(Path::new("/ws/features/a.feature")),
            Some(root)
        );
    }

    #[test]
    fn client_host_always_has_settings() {
        let host = ClientHost::new(None);
        assert_eq!(host.settings(Path::new("/ws")), Some(IndexSettings::default()));
        host.post_message("dropped without a client", None);
    }

    #[test]
    fn document_cache_round_trip() {
        let mut state = ServerState::new(ServerConfig::default());
        let path = PathBuf::from("/ws/a.feature");
        state.set_document(path.clone(), "Feature: a\n".to_string());
        assert_eq!(state.document(&path), Some("Feature: a\n"));
        state.remove_document(&path);
        assert!(state.document(&path).is_none());
    }

    #[test]
    fn capabilities_advertise_sync_and_completion() {
        let capabilities = build_server_capabilities();
        let Some(TextDocumentSyncCapability::Options(sync)) = capabilities.text_document_sync
        else {
            panic!("expected text document sync options");
        };
        assert_eq!(sync.change, Some(TextDocumentSyncKind::FULL));
        assert!(matches!(
            sync.save,
            Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                include_text: Some(true)
            }))
        ));
        assert!(capabilities.completion_provider.is_some());
        assert!(capabilities.definition_provider.is_none());
    }
}
