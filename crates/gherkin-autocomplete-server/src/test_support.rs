//! Shared test support utilities for gherkin-autocomplete-server tests.
//!
//! This module provides common infrastructure for both unit and integration
//! tests, including:
//! - Temporary workspace creation with feature files and script modules
//! - A registry wired to a [`StaticHost`] for the workspace
//! - Server state wired to the workspace for handler-level tests
//! - Newtype wrappers for improved type safety

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_types::{Url, WorkspaceFolder};
use tempfile::TempDir;

use crate::config::{IndexSettings, ServerConfig};
use crate::host::StaticHost;
use crate::indexing::{BuildReport, IndexRegistry};
use crate::server::ServerState;

/// Newtype wrapper for test file names to improve type safety.
#[derive(Debug, Clone)]
pub struct Filename(pub(crate) String);

impl From<&str> for Filename {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for Filename {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Filename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Newtype wrapper for file contents to improve type safety.
#[derive(Debug, Clone)]
pub struct FileContent(pub(crate) String);

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for FileContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A temporary workspace with its registry.
pub struct TestWorkspace {
    /// Temporary directory acting as the workspace root.
    pub dir: TempDir,
    /// Settings the workspace was configured with.
    pub settings: IndexSettings,
    /// Registry reporting to a [`StaticHost`] for `dir`.
    pub registry: Arc<IndexRegistry>,
}

impl TestWorkspace {
    /// The workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file relative to the root.
    #[must_use]
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// `file://` URI of a file relative to the root.
    ///
    /// # Panics
    ///
    /// Panics if the path cannot be converted to a URI.
    #[expect(clippy::expect_used, reason = "test helper uses expect for clarity")]
    #[must_use]
    pub fn uri(&self, relative: &str) -> Url {
        Url::from_file_path(self.path(relative)).expect("file URI")
    }

    /// Build the root index on the calling thread.
    pub fn index(&self) -> BuildReport {
        self.registry.build_blocking(self.root())
    }

    /// Write (or overwrite) a file relative to the root.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, filename: impl Into<Filename>, content: impl Into<FileContent>) {
        write_file(self.root(), &filename.into(), &content.into());
    }

    /// Server state whose single workspace folder is this workspace.
    ///
    /// The state has its own registry; nothing is indexed yet.
    ///
    /// # Panics
    ///
    /// Panics if the root cannot be converted to a URI.
    #[expect(clippy::expect_used, reason = "test helper uses expect for clarity")]
    #[must_use]
    pub fn server_state(&self) -> ServerState {
        let mut state = ServerState::new(ServerConfig::default());
        state.set_workspace_folders(vec![WorkspaceFolder {
            uri: Url::from_file_path(self.root()).expect("root URI"),
            name: "workspace".to_string(),
        }]);
        state.host().set_settings(self.settings.clone());
        state
    }
}

#[expect(clippy::expect_used, reason = "test helper panics on write failure")]
fn write_file(root: &Path, filename: &Filename, content: &FileContent) {
    let path = root.join(filename.as_ref());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directories");
    }
    std::fs::write(&path, content.as_ref()).expect("write workspace file");
}

/// Builder for temporary workspaces.
///
/// Provides a fluent API for adding files and settings; [`Self::build`]
/// writes every file and wires up the registry.
pub struct WorkspaceBuilder {
    dir: TempDir,
    files: Vec<(Filename, FileContent)>,
    settings: IndexSettings,
}

impl WorkspaceBuilder {
    /// Create a new builder with a fresh temp directory and default settings.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[expect(clippy::expect_used, reason = "builder panics on temp dir failure")]
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            files: Vec::new(),
            settings: IndexSettings::default(),
        }
    }

    /// Add a file at a path relative to the root.
    #[must_use]
    pub fn with_file(
        mut self,
        filename: impl Into<Filename>,
        content: impl Into<FileContent>,
    ) -> Self {
        self.files.push((filename.into(), content.into()));
        self
    }

    /// Add a feature file under `features/`.
    #[must_use]
    pub fn with_feature(self, name: &str, content: impl Into<FileContent>) -> Self {
        self.with_file(format!("features/{name}"), content)
    }

    /// Use the given index settings.
    #[must_use]
    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Write all files and create the registry, without indexing.
    #[must_use]
    pub fn build(self) -> TestWorkspace {
        for (filename, content) in &self.files {
            write_file(self.dir.path(), filename, content);
        }
        let host = StaticHost::new(self.dir.path(), self.settings.clone());
        TestWorkspace {
            registry: Arc::new(IndexRegistry::new(Arc::new(host))),
            dir: self.dir,
            settings: self.settings,
        }
    }

    /// Write all files, create the registry and build the root index.
    #[must_use]
    pub fn build_indexed(self) -> TestWorkspace {
        let workspace = self.build();
        workspace.index();
        workspace
    }
}

impl Default for WorkspaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
