//! The editor-facing side of the index.
//!
//! The index never talks to an editor directly. Progress messages, the
//! client's settings and the notion of a workspace root all come through an
//! [`IndexHost`], so the same registry runs inside the language server, in
//! tests, and in batch tools.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::IndexSettings;

/// Callbacks the index uses to reach its environment.
///
/// Every method has a default that does nothing (or reports nothing), so
/// implementors only override what they can supply.
pub trait IndexHost: Send + Sync {
    /// Show a short progress message to the user.
    ///
    /// `interval` is how long the message stays visible, when the host
    /// supports transient messages.
    fn post_message(&self, _description: &str, _interval: Option<Duration>) {}

    /// Index settings for the given workspace root.
    ///
    /// `None` means the host has no configuration, which yields an empty
    /// index for that root.
    fn settings(&self, _root: &Path) -> Option<IndexSettings> {
        None
    }

    /// The primary workspace root, if the host has one.
    fn root_path(&self) -> Option<PathBuf> {
        None
    }

    /// The workspace root owning `file`.
    ///
    /// The default answers with [`IndexHost::root_path`] when `file` lies
    /// beneath it.
    fn workspace_root(&self, file: &Path) -> Option<PathBuf> {
        self.root_path().filter(|root| file.starts_with(root))
    }
}

/// A host with no workspace, no settings and no message sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl IndexHost for NoopHost {}

/// A host with a single fixed root and fixed settings.
///
/// Useful for tests and command-line tools that index one directory.
#[derive(Debug, Clone)]
pub struct StaticHost {
    root: PathBuf,
    settings: IndexSettings,
}

impl StaticHost {
    /// Create a host for `root` with the given settings.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, settings: IndexSettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }

    /// The configured root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl IndexHost for StaticHost {
    fn post_message(&self, description: &str, _interval: Option<Duration>) {
        tracing::debug!(root = %self.root.display(), message = description, "index message");
    }

    fn settings(&self, root: &Path) -> Option<IndexSettings> {
        (root == self.root).then(|| self.settings.clone())
    }

    fn root_path(&self) -> Option<PathBuf> {
        Some(self.root.clone())
    }
}

/// Pick the longest of `roots` that contains `file`.
///
/// Nested workspace folders resolve to the innermost one.
pub fn innermost_root<'a, I>(roots: I, file: &Path) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    roots
        .into_iter()
        .filter(|root| file.starts_with(root))
        .max_by_key(|root| root.components().count())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn noop_host_reports_nothing() {
        let host = NoopHost;
        host.post_message("ignored", None);
        assert!(host.settings(Path::new("/ws")).is_none());
        assert!(host.root_path().is_none());
        assert!(host.workspace_root(Path::new("/ws/a.feature")).is_none());
    }

    #[rstest]
    #[case("/ws/features/a.feature", Some("/ws"))]
    #[case("/ws", Some("/ws"))]
    #[case("/other/a.feature", None)]
    #[case("/wsx/a.feature", None)]
    fn static_host_resolves_files_under_its_root(
        #[case] file: &str,
        #[case] expected: Option<&str>,
    ) {
        let host = StaticHost::new("/ws", IndexSettings::default());
        assert_eq!(
            host.workspace_root(Path::new(file)),
            expected.map(PathBuf::from)
        );
    }

    #[test]
    fn static_host_only_configures_its_own_root() {
        let settings = IndexSettings {
            features_path: Some("spec".to_string()),
            ..IndexSettings::default()
        };
        let host = StaticHost::new("/ws", settings.clone());
        assert_eq!(host.settings(Path::new("/ws")), Some(settings));
        assert!(host.settings(Path::new("/elsewhere")).is_none());
    }

    #[test]
    fn innermost_root_prefers_nested_folders() {
        let roots = vec![PathBuf::from("/ws"), PathBuf::from("/ws/sub")];
        assert_eq!(
            innermost_root(&roots, Path::new("/ws/sub/a.feature")),
            Some(PathBuf::from("/ws/sub"))
        );
        assert_eq!(
            innermost_root(&roots, Path::new("/ws/a.feature")),
            Some(PathBuf::from("/ws"))
        );
        assert!(innermost_root(&roots, Path::new("/tmp/a.feature")).is_none());
    }
}
