//! File discovery beneath workspace roots.
//!
//! A build walks a small number of configured directories looking for
//! feature files and script modules. [`search_plan`] turns a root and its
//! [`IndexSettings`] into those directories, and a [`FileFinder`] lists the
//! matching files in each.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::IndexSettings;
use crate::indexing::ScriptDialect;

/// Lists files with a given extension beneath a directory.
pub trait FileFinder: Send + Sync {
    /// Return absolute paths of every file under `dir` (recursively) whose
    /// extension equals `extension`, ignoring ASCII case.
    ///
    /// A missing or unreadable directory yields an empty list.
    fn find_files(&self, dir: &Path, extension: &str) -> Vec<PathBuf>;
}

/// [`FileFinder`] backed by a [`WalkDir`] traversal.
///
/// Hidden files and directories are included. Symlinked directories are not
/// descended into, so link cycles cannot repeat files; symlinked files are
/// kept. Results are sorted so builds are deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileFinder;

impl FileFinder for FsFileFinder {
    fn find_files(&self, dir: &Path, extension: &str) -> Vec<PathBuf> {
        let mut files: Vec<_> = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|next| match next {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter_map(|entry| matching_file(entry, extension))
            .collect();
        files.sort();
        files
    }
}

fn matching_file(entry: DirEntry, extension: &str) -> Option<PathBuf> {
    if entry.file_type().is_dir() {
        return None;
    }
    let path = entry.into_path();
    (path.is_file() && has_extension(&path, extension)).then_some(path)
}

/// Whether `path` has `extension`, ignoring ASCII case.
#[must_use]
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// What a discovered file should be indexed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A Gherkin `.feature` file.
    Feature,
    /// A script module in the given dialect.
    Module(ScriptDialect),
}

impl SourceKind {
    /// File extension for this kind, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Module(dialect) => dialect.extension(),
        }
    }
}

/// One directory to search for one kind of file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    /// Absolute directory to search.
    pub dir: PathBuf,
    /// Which files to pick up there.
    pub kind: SourceKind,
    /// Progress message posted once the directory has been indexed.
    pub message: &'static str,
}

const LIBRARIES_MESSAGE: &str = "Feature libraries cache is built.";
const FEATURES_MESSAGE: &str = "Features' cache is built.";
const BSL_MESSAGE: &str = "Bsl snippets search.";
const ONESCRIPT_MESSAGE: &str = "OneScript snippets search.";

/// Expand the settings for `root` into the directories a build searches.
///
/// Feature libraries and the features path are searched for feature files
/// and both script dialects; script source paths only for BSL modules.
/// Relative paths resolve against `root`; absolute ones are kept.
#[must_use]
pub fn search_plan(root: &Path, settings: &IndexSettings) -> Vec<SearchTarget> {
    let mut plan = Vec::new();
    for library in &settings.feature_libraries {
        push_feature_dir(&mut plan, root.join(library), LIBRARIES_MESSAGE);
    }
    push_feature_dir(&mut plan, root.join(settings.features_path()), FEATURES_MESSAGE);
    for source in &settings.src_bsl_paths {
        plan.push(SearchTarget {
            dir: root.join(source),
            kind: SourceKind::Module(ScriptDialect::Bsl),
            message: BSL_MESSAGE,
        });
    }
    plan
}

fn push_feature_dir(plan: &mut Vec<SearchTarget>, dir: PathBuf, message: &'static str) {
    plan.push(SearchTarget {
        dir: dir.clone(),
        kind: SourceKind::Feature,
        message,
    });
    plan.push(SearchTarget {
        dir: dir.clone(),
        kind: SourceKind::Module(ScriptDialect::Bsl),
        message: BSL_MESSAGE,
    });
    plan.push(SearchTarget {
        dir,
        kind: SourceKind::Module(ScriptDialect::OneScript),
        message: ONESCRIPT_MESSAGE,
    });
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, relative: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, "").expect("write file");
        path
    }

    #[test]
    fn finds_files_recursively_ignoring_case_and_including_dot_dirs() {
        let dir = TempDir::new().expect("temp dir");
        let top = touch(dir.path(), "a.feature");
        let nested = touch(dir.path(), "nested/deeper/B.FEATURE");
        let hidden = touch(dir.path(), ".hidden/c.feature");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "steps.bsl");

        let found = FsFileFinder.find_files(dir.path(), "feature");

        let mut expected = vec![top, nested, hidden];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = TempDir::new().expect("temp dir");
        let feature = touch(dir.path(), "nested/a.feature");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("nested/loop"))
            .expect("create directory link");
        std::os::unix::fs::symlink(&feature, dir.path().join("linked.feature"))
            .expect("create file link");

        let found = FsFileFinder.find_files(dir.path(), "feature");

        assert_eq!(found, vec![dir.path().join("linked.feature"), feature]);
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let found = FsFileFinder.find_files(&dir.path().join("absent"), "feature");
        assert!(found.is_empty());
    }

    #[rstest]
    #[case("steps.bsl", "bsl", true)]
    #[case("steps.BSL", "bsl", true)]
    #[case("steps.os", "bsl", false)]
    #[case("feature", "feature", false)]
    fn extension_matching(#[case] path: &str, #[case] extension: &str, #[case] expected: bool) {
        assert_eq!(has_extension(Path::new(path), extension), expected);
    }

    #[test]
    fn search_plan_defaults_to_features_directory() {
        let plan = search_plan(Path::new("/ws"), &IndexSettings::default());
        let dirs: Vec<_> = plan.iter().map(|t| (t.dir.clone(), t.kind)).collect();
        assert_eq!(
            dirs,
            vec![
                (PathBuf::from("/ws/./features"), SourceKind::Feature),
                (
                    PathBuf::from("/ws/./features"),
                    SourceKind::Module(ScriptDialect::Bsl)
                ),
                (
                    PathBuf::from("/ws/./features"),
                    SourceKind::Module(ScriptDialect::OneScript)
                ),
            ]
        );
    }

    #[test]
    fn search_plan_orders_libraries_features_then_sources() {
        let settings = IndexSettings {
            feature_libraries: vec!["lib".to_string()],
            features_path: Some("spec".to_string()),
            src_bsl_paths: vec!["/abs/src".to_string()],
        };
        let plan = search_plan(Path::new("/ws"), &settings);
        let messages: Vec<_> = plan.iter().map(|t| t.message).collect();
        assert_eq!(
            messages,
            vec![
                LIBRARIES_MESSAGE,
                BSL_MESSAGE,
                ONESCRIPT_MESSAGE,
                FEATURES_MESSAGE,
                BSL_MESSAGE,
                ONESCRIPT_MESSAGE,
                BSL_MESSAGE,
            ]
        );
        let last = plan.last().expect("source target");
        assert_eq!(last.dir, PathBuf::from("/abs/src"));
        assert_eq!(last.kind, SourceKind::Module(ScriptDialect::Bsl));
    }
}
