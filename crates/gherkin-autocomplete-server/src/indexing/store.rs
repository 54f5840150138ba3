//! Per-root index storage and builds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::feature::{index_feature_file, index_feature_source};
use super::module::index_module_file;
use super::{
    BslModuleParser, FeatureParser, GherkinFeatureParser, IndexEntry, IndexError, LanguageInfo,
    ModuleMethodEntry, ModuleParser,
};
use crate::discovery::{FileFinder, FsFileFinder, SourceKind, search_plan};
use crate::host::IndexHost;

/// How long build progress messages stay visible.
const MESSAGE_INTERVAL: Duration = Duration::from_secs(3);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Collaborators shared by every build and query.
#[derive(Clone)]
pub(super) struct IndexServices {
    pub(super) host: Arc<dyn IndexHost>,
    pub(super) finder: Arc<dyn FileFinder>,
    pub(super) feature_parser: Arc<dyn FeatureParser>,
    pub(super) module_parser: Arc<dyn ModuleParser>,
    pub(super) poll_interval: Duration,
}

#[derive(Debug, Default)]
pub(super) struct RootCollections {
    pub(super) steps: Vec<IndexEntry>,
    pub(super) exported_snippets: Vec<ModuleMethodEntry>,
    pub(super) languages: HashMap<PathBuf, LanguageInfo>,
}

impl RootCollections {
    fn replace_document(
        &mut self,
        filename: &Path,
        entries: Vec<IndexEntry>,
        language: Option<LanguageInfo>,
    ) {
        self.steps.retain(|entry| entry.filename != filename);
        self.languages.remove(filename);
        self.steps.extend(entries);
        if let Some(language) = language {
            self.languages.insert(filename.to_path_buf(), language);
        }
    }
}

/// Index state for one workspace root.
#[derive(Debug, Default)]
pub(super) struct RootIndex {
    collections: RwLock<RootCollections>,
    ready: AtomicBool,
    generation: AtomicU64,
}

impl RootIndex {
    pub(super) fn read(&self) -> RwLockReadGuard<'_, RootCollections> {
        self.collections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RootCollections> {
        self.collections.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Drop current contents and claim a new build generation.
    ///
    /// Both happen under the collections' write lock, the same lock
    /// [`Self::install`] checks the generation under.
    fn begin_build(&self) -> u64 {
        let mut guard = self.write();
        *guard = RootCollections::default();
        self.ready.store(false, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Install a finished build unless a newer one has started since.
    fn install(&self, generation: u64, collections: RootCollections) -> bool {
        let mut guard = self.write();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        *guard = collections;
        self.ready.store(true, Ordering::Release);
        true
    }
}

/// Summary of one root build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Root that was built.
    pub root: PathBuf,
    /// Feature files indexed successfully.
    pub features: usize,
    /// Script modules indexed successfully.
    pub modules: usize,
    /// Files that failed to read or parse.
    pub failures: usize,
    /// Step entries collected.
    pub steps: usize,
    /// Module snippets collected.
    pub snippets: usize,
    /// Whether a newer build replaced this one before it finished.
    pub superseded: bool,
}

/// Completion signal for a root build.
#[derive(Debug)]
pub enum BuildHandle {
    /// The build is running on tokio's blocking pool.
    Pending(JoinHandle<BuildReport>),
    /// No runtime was available, so the build runs on its own thread.
    Thread(std::thread::JoinHandle<BuildReport>),
}

impl BuildHandle {
    /// Wait for the build to finish.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::BuildTask`] when the background task panicked
    /// or was cancelled, and [`IndexError::BuildThread`] when the build
    /// thread panicked.
    pub async fn wait(self) -> Result<BuildReport, IndexError> {
        match self {
            Self::Pending(handle) => Ok(handle.await?),
            Self::Thread(handle) => tokio::task::spawn_blocking(move || handle.join())
                .await?
                .map_err(|_| IndexError::BuildThread),
        }
    }

    /// Whether the build has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match self {
            Self::Pending(handle) => handle.is_finished(),
            Self::Thread(handle) => handle.is_finished(),
        }
    }
}

/// Owns one index per workspace root.
///
/// Construct it once and share it behind an [`Arc`]. Builds run on tokio's
/// blocking pool when a runtime is available and on a thread of their own
/// otherwise; queries never wait for a build and see an empty index until it
/// completes.
pub struct IndexRegistry {
    roots: RwLock<HashMap<PathBuf, Arc<RootIndex>>>,
    pub(super) services: Arc<IndexServices>,
}

impl std::fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexRegistry")
            .field("roots", &self.roots_snapshot().keys().collect::<Vec<_>>())
            .field("poll_interval", &self.services.poll_interval)
            .finish_non_exhaustive()
    }
}

impl IndexRegistry {
    /// Create a registry using the default parsers and filesystem finder.
    #[must_use]
    pub fn new(host: Arc<dyn IndexHost>) -> Self {
        Self {
            roots: RwLock::new(HashMap::new()),
            services: Arc::new(IndexServices {
                host,
                finder: Arc::new(FsFileFinder),
                feature_parser: Arc::new(GherkinFeatureParser),
                module_parser: Arc::new(BslModuleParser),
                poll_interval: DEFAULT_POLL_INTERVAL,
            }),
        }
    }

    /// Replace the file finder.
    #[must_use]
    pub fn with_file_finder(mut self, finder: Arc<dyn FileFinder>) -> Self {
        Arc::make_mut(&mut self.services).finder = finder;
        self
    }

    /// Replace the feature parser.
    #[must_use]
    pub fn with_feature_parser(mut self, parser: Arc<dyn FeatureParser>) -> Self {
        Arc::make_mut(&mut self.services).feature_parser = parser;
        self
    }

    /// Replace the module parser.
    #[must_use]
    pub fn with_module_parser(mut self, parser: Arc<dyn ModuleParser>) -> Self {
        Arc::make_mut(&mut self.services).module_parser = parser;
        self
    }

    /// Set the interval used by [`Self::wait_until_ready`].
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        Arc::make_mut(&mut self.services).poll_interval = interval;
        self
    }

    /// The host this registry reports to.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn IndexHost> {
        &self.services.host
    }

    fn roots_snapshot(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, Arc<RootIndex>>> {
        self.roots.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn root_index(&self, root: &Path) -> Option<Arc<RootIndex>> {
        self.roots_snapshot().get(root).cloned()
    }

    fn root_index_or_insert(&self, root: &Path) -> Arc<RootIndex> {
        let mut roots = self.roots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(roots.entry(root.to_path_buf()).or_default())
    }

    /// Rebuild the index for `root` from scratch.
    ///
    /// The root is not ready until the returned build finishes. Starting a
    /// new build supersedes any build still in flight for the same root.
    pub fn build(&self, root: &Path) -> BuildHandle {
        let index = self.root_index_or_insert(root);
        let generation = index.begin_build();
        let services = Arc::clone(&self.services);
        let root = root.to_path_buf();
        debug!(root = %root.display(), generation, "starting index build");
        let job = move || run_build(&services, &index, root, generation);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => BuildHandle::Pending(runtime.spawn_blocking(job)),
            Err(_) => BuildHandle::Thread(std::thread::spawn(job)),
        }
    }

    /// Rebuild the index for `root` on the calling thread.
    pub fn build_blocking(&self, root: &Path) -> BuildReport {
        let index = self.root_index_or_insert(root);
        let generation = index.begin_build();
        run_build(&self.services, &index, root.to_path_buf(), generation)
    }

    /// Start a build for every root.
    pub fn update_all<I>(&self, roots: I) -> Vec<BuildHandle>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        roots
            .into_iter()
            .map(|root| self.build(root.as_ref()))
            .collect()
    }

    /// Re-index one feature file in place.
    ///
    /// The file's previous step entries and language record are removed and
    /// replaced by entries parsed from `text`, or from disk when `text` is
    /// `None`. A parse failure leaves the file with no entries.
    pub fn update_single_document(&self, filename: &Path, text: Option<&str>) {
        let Some(root) = self.services.host.workspace_root(filename) else {
            debug!(path = %filename.display(), "document is outside every workspace root");
            return;
        };
        let Some(index) = self.root_index(&root) else {
            debug!(root = %root.display(), "ignoring update for an unbuilt root");
            return;
        };

        let parser = self.services.feature_parser.as_ref();
        let result = match text {
            Some(source) => index_feature_source(parser, filename, source),
            None => index_feature_file(parser, filename),
        };
        match result {
            Ok((entries, language)) => {
                debug!(path = %filename.display(), steps = entries.len(), "re-indexed feature file");
                index.write().replace_document(filename, entries, Some(language));
            }
            Err(err) => {
                warn!(path = %filename.display(), error = %err, "failed to re-index feature file");
                index.write().replace_document(filename, Vec::new(), None);
            }
        }
    }

    /// Whether the root owning `filename` is ready.
    ///
    /// A root that was never built starts building now; the call still
    /// returns `false`. Files outside every root are never ready.
    pub fn ensure_built(&self, filename: &Path) -> bool {
        let Some(root) = self.services.host.workspace_root(filename) else {
            return false;
        };
        if let Some(index) = self.root_index(&root) {
            return index.is_ready();
        }
        drop(self.build(&root));
        false
    }

    /// Whether `root` has a completed build.
    #[must_use]
    pub fn is_ready(&self, root: &Path) -> bool {
        self.root_index(root).is_some_and(|index| index.is_ready())
    }

    /// Poll until `root` is ready.
    ///
    /// Returns `false` straight away for a root that has never been built.
    pub async fn wait_until_ready(&self, root: &Path) -> bool {
        let Some(index) = self.root_index(root) else {
            return false;
        };
        while !index.is_ready() {
            tokio::time::sleep(self.services.poll_interval).await;
        }
        true
    }

    /// Blocking counterpart of [`Self::wait_until_ready`] for callers
    /// without an async runtime.
    pub fn block_until_ready(&self, root: &Path) -> bool {
        let Some(index) = self.root_index(root) else {
            return false;
        };
        while !index.is_ready() {
            std::thread::sleep(self.services.poll_interval);
        }
        true
    }

    /// Poll until every known root is ready.
    pub async fn wait_until_all_ready(&self) {
        let indexes: Vec<_> = self.roots_snapshot().values().cloned().collect();
        for index in indexes {
            while !index.is_ready() {
                tokio::time::sleep(self.services.poll_interval).await;
            }
        }
    }
}

fn run_build(
    services: &IndexServices,
    index: &RootIndex,
    root: PathBuf,
    generation: u64,
) -> BuildReport {
    let mut report = BuildReport {
        root,
        ..BuildReport::default()
    };
    let mut collections = RootCollections::default();

    if let Some(settings) = services.host.settings(&report.root) {
        for target in search_plan(&report.root, &settings) {
            let files = services.finder.find_files(&target.dir, target.kind.extension());
            for file in files {
                index_file(services, target.kind, &file, &mut collections, &mut report);
            }
            services.host.post_message(target.message, Some(MESSAGE_INTERVAL));
        }
    } else {
        debug!(root = %report.root.display(), "no index settings for root");
    }

    report.steps = collections.steps.len();
    report.snippets = collections.exported_snippets.len();
    report.superseded = !index.install(generation, collections);

    info!(
        root = %report.root.display(),
        features = report.features,
        modules = report.modules,
        failures = report.failures,
        steps = report.steps,
        snippets = report.snippets,
        superseded = report.superseded,
        "index build finished"
    );
    report
}

fn index_file(
    services: &IndexServices,
    kind: SourceKind,
    file: &Path,
    collections: &mut RootCollections,
    report: &mut BuildReport,
) {
    match kind {
        SourceKind::Feature => {
            match index_feature_file(services.feature_parser.as_ref(), file) {
                Ok((entries, language)) => {
                    report.features += 1;
                    collections.steps.extend(entries);
                    collections.languages.insert(file.to_path_buf(), language);
                }
                Err(err) => {
                    report.failures += 1;
                    warn!(path = %file.display(), error = %err, "failed to index feature file");
                }
            }
        }
        SourceKind::Module(dialect) => {
            match index_module_file(services.module_parser.as_ref(), dialect, file) {
                Ok(entries) => {
                    report.modules += 1;
                    collections.exported_snippets.extend(entries);
                }
                Err(err) => {
                    report.failures += 1;
                    warn!(path = %file.display(), error = %err, "failed to index module");
                }
            }
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests use explicit failures for clarity"
)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::host::{NoopHost, StaticHost};
    use rstest::{fixture, rstest};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingHost {
        root: PathBuf,
        messages: Mutex<Vec<String>>,
    }

    impl IndexHost for RecordingHost {
        fn post_message(&self, description: &str, _interval: Option<Duration>) {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(description.to_owned());
        }

        fn settings(&self, _root: &Path) -> Option<IndexSettings> {
            Some(IndexSettings::default())
        }

        fn root_path(&self) -> Option<PathBuf> {
            Some(self.root.clone())
        }
    }

    #[fixture]
    fn workspace() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        let features = dir.path().join("features");
        std::fs::create_dir_all(&features).expect("features dir");
        std::fs::write(
            features.join("basket.feature"),
            "Feature: basket\n  Scenario: add\n    Given I have <n> items\n    When I add \"apple\"\n",
        )
        .expect("write feature");
        std::fs::write(features.join("broken.feature"), "not gherkin at all\n")
            .expect("write feature");
        dir
    }

    #[rstest]
    fn build_indexes_features_and_isolates_failures(workspace: TempDir) {
        let root = workspace.path().to_path_buf();
        let registry = IndexRegistry::new(Arc::new(StaticHost::new(
            root.clone(),
            IndexSettings::default(),
        )));

        let report = registry.build_blocking(&root);

        assert_eq!(report.features, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.steps, 2);
        assert!(!report.superseded);
        assert!(registry.is_ready(&root));
    }

    #[rstest]
    fn build_posts_one_message_per_search_target(workspace: TempDir) {
        let host = Arc::new(RecordingHost {
            root: workspace.path().to_path_buf(),
            ..RecordingHost::default()
        });
        let registry = IndexRegistry::new(Arc::clone(&host) as Arc<dyn IndexHost>);

        registry.build_blocking(workspace.path());

        let messages = host.messages.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(
            *messages,
            vec![
                "Features' cache is built.".to_string(),
                "Bsl snippets search.".to_string(),
                "OneScript snippets search.".to_string(),
            ]
        );
    }

    #[test]
    fn missing_settings_yield_an_empty_ready_index() {
        let registry = IndexRegistry::new(Arc::new(NoopHost));
        let report = registry.build_blocking(Path::new("/nowhere"));
        assert_eq!(report, BuildReport {
            root: PathBuf::from("/nowhere"),
            ..BuildReport::default()
        });
        assert!(registry.is_ready(Path::new("/nowhere")));
    }

    #[test]
    fn starting_a_build_clears_readiness_and_contents() {
        let index = RootIndex::default();
        let first = index.begin_build();
        assert!(index.install(first, marked_collections(first)));

        let second = index.begin_build();

        assert!(!index.is_ready());
        assert!(index.read().languages.is_empty());
        assert!(!index.install(first, RootCollections::default()));
        assert!(index.install(second, RootCollections::default()));
    }

    #[test]
    fn stale_generations_do_not_install() {
        let index = RootIndex::default();
        let first = index.begin_build();
        let second = index.begin_build();

        assert!(!index.install(first, RootCollections::default()));
        assert!(!index.is_ready());
        assert!(index.install(second, RootCollections::default()));
        assert!(index.is_ready());
    }

    #[rstest]
    fn ensure_built_triggers_the_first_build(workspace: TempDir) {
        let root = workspace.path().to_path_buf();
        let registry = IndexRegistry::new(Arc::new(StaticHost::new(
            root.clone(),
            IndexSettings::default(),
        )));
        let file = root.join("features/basket.feature");

        assert!(!registry.ensure_built(&file));
        assert!(registry.block_until_ready(&root));
        assert!(registry.ensure_built(&file));
        assert!(!registry.ensure_built(Path::new("/elsewhere/a.feature")));
    }

    #[rstest]
    fn builds_without_a_runtime_do_not_block_the_caller(workspace: TempDir) {
        let root = workspace.path().to_path_buf();
        let registry = IndexRegistry::new(Arc::new(StaticHost::new(
            root.clone(),
            IndexSettings::default(),
        )))
        .with_poll_interval(Duration::from_millis(5));

        let BuildHandle::Thread(thread) = registry.build(&root) else {
            panic!("expected a build on its own thread");
        };
        assert!(registry.block_until_ready(&root));
        let report = thread.join().expect("build thread");
        assert_eq!(report.steps, 2);
    }

    fn marked_collections(generation: u64) -> RootCollections {
        let marker = PathBuf::from(generation.to_string());
        RootCollections {
            languages: HashMap::from([(
                marker.clone(),
                LanguageInfo {
                    filename: marker,
                    language: "en".to_string(),
                },
            )]),
            ..RootCollections::default()
        }
    }

    #[test]
    fn a_ready_index_always_holds_the_newest_generation() {
        let index = Arc::new(RootIndex::default());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let generation = index.begin_build();
                        index.install(generation, marked_collections(generation));
                    }
                })
            })
            .collect();

        while workers.iter().any(|worker| !worker.is_finished()) {
            let collections = index.read();
            if index.is_ready() {
                let newest = PathBuf::from(index.generation.load(Ordering::Acquire).to_string());
                assert!(
                    collections.languages.contains_key(&newest),
                    "ready with stale contents"
                );
            }
        }
        for worker in workers {
            worker.join().expect("worker");
        }
        assert!(index.is_ready());
    }

    #[rstest]
    #[tokio::test]
    async fn background_builds_can_be_awaited(workspace: TempDir) {
        let root = workspace.path().to_path_buf();
        let registry = IndexRegistry::new(Arc::new(StaticHost::new(
            root.clone(),
            IndexSettings::default(),
        )))
        .with_poll_interval(Duration::from_millis(5));

        let handle = registry.build(&root);
        assert!(registry.wait_until_ready(&root).await);
        let report = handle.wait().await.expect("build task");
        assert_eq!(report.steps, 2);

        let rebuild = registry.build(&root);
        assert!(matches!(rebuild, BuildHandle::Pending(_)));
        registry.wait_until_all_ready().await;
        assert!(registry.is_ready(&root));
    }

    #[tokio::test]
    async fn waiting_on_an_unknown_root_returns_immediately() {
        let registry = IndexRegistry::new(Arc::new(NoopHost));
        assert!(!registry.wait_until_ready(Path::new("/unknown")).await);
    }
}
