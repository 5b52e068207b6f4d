//! Per-workspace runtime context.
//!
//! An [`Extension`] owns state that outlives any one workspace (settings,
//! compiled patterns, last selected folders). Activating it for a root
//! produces a [`WorkspaceSession`], which keeps that root's folder index
//! current:
//!
//! ```text
//! notify events -> ChangeFilter -> RebuildHandle::request -> RebuildWorker
//!                                                             |
//!                                         FolderIndexCache::rebuild
//! ```
//!
//! Settings changes that affect the index and root switches feed the same
//! cache.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::{Settings, SettingsStore};
use crate::filter::{IgnoreRuleSet, RuleCompiler};
use crate::index::{FolderIndexCache, IndexError, IndexStrategy, WorkspaceIndex};
use crate::walker::WalkOptions;
use crate::watcher::{ChangeFilter, FileSystemWatcher, Rebuild, RebuildHandle, RebuildWorker, WatcherConfig};

/// Most recently selected destination folder per workspace root.
#[derive(Debug, Default)]
pub struct LastFolderCache {
    inner: Mutex<HashMap<PathBuf, String>>,
}

impl LastFolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, root: &Path) -> Option<String> {
        self.lock().get(root).cloned()
    }

    pub fn set(&self, root: &Path, folder: impl Into<String>) {
        self.lock().insert(root.to_path_buf(), folder.into());
    }

    pub fn remove(&self, root: &Path) -> Option<String> {
        self.lock().remove(root)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, String>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Process-wide state shared by all workspace sessions.
#[derive(Debug)]
pub struct Extension {
    settings: SettingsStore,
    compiler: Arc<RuleCompiler>,
    last_folders: LastFolderCache,
    strategy: IndexStrategy,
    watcher_config: WatcherConfig,
    watch_changes: bool,
}

impl Extension {
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            settings,
            compiler: Arc::new(RuleCompiler::new()),
            last_folders: LastFolderCache::new(),
            strategy: IndexStrategy::Walk,
            watcher_config: WatcherConfig::default(),
            watch_changes: true,
        }
    }

    pub fn with_strategy(mut self, strategy: IndexStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_watcher_config(mut self, config: WatcherConfig) -> Self {
        self.watcher_config = config;
        self
    }

    /// Disable the filesystem watcher. The index is then only rebuilt on
    /// explicit requests, settings changes, and root switches.
    pub fn without_watcher(mut self) -> Self {
        self.watch_changes = false;
        self
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn compiler(&self) -> &RuleCompiler {
        &self.compiler
    }

    pub fn last_folders(&self) -> &LastFolderCache {
        &self.last_folders
    }

    /// Ignore rules for the current settings.
    pub fn rules(&self) -> IgnoreRuleSet {
        self.settings.get().rules(&self.compiler)
    }

    /// Start a session for `root`: build the index once, then keep it current.
    ///
    /// A failed first build or watcher start is logged; the session still
    /// starts and later rebuilds may succeed.
    pub async fn activate(&self, root: impl AsRef<Path>) -> Result<WorkspaceSession> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("Failed to resolve workspace root {}", root.display()))?;

        let state = Arc::new(SessionState {
            cache: FolderIndexCache::new(&root, self.strategy.clone()),
            settings: self.settings.clone(),
            compiler: self.compiler.clone(),
            filter: RwLock::new(ChangeFilter::new(
                &root,
                IgnoreRuleSet::empty(),
                WalkOptions::default(),
            )),
        });
        state.refresh_filter();

        if let Err(e) = state.rebuild_now().await {
            tracing::warn!("initial index of {} failed: {}", root.display(), e);
        }

        let worker = RebuildWorker::spawn(state.clone());
        let settings_task = spawn_settings_listener(state.clone(), worker.handle());

        let session = WorkspaceSession {
            state,
            worker,
            watch: Mutex::new(None),
            settings_task,
            watcher_config: self.watcher_config.clone(),
            watch_changes: self.watch_changes,
        };
        session.start_watching(&root);

        tracing::info!("activated workspace {}", root.display());
        Ok(session)
    }

    /// Forget the workspace's last selected folder and stop its session.
    pub async fn deactivate(&self, session: WorkspaceSession) {
        let root = session.root();
        self.last_folders.remove(&root);
        session.shutdown().await;
        tracing::info!("deactivated workspace {}", root.display());
    }
}

/// State shared between a session and its background tasks.
struct SessionState {
    cache: FolderIndexCache,
    settings: SettingsStore,
    compiler: Arc<RuleCompiler>,
    filter: RwLock<ChangeFilter>,
}

impl SessionState {
    fn current_rules(&self) -> (Arc<Settings>, IgnoreRuleSet, WalkOptions) {
        let settings = self.settings.get();
        let rules = settings.rules(&self.compiler);
        let options = settings.walk_options();
        (settings, rules, options)
    }

    fn refresh_filter(&self) {
        let (_, rules, options) = self.current_rules();
        let filter = ChangeFilter::new(self.cache.active_root(), rules, options);
        *self.filter.write().unwrap_or_else(|e| e.into_inner()) = filter;
    }

    fn accepts(&self, event: &crate::watcher::ChangeEvent) -> bool {
        self.filter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .accepts(event)
    }

    async fn rebuild_now(&self) -> Result<Arc<WorkspaceIndex>, IndexError> {
        let root = self.cache.active_root();
        let (_, rules, options) = self.current_rules();
        self.cache.rebuild(&root, &rules, &options).await
    }
}

impl Rebuild for SessionState {
    async fn rebuild(&self) -> Result<()> {
        match self.rebuild_now().await {
            Ok(_) => Ok(()),
            Err(IndexError::StaleRoot { built_for, .. }) => {
                tracing::debug!("discarded stale rebuild for {}", built_for.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Watcher plus the task forwarding its accepted events.
struct WatchTask {
    _watcher: FileSystemWatcher,
    forward: JoinHandle<()>,
}

impl Drop for WatchTask {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

/// A live workspace: its index, watcher, and rebuild worker.
pub struct WorkspaceSession {
    state: Arc<SessionState>,
    worker: RebuildWorker,
    watch: Mutex<Option<WatchTask>>,
    settings_task: JoinHandle<()>,
    watcher_config: WatcherConfig,
    watch_changes: bool,
}

impl std::fmt::Debug for WorkspaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSession")
            .field("root", &self.root())
            .finish_non_exhaustive()
    }
}

impl WorkspaceSession {
    pub fn root(&self) -> PathBuf {
        self.state.cache.active_root()
    }

    /// Last successfully built index, if any.
    pub fn index(&self) -> Option<Arc<WorkspaceIndex>> {
        self.state.cache.get()
    }

    pub fn cache(&self) -> &FolderIndexCache {
        &self.state.cache
    }

    /// Ignore rules and walk options for the current settings.
    pub fn rules(&self) -> (IgnoreRuleSet, WalkOptions) {
        let (_, rules, options) = self.state.current_rules();
        (rules, options)
    }

    /// Ask for a coalesced rebuild.
    pub fn request_rebuild(&self) -> bool {
        self.worker.request()
    }

    pub fn rebuild_handle(&self) -> RebuildHandle {
        self.worker.handle()
    }

    /// Move the session to a new root and rebuild immediately.
    ///
    /// The rebuild does not wait for queued work. Builds still running for
    /// the old root are discarded when they finish.
    pub async fn switch_root(&self, root: impl AsRef<Path>) -> Result<Arc<WorkspaceIndex>> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("Failed to resolve workspace root {}", root.display()))?;

        tracing::info!("workspace root changed to {}", root.display());

        self.state.cache.set_root(&root);
        self.state.refresh_filter();
        self.start_watching(&root);

        let index = self.state.rebuild_now().await?;
        Ok(index)
    }

    /// Stop watching and wait for the worker to finish its current rebuild.
    pub async fn shutdown(self) {
        self.settings_task.abort();
        self.watch
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.worker.shutdown().await;
    }

    fn start_watching(&self, root: &Path) {
        let mut slot = self.watch.lock().unwrap_or_else(|e| e.into_inner());
        // Stop the old watcher before the new one starts
        slot.take();

        if !self.watch_changes {
            return;
        }

        match FileSystemWatcher::new(root, self.watcher_config.clone()) {
            Ok((watcher, mut events)) => {
                let state = self.state.clone();
                let handle = self.worker.handle();
                let forward = tokio::spawn(async move {
                    while let Some(event) = events.recv().await {
                        if state.accepts(&event) {
                            tracing::debug!("directory change {}", event.path.display());
                            handle.request();
                        }
                    }
                });
                *slot = Some(WatchTask {
                    _watcher: watcher,
                    forward,
                });
            }
            Err(e) => {
                tracing::warn!("cannot watch {}: {:#}", root.display(), e);
            }
        }
    }
}

fn spawn_settings_listener(state: Arc<SessionState>, handle: RebuildHandle) -> JoinHandle<()> {
    let mut rx = state.settings.subscribe();
    tokio::spawn(async move {
        let mut previous = rx.borrow_and_update().clone();
        while rx.changed().await.is_ok() {
            let next = rx.borrow_and_update().clone();
            if previous.index_differs(&next) {
                tracing::debug!("ignore settings changed; rebuilding index");
                state.refresh_filter();
                handle.request();
            }
            previous = next;
        }
    })
}
