//! Last-known-good folder index for a workspace.
//!
//! [`FolderIndexCache`] holds the most recent successful build behind a tokio
//! `watch` channel: readers take a cheap synchronous snapshot, a rebuild swaps
//! the whole index in one step, and a failed rebuild leaves the previous index
//! untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::collate;
use crate::diagnostics::WalkDiagnostic;
use crate::enumerate::{EnumerationError, ExternalEnumerator};
use crate::filter::IgnoreRuleSet;
use crate::validation::relative_entry;
pub use crate::walker::DirectoryEntry;
use crate::walker::{self, WalkError, WalkOptions};

/// Errors from rebuilding the index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    /// The active root changed while this build was running
    #[error("index built for {built_for} discarded; active root is now {active}")]
    StaleRoot { built_for: PathBuf, active: PathBuf },

    #[error("index build task failed: {0}")]
    Join(String),
}

/// A built directory index for one workspace root.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceIndex {
    pub root: PathBuf,
    pub entries: Vec<DirectoryEntry>,
    pub built_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<WalkDiagnostic>,
}

impl WorkspaceIndex {
    /// Walk `root` on the calling thread.
    ///
    /// Used directly when no cached index is available yet.
    pub fn build_blocking(
        root: &Path,
        rules: &IgnoreRuleSet,
        options: &WalkOptions,
    ) -> Result<Self, WalkError> {
        let report = walker::walk(root, rules, options)?;
        Ok(Self {
            root: root.to_path_buf(),
            entries: report.entries,
            built_at: Utc::now(),
            diagnostics: report.diagnostics,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e.as_str() == entry)
    }
}

/// How a rebuild enumerates directories.
#[derive(Debug, Clone, Default)]
pub enum IndexStrategy {
    /// In-process recursive walk
    #[default]
    Walk,
    /// External `find` process, filtered afterwards
    External(ExternalEnumerator),
}

/// Per-workspace index state.
#[derive(Debug)]
pub struct FolderIndexCache {
    active_root: Mutex<PathBuf>,
    index: watch::Sender<Option<Arc<WorkspaceIndex>>>,
    strategy: IndexStrategy,
}

impl FolderIndexCache {
    /// Empty cache for `root`. Nothing is built until [`Self::rebuild`].
    pub fn new(root: impl Into<PathBuf>, strategy: IndexStrategy) -> Self {
        let (index, _) = watch::channel(None);
        Self {
            active_root: Mutex::new(root.into()),
            index,
            strategy,
        }
    }

    /// Last successfully built index, if any. Never blocks on a rebuild.
    pub fn get(&self) -> Option<Arc<WorkspaceIndex>> {
        self.index.borrow().clone()
    }

    /// Receiver notified every time a new index is stored.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<WorkspaceIndex>>> {
        self.index.subscribe()
    }

    pub fn active_root(&self) -> PathBuf {
        self.active_root
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Point the cache at a new root and drop the index built for the old one.
    ///
    /// Builds still running for the old root are discarded when they finish.
    pub fn set_root(&self, root: impl Into<PathBuf>) {
        let root = root.into();
        let mut active = self.active_root.lock().unwrap_or_else(|e| e.into_inner());
        if *active == root {
            return;
        }
        *active = root;
        self.index.send_replace(None);
    }

    /// Build a fresh index for `root` and store it.
    ///
    /// # Errors
    /// On failure the previously stored index stays in place. A build whose
    /// root is no longer the active root returns [`IndexError::StaleRoot`]
    /// and is not stored.
    pub async fn rebuild(
        &self,
        root: &Path,
        rules: &IgnoreRuleSet,
        options: &WalkOptions,
    ) -> Result<Arc<WorkspaceIndex>, IndexError> {
        let started = std::time::Instant::now();

        let built = match &self.strategy {
            IndexStrategy::Walk => {
                let root = root.to_path_buf();
                let rules = rules.clone();
                let options = options.clone();
                tokio::task::spawn_blocking(move || {
                    WorkspaceIndex::build_blocking(&root, &rules, &options)
                })
                .await
                .map_err(|e| IndexError::Join(e.to_string()))??
            }
            IndexStrategy::External(enumerator) => {
                build_external(enumerator, root, rules, options).await?
            }
        };

        let built = Arc::new(built);
        {
            // Root check and store happen under the lock `set_root` takes
            let active = self.active_root.lock().unwrap_or_else(|e| e.into_inner());
            if *active != root {
                tracing::debug!(
                    "discarding index for {} (active root {})",
                    root.display(),
                    active.display()
                );
                return Err(IndexError::StaleRoot {
                    built_for: root.to_path_buf(),
                    active: active.clone(),
                });
            }
            self.index.send_replace(Some(built.clone()));
        }

        tracing::info!(
            "indexed {} directories under {} in {:?}",
            built.len(),
            root.display(),
            started.elapsed()
        );
        Ok(built)
    }
}

async fn build_external(
    enumerator: &ExternalEnumerator,
    root: &Path,
    rules: &IgnoreRuleSet,
    options: &WalkOptions,
) -> Result<WorkspaceIndex, IndexError> {
    let prune = if rules.is_empty() {
        options.default_ignore_names.clone()
    } else {
        rules.literal_names()
    };

    let output = enumerator.enumerate(root, &prune).await?;
    let mut entries = filter_enumerated(root, &output.directories, rules, options);
    collate::sort(&mut entries);

    Ok(WorkspaceIndex {
        root: root.to_path_buf(),
        entries,
        built_at: Utc::now(),
        diagnostics: Vec::new(),
    })
}

/// Apply the full rule set to externally enumerated paths.
///
/// A path is kept only if no prefix of it is excluded, which matches the
/// subtree pruning of the in-process walk.
fn filter_enumerated(
    root: &Path,
    directories: &[PathBuf],
    rules: &IgnoreRuleSet,
    options: &WalkOptions,
) -> Vec<DirectoryEntry> {
    let mut seen = std::collections::HashSet::new();

    directories
        .iter()
        .filter_map(|dir| relative_entry(dir, root))
        .filter(|relative| {
            let mut prefix = String::new();
            for name in relative.split('/').filter(|s| !s.is_empty()) {
                prefix.push('/');
                prefix.push_str(name);
                if options.skip_reason(rules, &prefix, name).is_some() {
                    return false;
                }
            }
            true
        })
        .filter_map(|relative| DirectoryEntry::from_relative(&relative))
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}
