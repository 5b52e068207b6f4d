//! Change filtering and single-flight index rebuilds.
//!
//! [`ChangeFilter`] decides whether a filesystem event can affect the folder
//! index. [`RebuildWorker`] runs at most one rebuild at a time. A request that
//! arrives while a rebuild is running leaves exactly one follow-up queued;
//! further requests in that window are absorbed by it.
//!
//! # Coalescing
//!
//! Requests go through a bounded channel of capacity 1 using `try_send`:
//! - idle worker, empty slot: the request wakes the worker
//! - running worker, empty slot: the request fills the slot (the follow-up)
//! - slot already full: the request is dropped, the follow-up will see its
//!   changes anyway

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::{ChangeEvent, ChangeKind};
use crate::filter::IgnoreRuleSet;
use crate::validation::relative_entry;
use crate::walker::WalkOptions;

/// Directories whose churn never triggers a rebuild, whatever the rules say.
pub const NOISY_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    ".cache",
    "__pycache__",
    ".gradle",
    ".next",
    "target",
];

/// Placeholder name prefix the editor uses during interactive renames.
pub const TRANSIENT_PREFIX: &str = "untitled";

/// Whether an event concerns a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    Directory,
    File,
}

/// Classify a change.
///
/// An existing path is a directory change if it is a directory. A removed
/// path can no longer be inspected, so one without an extension is assumed
/// to have been a directory.
pub fn classify(event: &ChangeEvent) -> ChangeClass {
    let is_dir = match event.kind {
        ChangeKind::Changed => event.path.is_dir(),
        ChangeKind::Removed => event.path.extension().is_none(),
    };
    if is_dir {
        ChangeClass::Directory
    } else {
        ChangeClass::File
    }
}

/// Drops events that cannot change the folder index.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    root: PathBuf,
    rules: IgnoreRuleSet,
    options: WalkOptions,
}

impl ChangeFilter {
    pub fn new(root: impl Into<PathBuf>, rules: IgnoreRuleSet, options: WalkOptions) -> Self {
        Self {
            root: root.into(),
            rules,
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `event` should trigger a rebuild.
    ///
    /// Rejected:
    /// - paths outside the root, and the root itself
    /// - paths at or under a [`NOISY_DIRS`] directory
    /// - paths at or under an entry the active rules exclude
    /// - transient `untitled*` placeholders
    /// - changes that are not directory changes
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        let Some(relative) = relative_entry(&event.path, &self.root) else {
            return false;
        };

        let mut prefix = String::new();
        for name in relative.split('/').filter(|s| !s.is_empty()) {
            if NOISY_DIRS.contains(&name) {
                tracing::trace!("drop {}: noisy directory", relative);
                return false;
            }
            prefix.push('/');
            prefix.push_str(name);
            if self.options.skip_reason(&self.rules, &prefix, name).is_some() {
                tracing::trace!("drop {}: ignored", relative);
                return false;
            }
        }

        let is_transient = event
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().starts_with(TRANSIENT_PREFIX))
            .unwrap_or(false);
        if is_transient {
            tracing::trace!("drop {}: transient name", relative);
            return false;
        }

        classify(event) == ChangeClass::Directory
    }
}

/// A rebuild job run by [`RebuildWorker`].
pub trait Rebuild: Send + Sync + 'static {
    fn rebuild(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Cloneable handle for requesting rebuilds.
#[derive(Debug, Clone)]
pub struct RebuildHandle {
    tx: mpsc::Sender<()>,
}

impl RebuildHandle {
    /// Request a rebuild.
    ///
    /// Returns `true` if the request was queued, `false` if a queued rebuild
    /// already covers it or the worker has stopped.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                tracing::trace!("rebuild already queued");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Background task that runs rebuild requests one at a time.
#[derive(Debug)]
pub struct RebuildWorker {
    handle: RebuildHandle,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RebuildWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn<R: Rebuild>(job: Arc<R>) -> Self {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let (stop, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    msg = rx.recv() => {
                        if msg.is_none() {
                            break;
                        }
                        if let Err(e) = job.rebuild().await {
                            tracing::warn!("index rebuild failed: {:#}", e);
                        }
                    }
                }
            }
            tracing::debug!("rebuild worker stopped");
        });

        Self {
            handle: RebuildHandle { tx },
            stop,
            task,
        }
    }

    pub fn handle(&self) -> RebuildHandle {
        self.handle.clone()
    }

    /// Shorthand for `self.handle().request()`.
    pub fn request(&self) -> bool {
        self.handle.request()
    }

    /// Stop the worker. A rebuild already running completes first.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{MatchOptions, RuleCompiler};

    fn filter_for(root: &Path, patterns: &[&str]) -> ChangeFilter {
        let rules = RuleCompiler::new().compile(patterns.iter(), MatchOptions::default());
        ChangeFilter::new(root, rules, WalkOptions::default())
    }

    #[test]
    fn test_classify_removed_by_extension() {
        let removed_dir = ChangeEvent::new("/nowhere/gone", ChangeKind::Removed);
        let removed_file = ChangeEvent::new("/nowhere/gone.txt", ChangeKind::Removed);
        assert_eq!(classify(&removed_dir), ChangeClass::Directory);
        assert_eq!(classify(&removed_file), ChangeClass::File);
    }

    #[test]
    fn test_filter_drops_noise_and_ignored() {
        let root = Path::new("/proj");
        let filter = filter_for(root, &["build"]);

        assert!(!filter.accepts(&ChangeEvent::new("/proj/.git/refs", ChangeKind::Removed)));
        assert!(!filter.accepts(&ChangeEvent::new("/proj/src/target/debug", ChangeKind::Removed)));
        assert!(!filter.accepts(&ChangeEvent::new("/proj/build/out", ChangeKind::Removed)));
        assert!(!filter.accepts(&ChangeEvent::new("/proj/src/Untitled Folder", ChangeKind::Removed)));
        assert!(!filter.accepts(&ChangeEvent::new("/elsewhere/x", ChangeKind::Removed)));
        assert!(!filter.accepts(&ChangeEvent::new("/proj", ChangeKind::Removed)));
        assert!(filter.accepts(&ChangeEvent::new("/proj/src/old", ChangeKind::Removed)));
    }

    #[test]
    fn test_filter_existing_file_is_not_relevant() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir(root.join("lib")).unwrap();
        std::fs::write(root.join("notes"), "").unwrap();

        let filter = filter_for(root, &[]);
        assert!(filter.accepts(&ChangeEvent::observe(root.join("lib"))));
        assert!(!filter.accepts(&ChangeEvent::observe(root.join("notes"))));
    }
}
