//! Filesystem change notifications for a workspace root.
//!
//! Wraps a debounced `notify` watcher. Each debounce window is de-duplicated
//! and sorted, then forwarded one [`ChangeEvent`] at a time into a tokio
//! channel so async consumers can await changes.

pub mod coalescer;

pub use coalescer::{classify, ChangeFilter, Rebuild, RebuildHandle, RebuildWorker, NOISY_DIRS};

use anyhow::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Created or modified; the path exists
    Changed,
    /// The path no longer exists
    Removed,
}

/// A single filesystem change under the watched root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Build an event for `path`, reading its kind from the filesystem.
    pub fn observe(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = if std::fs::symlink_metadata(&path).is_ok() {
            ChangeKind::Changed
        } else {
            ChangeKind::Removed
        };
        Self { path, kind }
    }
}

/// Filesystem watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce delay in milliseconds
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

/// Recursive watcher over one workspace root.
///
/// Watching stops when the value is dropped.
pub struct FileSystemWatcher {
    root: PathBuf,
    _debouncer: Debouncer<notify::RecommendedWatcher>,
}

impl std::fmt::Debug for FileSystemWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileSystemWatcher {
    /// Start watching `root` recursively.
    ///
    /// # Returns
    /// The watcher handle and the receiving end of its event stream. The
    /// stream ends when the watcher is dropped.
    pub fn new(
        root: impl Into<PathBuf>,
        config: WatcherConfig,
    ) -> Result<(Self, UnboundedReceiver<ChangeEvent>)> {
        let root = root.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let debounce_duration = Duration::from_millis(config.debounce_ms);
        let mut debouncer = new_debouncer(debounce_duration, move |result: DebounceEventResult| {
            match result {
                Ok(events) => forward_events(&events, &tx),
                Err(error) => tracing::warn!("watcher error: {:?}", error),
            }
        })?;

        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!("watching {}", root.display());

        Ok((
            Self {
                root,
                _debouncer: debouncer,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// De-duplicate one debounce window and forward it in path order.
fn forward_events(events: &[DebouncedEvent], tx: &UnboundedSender<ChangeEvent>) {
    let paths: BTreeSet<&Path> = events.iter().map(|e| e.path.as_path()).collect();

    for path in paths {
        let event = ChangeEvent::observe(path);
        tracing::trace!("change {:?} {}", event.kind, event.path.display());
        if tx.send(event).is_err() {
            // Receiver dropped; nothing left to notify
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_kind() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let existing = temp_dir.path().join("a");
        std::fs::create_dir(&existing).unwrap();

        assert_eq!(ChangeEvent::observe(&existing).kind, ChangeKind::Changed);
        assert_eq!(
            ChangeEvent::observe(temp_dir.path().join("gone")).kind,
            ChangeKind::Removed
        );
    }

    #[test]
    fn test_default_debounce() {
        assert_eq!(WatcherConfig::default().debounce_ms, 500);
    }
}
