//! Recursive directory enumeration for the folder index.
//!
//! Walks every directory under a root, following symbolic links, and prunes
//! whole subtrees that the active ignore rules exclude. The result is sorted
//! with [`crate::collate`], so two walks over an unchanged tree produce the
//! same list.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::collate;
use crate::diagnostics::{DiagnosticStage, SkipReason, WalkDiagnostic};
use crate::filter::{IgnoreRuleSet, DEFAULT_IGNORE_NAMES};
use crate::validation::{relative_display, relative_entry};

/// A directory path relative to the workspace root.
///
/// Always starts with `/`, uses `/` separators, never ends with `/`, and is
/// never the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryEntry(String);

impl DirectoryEntry {
    /// Normalize a relative path into entry form.
    ///
    /// Returns `None` for the root (`""`, `"/"`) and for paths with `.` or
    /// `..` components.
    pub fn from_relative(path: &str) -> Option<Self> {
        let unified = path.replace('\\', "/");
        let mut parts = Vec::new();
        for part in unified.split('/') {
            match part {
                "" => continue,
                "." | ".." => return None,
                p => parts.push(p),
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self(format!("/{}", parts.join("/"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path component.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Resolve against a root directory.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        root.join(self.0.trim_start_matches('/'))
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DirectoryEntry {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that prevent a walk from producing any result.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("workspace root is unreadable: {path}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Walk options that do not come from the rule set.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Exclude every entry whose name starts with `.`
    pub ignore_hidden: bool,
    /// Names pruned when the rule set is empty
    pub default_ignore_names: Vec<String>,
    /// Descend into symbolic links to directories
    pub follow_links: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            ignore_hidden: false,
            default_ignore_names: DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect(),
            follow_links: true,
        }
    }
}

impl WalkOptions {
    /// Why an entry is pruned, if it is.
    pub fn skip_reason(&self, rules: &IgnoreRuleSet, relative: &str, name: &str) -> Option<SkipReason> {
        if self.ignore_hidden && name.starts_with('.') {
            return Some(SkipReason::Hidden);
        }
        if rules.is_empty() {
            if self.default_ignore_names.iter().any(|n| n == name) {
                return Some(SkipReason::IgnoredByDefault);
            }
            return None;
        }
        if rules.is_ignored(relative, name, false) {
            return Some(SkipReason::IgnoredByRule);
        }
        None
    }
}

/// Result of a completed walk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkReport {
    /// Sorted directory entries
    pub entries: Vec<DirectoryEntry>,
    /// Pruned subtrees and unreadable directories, sorted by path
    pub diagnostics: Vec<WalkDiagnostic>,
}

impl WalkReport {
    /// Number of subtrees that could not be read.
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

/// Walk all directories under `root`.
///
/// # Behavior
/// - Excluded directories are pruned with their whole subtree
/// - Symbolic links are followed; a real path is visited at most once, so
///   link cycles terminate
/// - An unreadable subdirectory aborts only its own subtree and is recorded
///   as an error diagnostic
///
/// # Errors
/// Returns [`WalkError`] when the root itself is missing, unreadable, or not
/// a directory.
pub fn walk(root: &Path, rules: &IgnoreRuleSet, options: &WalkOptions) -> Result<WalkReport, WalkError> {
    let metadata = std::fs::metadata(root).map_err(|source| WalkError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()));
    }
    std::fs::read_dir(root).map_err(|source| WalkError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut visited: HashSet<PathBuf> = HashSet::new();
    if let Ok(real_root) = std::fs::canonicalize(root) {
        visited.insert(real_root);
    }

    let mut entries: Vec<DirectoryEntry> = Vec::new();
    let mut diagnostics: Vec<WalkDiagnostic> = Vec::new();

    let mut it = walkdir::WalkDir::new(root)
        .follow_links(options.follow_links)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    loop {
        let entry = match it.next() {
            None => break,
            Some(Ok(entry)) => entry,
            Some(Err(err)) => {
                diagnostics.push(error_diagnostic(root, &err));
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            let shown = relative_display(entry.path(), root);
            tracing::warn!("skip {}: name is not valid UTF-8", shown);
            diagnostics.push(WalkDiagnostic::skipped(shown, SkipReason::InvalidName));
            it.skip_current_dir();
            continue;
        };
        let Some(relative) = relative_entry(entry.path(), root) else {
            continue;
        };

        if let Some(reason) = options.skip_reason(rules, &relative, name) {
            tracing::debug!("skip {}: {}", relative, reason);
            diagnostics.push(WalkDiagnostic::skipped(relative, reason));
            it.skip_current_dir();
            continue;
        }

        match std::fs::canonicalize(entry.path()) {
            Ok(real) => {
                if !visited.insert(real) {
                    diagnostics.push(WalkDiagnostic::skipped(relative, SkipReason::AlreadyVisited));
                    it.skip_current_dir();
                    continue;
                }
            }
            Err(e) => {
                diagnostics.push(WalkDiagnostic::error(
                    relative,
                    DiagnosticStage::Resolve,
                    e.to_string(),
                ));
                it.skip_current_dir();
                continue;
            }
        }

        if let Some(entry) = DirectoryEntry::from_relative(&relative) {
            entries.push(entry);
        }
    }

    collate::sort(&mut entries);
    diagnostics.sort();

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        tracing::warn!("walk of {} skipped {} unreadable subtree(s)", root.display(), errors);
    }

    Ok(WalkReport {
        entries,
        diagnostics,
    })
}

fn error_diagnostic(root: &Path, err: &walkdir::Error) -> WalkDiagnostic {
    let path = err
        .path()
        .map(|p| relative_display(p, root))
        .unwrap_or_else(|| "/".to_string());

    let stage = if err.loop_ancestor().is_some() {
        DiagnosticStage::LinkCycle
    } else {
        DiagnosticStage::ReadDir
    };

    let message = match err.io_error() {
        Some(io) => io.to_string(),
        None => err.to_string(),
    };

    tracing::debug!("walk error at {}: {}", path, message);
    WalkDiagnostic::error(path, stage, message)
}
