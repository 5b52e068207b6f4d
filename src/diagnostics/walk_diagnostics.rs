//! Walk diagnostics for skip reasons and unreadable subtrees.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Reason why a directory was left out of the index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Name starts with `.` and hidden entries are ignored
    Hidden,
    /// Matched by a user ignore rule
    IgnoredByRule,
    /// Matched by the built-in default ignore names
    IgnoredByDefault,
    /// Real path was already visited through another link
    AlreadyVisited,
    /// Name is not valid UTF-8 and cannot be shown or targeted
    InvalidName,
}

impl SkipReason {
    /// Stable sort key for deterministic ordering.
    pub fn sort_key(&self) -> u8 {
        match self {
            SkipReason::Hidden => 0,
            SkipReason::IgnoredByDefault => 1,
            SkipReason::IgnoredByRule => 2,
            SkipReason::AlreadyVisited => 3,
            SkipReason::InvalidName => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::Hidden => "hidden entry",
            SkipReason::IgnoredByRule => "matched by ignore rule",
            SkipReason::IgnoredByDefault => "default ignore name",
            SkipReason::AlreadyVisited => "already visited",
            SkipReason::InvalidName => "name is not valid UTF-8",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Where in the walk an error happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DiagnosticStage {
    /// Listing a directory failed
    ReadDir,
    /// Resolving a link or real path failed
    Resolve,
    /// Following links led back to an ancestor
    LinkCycle,
}

impl DiagnosticStage {
    pub fn sort_key(&self) -> u8 {
        match self {
            DiagnosticStage::ReadDir => 0,
            DiagnosticStage::Resolve => 1,
            DiagnosticStage::LinkCycle => 2,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticStage::ReadDir => "reading directory",
            DiagnosticStage::Resolve => "resolving path",
            DiagnosticStage::LinkCycle => "following link",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for DiagnosticStage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticStage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A diagnostic event from a directory walk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum WalkDiagnostic {
    /// Directory (and its subtree) was pruned
    Skipped {
        /// Path relative to root, starting with `/`
        path: String,
        reason: SkipReason,
    },
    /// Subtree could not be read; the rest of the walk continued
    Error {
        path: String,
        stage: DiagnosticStage,
        message: String,
    },
}

impl WalkDiagnostic {
    pub fn path(&self) -> &str {
        match self {
            WalkDiagnostic::Skipped { path, .. } => path,
            WalkDiagnostic::Error { path, .. } => path,
        }
    }

    /// Stable sort key: path, then Error before Skipped, then stage/reason.
    pub fn sort_key(&self) -> (&str, u8, u8) {
        match self {
            WalkDiagnostic::Error { path, stage, .. } => (path, 0, stage.sort_key()),
            WalkDiagnostic::Skipped { path, reason } => (path, 1, reason.sort_key()),
        }
    }

    pub fn skipped(path: String, reason: SkipReason) -> Self {
        WalkDiagnostic::Skipped { path, reason }
    }

    pub fn error(path: String, stage: DiagnosticStage, message: String) -> Self {
        WalkDiagnostic::Error {
            path,
            stage,
            message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, WalkDiagnostic::Error { .. })
    }

    /// Format for human-readable stderr output.
    ///
    /// Examples:
    /// - "SKIP /node_modules: matched by ignore rule"
    /// - "ERROR /private: reading directory: permission denied"
    pub fn format_stderr(&self) -> String {
        match self {
            WalkDiagnostic::Skipped { path, reason } => {
                format!("SKIP {}: {}", path, reason)
            }
            WalkDiagnostic::Error {
                path,
                stage,
                message,
            } => {
                format!("ERROR {}: {}: {}", path, stage, message)
            }
        }
    }
}

impl fmt::Display for WalkDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_stderr())
    }
}

impl PartialOrd for WalkDiagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WalkDiagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
