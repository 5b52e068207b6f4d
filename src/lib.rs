//! Ignore-aware folder index and safe nested file creation.
//!
//! foldex keeps a sorted, filtered list of every directory under a project
//! root and creates files (and the folders leading to them) inside that
//! root on request.
//!
//! - [`filter`]: ignore rules with `*` wildcards and `!` negation
//! - [`walker`]: one full, link-cycle-safe walk of a tree
//! - [`index`]: the last-known-good index and its rebuilds
//! - [`watcher`]: change notifications and coalesced rebuilds
//! - [`materialize`]: creating targets without leaving the root
//! - [`workspace`] / [`create`]: the session and command that tie it together

pub mod collate;
pub mod config;
pub mod create;
pub mod diagnostics;
pub mod enumerate;
pub mod filter;
pub mod host;
pub mod index;
pub mod materialize;
pub mod output;
pub mod validation;
pub mod version;
pub mod walker;
pub mod watcher;
pub mod workspace;

pub use config::{ConfigError, Mode, Settings, SettingsStore};
pub use create::{run_create, CreateOutcome};
pub use diagnostics::{DiagnosticStage, SkipReason, WalkDiagnostic};
pub use enumerate::{EnumerationError, EnumerationOutput, ExternalEnumerator};
pub use filter::{is_ignored, IgnoreRule, IgnoreRuleSet, MatchOptions, RuleCompiler, DEFAULT_IGNORE_NAMES};
pub use host::{Notification, Notifier, Opener, Prompt};
pub use index::{DirectoryEntry, FolderIndexCache, IndexError, IndexStrategy, WorkspaceIndex};
pub use materialize::{
    materialize, parse_targets, MaterializeError, MaterializeReport, OpenPlan, OpenPolicy, TargetKind,
};
pub use output::OutputFormat;
pub use validation::{is_within_root, normalize_lexically, validate_path_within_root, PathValidationError};
pub use walker::{walk, WalkError, WalkOptions, WalkReport};
pub use watcher::{ChangeEvent, ChangeKind, FileSystemWatcher, WatcherConfig};
pub use workspace::{Extension, LastFolderCache, WorkspaceSession};
