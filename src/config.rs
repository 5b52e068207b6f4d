//! User settings and their change notifications.
//!
//! Settings are read from a JSON file with camelCase keys. Every key is
//! optional. A [`SettingsStore`] hands out synchronous snapshots and lets
//! long-running sessions observe updates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use crate::filter::{IgnoreRuleSet, MatchOptions, RuleCompiler};
use crate::materialize::OpenPolicy;
use crate::walker::WalkOptions;

/// File looked up in the workspace root when no config path is given.
pub const CONFIG_FILE_NAME: &str = ".foldex.json";

/// Errors from loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// How the create flow asks for a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Pick a folder from the index, then type a file name
    #[default]
    Select,
    /// Type a full path relative to the workspace root
    Input,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Select => "Folder select",
            Mode::Input => "Write path",
        }
    }

    /// `"Folder select"` selects; any other value means input mode.
    pub fn from_setting(value: &str) -> Self {
        if value == "Folder select" {
            Mode::Select
        } else {
            Mode::Input
        }
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = String::deserialize(d)?;
        Ok(Mode::from_setting(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub mode: Mode,
    pub ignore_hidden_entries: bool,
    pub open_after_create: bool,
    pub open_all_created: bool,
    pub cache_last_folder: bool,
    pub verbose_logging: bool,
    /// Newline-separated ignore rules
    pub ignore_patterns: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Select,
            ignore_hidden_entries: false,
            open_after_create: true,
            open_all_created: false,
            cache_last_folder: true,
            verbose_logging: false,
            ignore_patterns: String::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Load from `explicit` if given, else from `<root>/.foldex.json` if it
    /// exists, else defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!("loading settings from {}", candidate.display());
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }

    /// Ignore rules from `ignorePatterns`.
    pub fn rules(&self, compiler: &RuleCompiler) -> IgnoreRuleSet {
        compiler.compile_text(&self.ignore_patterns, MatchOptions::default())
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            ignore_hidden: self.ignore_hidden_entries,
            ..WalkOptions::default()
        }
    }

    pub fn open_policy(&self) -> OpenPolicy {
        OpenPolicy {
            open_after: self.open_after_create,
            open_all: self.open_all_created,
        }
    }

    /// Whether switching from `self` to `other` changes what the index holds.
    pub fn index_differs(&self, other: &Settings) -> bool {
        self.ignore_hidden_entries != other.ignore_hidden_entries
            || self.ignore_patterns != other.ignore_patterns
    }
}

/// Shared, observable settings.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<Arc<Settings>>>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        let (tx, _) = watch::channel(Arc::new(settings));
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<Settings> {
        self.tx.borrow().clone()
    }

    /// Receiver that wakes on every update.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.tx.subscribe()
    }

    /// Publish a new snapshot.
    pub fn replace(&self, settings: Settings) {
        self.tx.send_replace(Arc::new(settings));
    }

    /// Modify a copy of the current settings and publish it.
    pub fn update<F>(&self, updater: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut next = (*self.get()).clone();
        updater(&mut next);
        self.replace(next);
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.mode, Mode::Select);
        assert!(settings.open_after_create);
        assert!(settings.cache_last_folder);
    }

    #[test]
    fn test_mode_values() {
        let s = Settings::from_json(r#"{"mode": "Folder select"}"#).unwrap();
        assert_eq!(s.mode, Mode::Select);
        let s = Settings::from_json(r#"{"mode": "Write path"}"#).unwrap();
        assert_eq!(s.mode, Mode::Input);
        let s = Settings::from_json(r#"{"mode": "anything"}"#).unwrap();
        assert_eq!(s.mode, Mode::Input);
    }

    #[test]
    fn test_camel_case_keys() {
        let s = Settings::from_json(
            r#"{"ignoreHiddenEntries": true, "openAllCreated": true, "ignorePatterns": "a\nb"}"#,
        )
        .unwrap();
        assert!(s.ignore_hidden_entries);
        assert!(s.open_all_created);
        assert_eq!(s.rules(&RuleCompiler::new()).len(), 2);
    }

    #[test]
    fn test_discover_prefers_explicit_then_root_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();
        assert_eq!(Settings::discover(root, None).unwrap(), Settings::default());

        std::fs::write(root.join(CONFIG_FILE_NAME), r#"{"verboseLogging": true}"#).unwrap();
        assert!(Settings::discover(root, None).unwrap().verbose_logging);

        let explicit = root.join("other.json");
        std::fs::write(&explicit, "not json").unwrap();
        assert!(matches!(
            Settings::discover(root, Some(&explicit)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_update_notifies() {
        let store = SettingsStore::default();
        let mut rx = store.subscribe();
        store.update(|s| s.ignore_patterns = "build".to_string());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().ignore_patterns, "build");
        assert_eq!(store.get().ignore_patterns, "build");
    }
}
