//! Editor-side collaborators used by the create flow.
//!
//! The library never talks to a user directly. A host (an editor
//! integration, or the terminal front end in the `foldex` binary) supplies
//! these implementations.

use std::path::Path;

/// A dismissible message with action buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub actions: Vec<String>,
}

impl Notification {
    /// Shown when the create command runs without an open workspace.
    pub fn no_workspace() -> Self {
        Self {
            title: "No Workspace found".to_string(),
            body: "First you need to create a new project or open an existing one to create files"
                .to_string(),
            actions: vec!["OK".to_string()],
        }
    }
}

/// Interactive prompts. `None` means the user cancelled.
pub trait Prompt: Send + Sync {
    /// Let the user pick one of `choices`.
    fn choose(&self, choices: &[String], placeholder: &str) -> Option<String>;

    /// Ask for free text.
    fn input(&self, message: &str, placeholder: &str) -> Option<String>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Opens created files in the editor.
pub trait Opener: Send + Sync {
    /// Open `path`; `focus` brings it to the front.
    fn open(&self, path: &Path, focus: bool);
}
