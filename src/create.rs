//! The "new file" command.
//!
//! Two flows, chosen by [`Mode`]:
//! - select: pick a folder from the index, then type one or more names
//! - input: type paths relative to the workspace root
//!
//! Cancelling a prompt, or submitting nothing, ends the flow quietly.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Mode;
use crate::host::{Notification, Notifier, Opener, Prompt};
use crate::index::{DirectoryEntry, WorkspaceIndex};
use crate::materialize::{materialize, MaterializeError, MaterializeReport, OpenPlan};
use crate::workspace::{Extension, WorkspaceSession};

/// Destination used in input mode and as the first folder choice.
pub const ROOT_CHOICE: &str = "/";

/// Placeholder of the name prompt in select mode.
pub const FILE_NAME_PLACEHOLDER: &str = "File name";

#[derive(Debug)]
pub enum CreateOutcome {
    /// No workspace was open; the user was notified
    NoWorkspace,
    /// A prompt was dismissed or left empty
    Cancelled,
    Created {
        report: MaterializeReport,
        plan: OpenPlan,
    },
}

/// Run the create command against the current workspace.
///
/// # Errors
/// Only fails when the workspace root itself cannot be resolved. Problems
/// with individual targets are reported in the returned
/// [`MaterializeReport`].
pub async fn run_create(
    extension: &Extension,
    session: Option<&WorkspaceSession>,
    prompt: &dyn Prompt,
    notifier: &dyn Notifier,
    opener: &dyn Opener,
) -> Result<CreateOutcome, MaterializeError> {
    let Some(session) = session else {
        notifier.notify(&Notification::no_workspace());
        return Ok(CreateOutcome::NoWorkspace);
    };

    let settings = extension.settings().get();
    let root = session.root();

    let (destination, input) = match settings.mode {
        Mode::Select => {
            let last = if settings.cache_last_folder {
                extension.last_folders().get(&root)
            } else {
                None
            };
            let index = current_index(session).await;
            let entries = index.as_ref().map(|i| i.entries.as_slice()).unwrap_or(&[]);
            let choices = folder_choices(last.as_deref(), entries);

            let Some(folder) = non_empty(prompt.choose(&choices, "")) else {
                return Ok(CreateOutcome::Cancelled);
            };
            if settings.cache_last_folder {
                extension.last_folders().set(&root, folder.clone());
            }

            let Some(names) = non_empty(prompt.input(&folder, FILE_NAME_PLACEHOLDER)) else {
                return Ok(CreateOutcome::Cancelled);
            };
            (folder, names)
        }
        Mode::Input => {
            let Some(paths) = non_empty(prompt.input("", "")) else {
                return Ok(CreateOutcome::Cancelled);
            };
            (ROOT_CHOICE.to_string(), paths)
        }
    };

    let report = materialize(&root, &destination, &input).await?;
    let plan = OpenPlan::for_report(&report, settings.open_policy());
    apply_plan(&plan, opener);

    Ok(CreateOutcome::Created { report, plan })
}

/// Choice list for select mode.
///
/// Starts with `/`, or with `[last, "/"]` when a last folder other than `/`
/// is known, followed by the index entries. Duplicates keep their first
/// position.
pub fn folder_choices(last: Option<&str>, entries: &[DirectoryEntry]) -> Vec<String> {
    let head: Vec<&str> = match last {
        Some(last) if last != ROOT_CHOICE => vec![last, ROOT_CHOICE],
        _ => vec![ROOT_CHOICE],
    };

    let mut seen = HashSet::new();
    head.into_iter()
        .chain(entries.iter().map(|e| e.as_str()))
        .filter(|c| seen.insert(*c))
        .map(str::to_string)
        .collect()
}

/// Open everything in `plan`, focused file last.
pub fn apply_plan(plan: &OpenPlan, opener: &dyn Opener) {
    for path in &plan.open {
        if plan.focus.as_ref() != Some(path) {
            opener.open(path, false);
        }
    }
    if let Some(focus) = &plan.focus {
        opener.open(focus, true);
    }
}

/// Cached index, or a fresh walk when nothing has been built yet.
async fn current_index(session: &WorkspaceSession) -> Option<Arc<WorkspaceIndex>> {
    if let Some(index) = session.index() {
        return Some(index);
    }

    tracing::debug!("index not ready; walking {}", session.root().display());
    let root = session.root();
    let (rules, options) = session.rules();
    let walked = tokio::task::spawn_blocking(move || {
        WorkspaceIndex::build_blocking(&root, &rules, &options)
    })
    .await;

    match walked {
        Ok(Ok(index)) => Some(Arc::new(index)),
        Ok(Err(e)) => {
            tracing::warn!("fallback walk failed: {}", e);
            None
        }
        Err(e) => {
            tracing::warn!("fallback walk task failed: {}", e);
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(paths: &[&str]) -> Vec<DirectoryEntry> {
        paths
            .iter()
            .filter_map(|p| DirectoryEntry::from_relative(p))
            .collect()
    }

    #[test]
    fn test_choices_without_last() {
        let choices = folder_choices(None, &entries(&["/src", "/src/a"]));
        assert_eq!(choices, vec!["/", "/src", "/src/a"]);
    }

    #[test]
    fn test_choices_with_last_dedupes() {
        let choices = folder_choices(Some("/src/a"), &entries(&["/src", "/src/a"]));
        assert_eq!(choices, vec!["/src/a", "/", "/src"]);
    }

    #[test]
    fn test_choices_last_root_is_not_repeated() {
        let choices = folder_choices(Some("/"), &entries(&["/src"]));
        assert_eq!(choices, vec!["/", "/src"]);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("a".into())).as_deref(), Some("a"));
    }
}
