//! Create files and nested folders inside a workspace root.
//!
//! Input is a comma-separated list of targets relative to a destination
//! folder. Each target may contain sub-folders; a trailing `/` asks for the
//! folder only. Every target is checked against the root before anything is
//! written, and one failing target never stops its siblings.

use serde::{Serialize, Serializer};
use std::path::{Component, Path, PathBuf};

use crate::validation::{is_within_root, normalize_lexically};

/// Errors for a single target.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("path escapes workspace root: {0}")]
    PathEscape(PathBuf),

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("empty target")]
    EmptyTarget,

    #[error("workspace root is unavailable: {path}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MaterializeError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        MaterializeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    File,
    Directory,
}

/// One parsed target specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Specifier without leading or trailing `/`
    pub spec: String,
    pub kind: TargetKind,
}

/// Split raw input into targets.
///
/// Specifiers are separated by `,` and trimmed; empty ones are dropped.
/// A leading `/` is ignored; a trailing `/` marks a directory target.
pub fn parse_targets(input: &str) -> Vec<Target> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let kind = if s.ends_with('/') {
                TargetKind::Directory
            } else {
                TargetKind::File
            };
            Target {
                spec: s.trim_matches('/').to_string(),
                kind,
            }
        })
        .collect()
}

/// A path that exists after materializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    pub path: PathBuf,
    pub kind: TargetKind,
}

/// A target that could not be created.
#[derive(Debug, Serialize)]
pub struct TargetFailure {
    pub target: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: MaterializeError,
}

fn serialize_display<S: Serializer>(error: &MaterializeError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Outcome of one materialize request, in input order.
#[derive(Debug, Default, Serialize)]
pub struct MaterializeReport {
    pub created: Vec<Created>,
    pub failures: Vec<TargetFailure>,
}

impl MaterializeReport {
    /// Created files (directories excluded), in input order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.created
            .iter()
            .filter(|c| c.kind == TargetKind::File)
            .map(|c| c.path.as_path())
    }
}

/// Materialize `input` under `root/destination`.
///
/// `destination` is a folder relative to `root` in index form (`/`, `/src`).
///
/// # Errors
/// Returns [`MaterializeError::RootUnavailable`] if the root cannot be
/// resolved. Per-target problems are collected in
/// [`MaterializeReport::failures`].
pub async fn materialize(
    root: &Path,
    destination: &str,
    input: &str,
) -> Result<MaterializeReport, MaterializeError> {
    let real_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|source| MaterializeError::RootUnavailable {
            path: root.to_path_buf(),
            source,
        })?;

    let mut report = MaterializeReport::default();

    for target in parse_targets(input) {
        match materialize_target(&real_root, destination, &target).await {
            Ok(created) => {
                tracing::info!("created {}", created.path.display());
                report.created.push(created);
            }
            Err(error) => {
                tracing::warn!("unable to create {}: {}", target.spec, error);
                report.failures.push(TargetFailure {
                    target: target.spec,
                    error,
                });
            }
        }
    }

    Ok(report)
}

async fn materialize_target(
    root: &Path,
    destination: &str,
    target: &Target,
) -> Result<Created, MaterializeError> {
    if target.spec.is_empty() {
        return Err(MaterializeError::EmptyTarget);
    }

    let relative = Path::new(destination.trim_start_matches('/')).join(&target.spec);
    let absolute = normalize_lexically(&root.join(relative));

    if !is_within_root(&absolute, root) {
        return Err(MaterializeError::PathEscape(absolute));
    }
    if absolute == root {
        return Err(MaterializeError::EmptyTarget);
    }

    let components: Vec<Component<'_>> = match absolute.strip_prefix(root) {
        Ok(rel) => rel.components().collect(),
        Err(_) => return Err(MaterializeError::PathEscape(absolute.clone())),
    };

    let dir_count = match target.kind {
        TargetKind::Directory => components.len(),
        TargetKind::File => components.len().saturating_sub(1),
    };

    let mut current = root.to_path_buf();
    for component in &components[..dir_count] {
        current.push(component);
        ensure_directory(root, &current).await?;
    }

    if target.kind == TargetKind::Directory {
        return Ok(Created {
            path: absolute,
            kind: TargetKind::Directory,
        });
    }

    let created = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&absolute)
        .await;

    match created {
        Ok(_) => Ok(Created {
            path: absolute,
            kind: TargetKind::File,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(MaterializeError::AlreadyExists(absolute))
        }
        Err(e) => Err(MaterializeError::io(&absolute, e)),
    }
}

/// Make sure `path` is a directory whose real location is inside `root`.
async fn ensure_directory(root: &Path, path: &Path) -> Result<(), MaterializeError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            match tokio::fs::create_dir(path).await {
                Ok(()) => {
                    tracing::debug!("created directory {}", path.display());
                    return Ok(());
                }
                // Created concurrently; fall through to the checks below
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(MaterializeError::io(path, e)),
            }
        }
        Err(e) => return Err(MaterializeError::io(path, e)),
    }

    let real = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| MaterializeError::io(path, e))?;
    if !real.starts_with(root) {
        return Err(MaterializeError::PathEscape(real));
    }

    let metadata = tokio::fs::metadata(&real)
        .await
        .map_err(|e| MaterializeError::io(&real, e))?;
    if !metadata.is_dir() {
        return Err(MaterializeError::NotADirectory(path.to_path_buf()));
    }

    Ok(())
}

/// What to open after materializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenPolicy {
    /// `openAfterCreate`
    pub open_after: bool,
    /// `openAllCreated`
    pub open_all: bool,
}

/// Files to open and the one to focus. Directories are never opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenPlan {
    pub open: Vec<PathBuf>,
    pub focus: Option<PathBuf>,
}

impl OpenPlan {
    pub fn for_report(report: &MaterializeReport, policy: OpenPolicy) -> Self {
        let files: Vec<PathBuf> = report.files().map(Path::to_path_buf).collect();

        if !policy.open_after || files.is_empty() {
            return Self::default();
        }

        let focus = files.first().cloned();
        let open = if files.len() > 1 && policy.open_all {
            files
        } else {
            files.into_iter().take(1).collect()
        };

        Self { open, focus }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
