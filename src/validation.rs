//! Path normalization and root containment checks.
//!
//! Every write the materializer performs goes through these checks first.
//! Containment is a component-wise prefix comparison on normalized absolute
//! paths, so a root folder name that happens to appear elsewhere in a path
//! never counts as "inside".

use std::path::{Component, Path, PathBuf};

/// Error types for path validation.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    /// Path cannot be canonicalized (doesn't exist or permission denied)
    #[error("cannot canonicalize path: {0}")]
    CannotCanonicalize(String),

    /// Resolved path escapes the workspace root
    #[error("path escapes workspace root: {0} (root: {1})")]
    OutsideRoot(String, String),
}

/// Canonicalize a path using std::fs::canonicalize.
///
/// Resolves all symlinks, `..`, and `.` components. Fails if the path doesn't
/// exist or cannot be accessed.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, PathValidationError> {
    std::fs::canonicalize(path).map_err(|_| {
        PathValidationError::CannotCanonicalize(path.to_string_lossy().to_string())
    })
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the top of an absolute path stays at the root; `..` at the top of
/// a relative path is kept so callers can see the escape.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            c => out.push(c),
        }
    }

    out.iter().map(|c| c.as_os_str()).collect()
}

/// Whether `path` lies inside `root` (or is `root` itself), compared lexically.
///
/// Both paths should be absolute. Neither needs to exist.
pub fn is_within_root(path: &Path, root: &Path) -> bool {
    normalize_lexically(path).starts_with(normalize_lexically(root))
}

/// Validate that an existing path is within the given root directory.
///
/// Canonicalizes both sides, so links that point out of the root are caught.
/// Returns the canonical path on success.
pub fn validate_path_within_root(path: &Path, root: &Path) -> Result<PathBuf, PathValidationError> {
    let canonical_path = canonicalize_path(path)?;
    let canonical_root = canonicalize_path(root)?;

    if !canonical_path.starts_with(&canonical_root) {
        return Err(PathValidationError::OutsideRoot(
            canonical_path.to_string_lossy().to_string(),
            canonical_root.to_string_lossy().to_string(),
        ));
    }

    Ok(canonical_path)
}

/// Express `path` relative to `root` in index form: leading `/`, forward
/// slashes, no trailing slash.
///
/// Returns `None` for the root itself, for paths outside it, and for paths
/// with a component that is not valid UTF-8.
pub fn relative_entry(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts: Vec<&str> = Vec::new();
    for component in rel.components() {
        if let Component::Normal(s) = component {
            parts.push(s.to_str()?);
        }
    }

    if parts.is_empty() {
        return None;
    }

    Some(format!("/{}", parts.join("/")))
}

/// Like [`relative_entry`], but lossy. For messages only, never for targets.
pub fn relative_display(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_relative_entry_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/proj");
        let path = root.join(OsStr::from_bytes(b"bad\xff")).join("x");
        assert_eq!(relative_entry(&path, root), None);
        assert_eq!(relative_display(&path, root), "/bad\u{FFFD}/x");
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(normalize_lexically(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_lexically(Path::new("/a/./b/")), PathBuf::from("/a/b"));
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_lexically(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_lexically(Path::new("a/../../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_is_within_root() {
        let root = Path::new("/proj");
        assert!(is_within_root(Path::new("/proj/src/a.txt"), root));
        assert!(is_within_root(Path::new("/proj"), root));
        assert!(!is_within_root(Path::new("/proj/../outside.txt"), root));
        assert!(!is_within_root(Path::new("/projection/a"), root));
    }

    #[test]
    fn test_root_name_elsewhere_in_path_is_not_inside() {
        let root = Path::new("/home/me/proj");
        assert!(!is_within_root(Path::new("/tmp/proj/file"), root));
        assert!(!is_within_root(Path::new("/home/me/proj/../other/proj/x"), root));
    }

    #[test]
    fn test_validate_path_within_root_valid() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let file_path = root.join("note.txt");
        fs::write(&file_path, b"x").unwrap();

        let result = validate_path_within_root(&file_path, root);
        assert!(result.is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_path_within_root_link_outside() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let link = temp_dir.path().join("out");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let result = validate_path_within_root(&link, temp_dir.path());
        assert!(matches!(result, Err(PathValidationError::OutsideRoot(_, _))));
    }

    #[test]
    fn test_relative_entry() {
        let root = Path::new("/proj");
        assert_eq!(relative_entry(Path::new("/proj/src/a"), root).as_deref(), Some("/src/a"));
        assert_eq!(relative_entry(Path::new("/proj"), root), None);
        assert_eq!(relative_entry(Path::new("/other"), root), None);
    }
}
