//! Integration tests for creating targets on disk.

use foldex::{materialize, MaterializeError, OpenPlan, OpenPolicy, TargetKind};
use std::fs;
use tempfile::TempDir;

fn project() -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap().join("proj");
    fs::create_dir_all(root.join("src")).unwrap();
    (temp_dir, root)
}

#[tokio::test]
async fn test_multiple_targets_with_nested_folder() {
    let (_guard, root) = project();

    let report = materialize(&root, "/src", "foo.txt, bar/baz.txt").await.unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.created[0].path, root.join("src/foo.txt"));
    assert_eq!(report.created[1].path, root.join("src/bar/baz.txt"));
    assert!(root.join("src/bar").is_dir());
    assert!(root.join("src/bar/baz.txt").is_file());

    let plan = OpenPlan::for_report(
        &report,
        OpenPolicy {
            open_after: true,
            open_all: true,
        },
    );
    assert_eq!(plan.open.len(), 2);
    assert_eq!(plan.focus, Some(root.join("src/foo.txt")));
}

#[tokio::test]
async fn test_trailing_slash_creates_directory_only() {
    let (_guard, root) = project();

    let report = materialize(&root, "/src", "sub/").await.unwrap();

    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].kind, TargetKind::Directory);
    assert!(root.join("src/sub").is_dir());
    assert_eq!(fs::read_dir(root.join("src/sub")).unwrap().count(), 0);

    let plan = OpenPlan::for_report(
        &report,
        OpenPolicy {
            open_after: true,
            open_all: true,
        },
    );
    assert!(plan.is_empty());
}

#[tokio::test]
async fn test_existing_file_is_not_truncated() {
    let (_guard, root) = project();
    fs::write(root.join("src/keep.txt"), "original").unwrap();

    let report = materialize(&root, "/src", "keep.txt, fresh.txt").await.unwrap();

    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].path, root.join("src/fresh.txt"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, "keep.txt");
    assert!(matches!(report.failures[0].error, MaterializeError::AlreadyExists(_)));
    assert_eq!(fs::read_to_string(root.join("src/keep.txt")).unwrap(), "original");
}

#[tokio::test]
async fn test_existing_directories_are_reused() {
    let (_guard, root) = project();
    fs::create_dir_all(root.join("src/deep")).unwrap();

    let report = materialize(&root, "/", "src/deep/x.rs, src/deep/").await.unwrap();
    assert!(report.failures.is_empty());
    assert!(root.join("src/deep/x.rs").is_file());
}

#[tokio::test]
async fn test_file_in_the_way_of_a_folder() {
    let (_guard, root) = project();
    fs::write(root.join("src/notes"), "").unwrap();

    let report = materialize(&root, "/src", "notes/todo.md, ok.md").await.unwrap();
    assert!(matches!(report.failures[0].error, MaterializeError::NotADirectory(_)));
    assert!(root.join("src/ok.md").is_file());
}

#[tokio::test]
async fn test_leading_slash_is_relative_to_destination() {
    let (_guard, root) = project();

    let report = materialize(&root, "src", "/main.rs").await.unwrap();
    assert_eq!(report.created[0].path, root.join("src/main.rs"));
}

#[tokio::test]
async fn test_empty_input_creates_nothing() {
    let (_guard, root) = project();

    let report = materialize(&root, "/", " , ,").await.unwrap();
    assert!(report.created.is_empty());
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_missing_root_is_error() {
    let (guard, _) = project();
    let result = materialize(&guard.path().join("gone"), "/", "a.txt").await;
    assert!(matches!(result, Err(MaterializeError::RootUnavailable { .. })));
}

#[tokio::test]
async fn test_concurrent_requests_create_once() {
    let (_guard, root) = project();

    let a = materialize(&root, "/src", "race.txt");
    let b = materialize(&root, "/src", "race.txt");
    let (a, b) = tokio::join!(a, b);
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.created.len() + b.created.len(), 1);
    assert_eq!(a.failures.len() + b.failures.len(), 1);
}
