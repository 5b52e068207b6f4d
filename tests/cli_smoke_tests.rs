//! CLI smoke tests for the foldex binary
//!
//! Spawns the built binary against temporary trees and checks its output.

use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn bin_path() -> String {
    std::env::var("CARGO_BIN_EXE_foldex").unwrap_or_else(|_| {
        // Fallback: construct path to debug binary
        let mut path = std::env::current_exe().unwrap();
        path.pop(); // Remove test executable name from deps/
        path.pop(); // Remove deps/ directory
        path.push("foldex");
        path.to_str().unwrap().to_string()
    })
}

fn foldex(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to start foldex binary")
}

fn project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for dir in ["src/a", "node_modules/pkg", "docs"] {
        fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
    }
    temp_dir
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_version_flag() {
    let output = foldex(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("foldex "));
}

#[test]
fn test_unknown_command_fails() {
    let output = foldex(&["frobnicate"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown command: frobnicate"));
}

#[test]
fn test_index_prints_sorted_entries() {
    let temp_dir = project();
    let root = temp_dir.path().to_str().unwrap();

    let output = foldex(&["index", "--root", root]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_lines(&output), vec!["/docs", "/src", "/src/a"]);
}

#[test]
fn test_index_ignore_flag() {
    let temp_dir = project();
    let root = temp_dir.path().to_str().unwrap();

    let output = foldex(&["index", "--root", root, "--ignore", "src"]);

    assert!(output.status.success());
    // Explicit rules replace the built-in names
    assert_eq!(
        stdout_lines(&output),
        vec!["/docs", "/node_modules", "/node_modules/pkg"]
    );
}

#[test]
fn test_index_json_output() {
    let temp_dir = project();
    let root = temp_dir.path().to_str().unwrap();

    let output = foldex(&["index", "--root", root, "--output", "json"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["tool"], "foldex");
    assert_eq!(value["data"]["count"], 3);
    assert_eq!(value["data"]["entries"][1], "/src");
}

#[test]
fn test_index_missing_root() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("gone");

    let output = foldex(&["index", "--root", missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}

#[test]
fn test_create_with_input() {
    let temp_dir = project();
    let root = temp_dir.path().to_str().unwrap();

    let output = foldex(&["create", "--root", root, "--dest", "/src", "a.txt, b/c.txt"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(temp_dir.path().join("src/a.txt").is_file());
    assert!(temp_dir.path().join("src/b/c.txt").is_file());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CREATED"));
    assert!(stdout.contains("FOCUS"));
}

#[test]
fn test_create_escape_reports_failure() {
    let temp_dir = project();
    let root = temp_dir.path().join("src");

    let output = foldex(&["create", "--root", root.to_str().unwrap(), "../outside.txt"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!temp_dir.path().join("outside.txt").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("FAILED ../outside.txt"));
}

#[test]
fn test_create_interactive_select() {
    let temp_dir = project();
    let root = temp_dir.path().to_str().unwrap();

    let mut child = Command::new(bin_path())
        .args(["create", "--root", root, "--mode", "select", "--no-open"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start foldex binary");

    {
        let stdin = child.stdin.as_mut().unwrap();
        stdin.write_all(b"/docs\nguide.md\n").unwrap();
    }
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(temp_dir.path().join("docs/guide.md").is_file());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("OPEN"));
}

#[test]
fn test_watch_reports_rebuild() {
    let temp_dir = project();
    let root = temp_dir.path().to_path_buf();

    let mut child = Command::new(bin_path())
        .args(["watch", "--root", root.to_str().unwrap(), "--debounce-ms", "50"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start foldex binary");

    // Wait for startup, then add a directory
    thread::sleep(Duration::from_millis(500));
    fs::create_dir(root.join("lib")).unwrap();
    thread::sleep(Duration::from_millis(1500));

    let _ = child.kill();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("foldex watching:"), "stdout: {}", stdout);
    assert!(stdout.contains("INDEX 3 directories"), "stdout: {}", stdout);
    assert!(stdout.contains("INDEX 4 directories at"), "stdout: {}", stdout);
}
