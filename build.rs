use std::process::Command;

/// First line of a command's stdout, or `None` if it fails.
fn capture(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
}

fn main() {
    let commit_sha = capture("git", &["rev-parse", "--short", "HEAD"]);
    let build_date = capture("date", &["+%Y-%m-%d"]);
    // "rustc 1.80.0 (...)" -> "1.80.0"
    let rustc_version = capture("rustc", &["--version"]).and_then(|s| {
        s.strip_prefix("rustc ")
            .and_then(|v| v.split_whitespace().next())
            .map(str::to_string)
    });

    for (key, value) in [
        ("FOLDEX_COMMIT_SHA", commit_sha),
        ("FOLDEX_BUILD_DATE", build_date),
        ("FOLDEX_RUSTC_VERSION", rustc_version),
    ] {
        println!(
            "cargo:rustc-env={}={}",
            key,
            value.unwrap_or_else(|| "unknown".to_string())
        );
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=FOLDEX_COMMIT_SHA");
}
