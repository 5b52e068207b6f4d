//! Build metadata for `foldex --version`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub date: &'static str,
    pub rustc: &'static str,
}

impl BuildInfo {
    /// Values baked in by `build.rs`; missing ones read "unknown".
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("FOLDEX_COMMIT_SHA").unwrap_or("unknown"),
            date: option_env!("FOLDEX_BUILD_DATE").unwrap_or("unknown"),
            rustc: option_env!("FOLDEX_RUSTC_VERSION").unwrap_or("unknown"),
        }
    }
}

/// Format: "foldex {version} ({commit} {date}) rustc {rustc}"
pub fn version() -> String {
    let info = BuildInfo::current();
    format!(
        "foldex {} ({} {}) rustc {}",
        info.version, info.commit, info.date, info.rustc
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_starts_with_package() {
        let v = version();
        assert!(v.starts_with(&format!("foldex {}", env!("CARGO_PKG_VERSION"))));
    }
}
