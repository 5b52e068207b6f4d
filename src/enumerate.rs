//! Directory enumeration through an external `find` process.
//!
//! A faster alternative to [`crate::walker::walk`] on very large trees. The
//! subprocess prunes literal directory names itself; the caller still applies
//! the full rule set to what comes back.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// Default time limit for one enumeration.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from running the enumeration process.
#[derive(Debug, thiserror::Error)]
pub enum EnumerationError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("enumeration exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("enumeration timed out after {0:?}")]
    Timeout(Duration),

    #[error("enumeration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured result of a successful enumeration.
#[derive(Debug, Clone, Default)]
pub struct EnumerationOutput {
    /// Absolute directory paths, one per stdout line, root excluded
    pub directories: Vec<PathBuf>,
    /// Lines the process wrote to stderr (permission warnings and the like)
    pub stderr_lines: Vec<String>,
    /// Process exit code
    pub exit_code: i32,
}

/// Runs `find` to list directories under a root.
#[derive(Debug, Clone)]
pub struct ExternalEnumerator {
    program: String,
    timeout: Duration,
}

impl Default for ExternalEnumerator {
    fn default() -> Self {
        Self {
            program: "find".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ExternalEnumerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different `find`-compatible program.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command-line arguments for a root and a set of names to prune.
    ///
    /// Shape: `<root> ( -name A -o -name B ) -prune -o -type d -print`
    pub fn arguments(root: &Path, prune_names: &[String]) -> Vec<String> {
        let mut args = vec![root.to_string_lossy().into_owned()];

        if !prune_names.is_empty() {
            args.push("(".to_string());
            for (i, name) in prune_names.iter().enumerate() {
                if i > 0 {
                    args.push("-o".to_string());
                }
                args.push("-name".to_string());
                args.push(name.clone());
            }
            args.push(")".to_string());
            args.push("-prune".to_string());
            args.push("-o".to_string());
        }

        args.extend(["-type", "d", "-print"].iter().map(|s| s.to_string()));
        args
    }

    /// Enumerate every directory under `root`, pruning `prune_names`.
    ///
    /// # Errors
    /// - [`EnumerationError::Spawn`] if the program cannot be started
    /// - [`EnumerationError::ExitStatus`] on a non-zero exit
    /// - [`EnumerationError::Timeout`] if the process outlives the time limit
    pub async fn enumerate(
        &self,
        root: &Path,
        prune_names: &[String],
    ) -> Result<EnumerationOutput, EnumerationError> {
        let args = Self::arguments(root, prune_names);
        tracing::debug!("{} {}", self.program, args.join(" "));

        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EnumerationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(EnumerationError::Timeout(self.timeout)),
        };

        let stderr_lines: Vec<String> = String::from_utf8_lossy(&output.stderr)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect();

        if !output.status.success() {
            return Err(EnumerationError::ExitStatus {
                code: output.status.code(),
                stderr: stderr_lines.join("\n"),
            });
        }

        for line in &stderr_lines {
            tracing::debug!("{}: {}", self.program, line);
        }

        let directories = parse_directories(&output.stdout, root);

        Ok(EnumerationOutput {
            directories,
            stderr_lines,
            exit_code: output.status.code().unwrap_or(0),
        })
    }
}

/// One path per stdout line. Lines that are not valid UTF-8 are dropped, along
/// with the root itself.
fn parse_directories(stdout: &[u8], root: &Path) -> Vec<PathBuf> {
    let mut invalid = 0usize;
    let directories = stdout
        .split(|b| *b == b'\n')
        .filter_map(|line| match std::str::from_utf8(line) {
            Ok(line) => Some(line.trim_end_matches('\r')),
            Err(_) => {
                invalid += 1;
                None
            }
        })
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .filter(|p| p != root)
        .collect();

    if invalid > 0 {
        tracing::warn!("dropped {} enumerated path(s) that are not valid UTF-8", invalid);
    }
    directories
}
