//! Ignore rules for the folder index.
//!
//! Rules are glob-like patterns with a single wildcard: `*` matches any run of
//! characters, path separators included. Every other character is literal. A
//! leading `!` negates the rule.
//!
//! Evaluation is ordered: the last rule that matches decides. Inputs that no
//! rule matches are kept in the index. A leading negated rule reads as
//! "include everything except what later plain rules match", which keeps that
//! same default.
//!
//! All matching is a pure function: same inputs always produce same output.

use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Directory names skipped when the user configured no ignore patterns.
pub const DEFAULT_IGNORE_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "CVS",
    ".nova",
    ".idea",
    ".vscode",
    "node_modules",
    "bower_components",
    "target",
    ".venv",
    "venv",
    "__pycache__",
];

/// Options that affect how a pattern compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatchOptions {
    /// Match letter case exactly (default: case-insensitive)
    pub case_sensitive: bool,
}

/// Cache key for a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    pattern: String,
    case_sensitive: bool,
}

/// A single ignore rule as written by the user.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    /// Raw rule text, including any leading `!`
    pub raw: String,
    /// Whether the rule starts with `!`
    pub negated: bool,
    body: String,
    matcher: Arc<CompiledPattern>,
}

impl IgnoreRule {
    /// The pattern without its negation marker.
    pub fn pattern(&self) -> &str {
        &self.body
    }

    /// Whether the rule applies to a candidate.
    ///
    /// A rule applies when its pattern matches the whole relative path, or when
    /// the pattern text equals the bare entry name.
    pub fn applies_to(&self, relative_path: &str, name: &str) -> bool {
        name == self.body || self.matcher.is_match(relative_path)
    }
}

#[derive(Debug)]
enum CompiledPattern {
    Glob(GlobMatcher),
    /// Malformed pattern; never matches
    Never,
}

impl CompiledPattern {
    fn is_match(&self, candidate: &str) -> bool {
        match self {
            CompiledPattern::Glob(m) => m.is_match(candidate),
            CompiledPattern::Never => false,
        }
    }
}

/// Ordered set of ignore rules.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRuleSet {
    /// An empty set that ignores nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    /// Plain rule bodies an external enumerator can prune on its own.
    ///
    /// A name qualifies only if it is not negated, has no character `find
    /// -name` treats as glob syntax, and no negated rule follows it (a later
    /// negation may bring the directory back).
    pub fn literal_names(&self) -> Vec<String> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(i, rule)| {
                !rule.negated
                    && is_plain_name(&rule.body)
                    && !self.rules[i + 1..].iter().any(|later| later.negated)
            })
            .map(|(_, rule)| rule.body.clone())
            .collect()
    }

    /// Decide whether an entry is excluded from the index.
    ///
    /// # Arguments
    /// * `relative_path` - Path relative to the workspace root (leading and
    ///   trailing `/` are ignored)
    /// * `name` - Final component of the path
    /// * `ignore_hidden` - Exclude every entry whose name starts with `.`
    pub fn is_ignored(&self, relative_path: &str, name: &str, ignore_hidden: bool) -> bool {
        if ignore_hidden && name.starts_with('.') {
            return true;
        }

        if self.rules.is_empty() {
            return false;
        }

        let path = trim_slashes(relative_path);

        // Unmatched inputs stay in the index, with or without a leading negation.
        let mut ignored = false;
        for rule in &self.rules {
            if rule.applies_to(path, name) {
                ignored = !rule.negated;
            }
        }
        ignored
    }
}

fn is_plain_name(body: &str) -> bool {
    !body.is_empty() && !body.contains(['*', '?', '[', ']', '\\', '/'])
}

/// Free-function form of [`IgnoreRuleSet::is_ignored`].
pub fn is_ignored(relative_path: &str, name: &str, rules: &IgnoreRuleSet, ignore_hidden: bool) -> bool {
    rules.is_ignored(relative_path, name, ignore_hidden)
}

/// Compiles rule text into rule sets, caching each compiled pattern.
///
/// Repeated compilation of the same configuration value is free: patterns are
/// keyed on `(pattern, case_sensitive)`.
#[derive(Debug, Default)]
pub struct RuleCompiler {
    cache: Mutex<HashMap<RuleKey, Arc<CompiledPattern>>>,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile newline-separated rule text (the `ignorePatterns` setting).
    pub fn compile_text(&self, text: &str, options: MatchOptions) -> IgnoreRuleSet {
        self.compile(text.lines(), options)
    }

    /// Compile a sequence of raw rules. Blank lines are skipped.
    pub fn compile<I, S>(&self, patterns: I, options: MatchOptions) -> IgnoreRuleSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref().trim();
                if raw.is_empty() {
                    return None;
                }
                Some(self.compile_rule(raw, options))
            })
            .collect();

        IgnoreRuleSet { rules }
    }

    /// Rule set built from [`DEFAULT_IGNORE_NAMES`].
    pub fn defaults(&self) -> IgnoreRuleSet {
        self.compile(DEFAULT_IGNORE_NAMES.iter(), MatchOptions::default())
    }

    /// Number of distinct compiled patterns held by the cache.
    pub fn cached_patterns(&self) -> usize {
        self.lock_cache().len()
    }

    fn compile_rule(&self, raw: &str, options: MatchOptions) -> IgnoreRule {
        let (negated, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let key = RuleKey {
            pattern: body.to_string(),
            case_sensitive: options.case_sensitive,
        };

        let matcher = {
            let mut cache = self.lock_cache();
            cache
                .entry(key)
                .or_insert_with(|| Arc::new(compile_pattern(body, options)))
                .clone()
        };

        IgnoreRule {
            raw: raw.to_string(),
            negated,
            body: body.to_string(),
            matcher,
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<RuleKey, Arc<CompiledPattern>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn compile_pattern(body: &str, options: MatchOptions) -> CompiledPattern {
    let glob = to_glob(body);
    let built = GlobBuilder::new(&glob)
        .literal_separator(false)
        .backslash_escape(true)
        .case_insensitive(!options.case_sensitive)
        .build();

    match built {
        Ok(g) => CompiledPattern::Glob(g.compile_matcher()),
        Err(e) => {
            tracing::warn!("ignore pattern '{}' does not compile, it will never match: {}", body, e);
            CompiledPattern::Never
        }
    }
}

/// Translate a rule body into globset syntax.
///
/// Only `*` keeps its meaning (runs collapse into one); all other glob
/// metacharacters are escaped.
fn to_glob(body: &str) -> String {
    let mut glob = String::with_capacity(body.len() * 2);
    let mut prev_star = false;
    for c in body.chars() {
        match c {
            '*' => {
                if !prev_star {
                    glob.push('*');
                }
                prev_star = true;
                continue;
            }
            '?' | '[' | ']' | '{' | '}' | '\\' | ',' | '!' => {
                glob.push('\\');
                glob.push(c);
            }
            c => glob.push(c),
        }
        prev_star = false;
    }
    glob
}

fn trim_slashes(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}
