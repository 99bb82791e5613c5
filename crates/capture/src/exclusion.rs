//! Glob-based exclusion of prefix paths from capture.

use glob::Pattern;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;
use uncork_common::{Error, Result};

/// Caches, logs and temporary files that never belong in a package.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "*.dxvk-cache",
    "*.log",
    "*.tmp",
    "mesa_shader_cache/**",
    "nvidiav1/**",
    "GLCache/**",
    "drive_c/users/*/Temp/**",
    "drive_c/users/*/Local Settings/Temp/**",
    "drive_c/windows/temp/**",
    "drive_c/windows/Temp/**",
    ".update-timestamp",
];

// `*` already crosses separators, so any run of stars means the same thing.
static STAR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*{2,}").unwrap());

/// Compile an exclusion pattern.
pub fn compile_pattern(pattern: &str) -> Result<Pattern> {
    if pattern.trim().is_empty() {
        return Err(Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern is empty".to_string(),
        });
    }
    let collapsed = STAR_RUN.replace_all(pattern, "*");
    Pattern::new(&collapsed).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Whether `rel_path` matches any of `patterns`, in native or
/// `/`-separated form.
pub fn should_exclude(rel_path: &str, patterns: &[Pattern]) -> bool {
    let normalized = rel_path.replace('\\', "/");
    patterns
        .iter()
        .any(|p| p.matches(rel_path) || p.matches(&normalized))
}

/// Ordered, de-duplicated set of exclusion patterns.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    sources: Vec<String>,
    compiled: Vec<Pattern>,
    // Parallel to `sources`: the directory glob of `dir/**` patterns.
    subtrees: Vec<Option<Pattern>>,
}

impl ExclusionSet {
    /// A set seeded with [`DEFAULT_EXCLUSIONS`].
    pub fn with_defaults() -> Self {
        let mut set = Self::empty();
        for pattern in DEFAULT_EXCLUSIONS {
            // Defaults are known-good globs.
            if let Ok(compiled) = compile_pattern(pattern) {
                set.sources.push(pattern.to_string());
                set.compiled.push(compiled);
                set.subtrees.push(subtree_pattern(pattern));
            }
        }
        set
    }

    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
            compiled: Vec::new(),
            subtrees: Vec::new(),
        }
    }

    /// Add a pattern. Returns false if it was already present.
    pub fn add(&mut self, pattern: &str) -> Result<bool> {
        if self.sources.iter().any(|p| p == pattern) {
            return Ok(false);
        }
        let compiled = compile_pattern(pattern)?;
        self.sources.push(pattern.to_string());
        self.compiled.push(compiled);
        self.subtrees.push(subtree_pattern(pattern));
        Ok(true)
    }

    /// Remove a pattern. Returns false if it was not present.
    pub fn remove(&mut self, pattern: &str) -> bool {
        match self.sources.iter().position(|p| p == pattern) {
            Some(index) => {
                self.sources.remove(index);
                self.compiled.remove(index);
                self.subtrees.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.sources.iter().any(|p| p == pattern)
    }

    /// Patterns in insertion order, as written by the user.
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Whether a prefix-relative path is excluded.
    ///
    /// The registry files at the prefix root are never excluded.
    pub fn is_excluded(&self, rel_path: &Path) -> bool {
        let rel = rel_path.to_string_lossy();
        let matched = should_exclude(&rel, &self.compiled);
        if matched && uncork_registry::is_registry_file(&rel) {
            warn!("Ignoring exclusion for registry file {}", rel);
            return false;
        }
        matched
    }

    /// Whether everything below the directory `rel_dir` is excluded, so a
    /// walk can skip it. Only `dir/**` style patterns prune; a directory
    /// matched by any other pattern is still descended into.
    pub fn prunes_dir(&self, rel_dir: &Path) -> bool {
        let rel = rel_dir.to_string_lossy();
        let normalized = rel.replace('\\', "/");
        self.subtrees
            .iter()
            .flatten()
            .any(|p| p.matches(&rel) || p.matches(&normalized))
    }
}

fn subtree_pattern(pattern: &str) -> Option<Pattern> {
    let dir = pattern
        .strip_suffix("/**")
        .or_else(|| pattern.strip_suffix("/*"))?;
    compile_pattern(dir).ok()
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}
