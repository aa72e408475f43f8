//! Analysis configuration.
//!
//! A config can be built in code, loaded from a JSON file, or assembled by the
//! CLI. [`AnalysisConfig::validate`] must pass before any file is touched.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::error::{AnalysisError, AnalysisResult};

/// Default complexity above which a function is reported.
pub const DEFAULT_COMPLEXITY_THRESHOLD: usize = 10;
/// Default minimum entity count before a file is checked for mixed logic.
pub const DEFAULT_MIXED_LOGIC_THRESHOLD: usize = 3;
/// Default number of shared import targets that makes two files related.
pub const DEFAULT_RELATED_MIN_SHARED: usize = 2;
/// Default per-file parse budget.
pub const DEFAULT_PARSE_TIMEOUT_MS: u64 = 5_000;
/// Default per-file size cap.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;

/// Settings for one analysis run.
///
/// # Example
///
/// ```rust
/// use codelens::config::AnalysisConfig;
///
/// let config = AnalysisConfig::new(".")
///     .with_include(["src/**"])
///     .with_exclude(["**/*.test.ts"]);
/// assert_eq!(config.mixed_logic_threshold, 3);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Directory to analyze.
    pub root: PathBuf,
    /// Root-relative glob patterns a file must match (empty = everything).
    pub include: Vec<String>,
    /// Root-relative glob patterns that remove a file.
    pub exclude: Vec<String>,
    /// Functions with a higher complexity get a warning.
    pub complexity_threshold: usize,
    /// Files with fewer entities are never flagged as mixed logic.
    pub mixed_logic_threshold: usize,
    /// Minimum shared direct imports for two files to count as related.
    pub related_min_shared: usize,
    /// Per-file parse budget in milliseconds (0 disables the limit).
    pub parse_timeout_ms: u64,
    /// Files larger than this are skipped.
    pub max_file_bytes: u64,
    /// Import prefix -> root-relative directory, e.g. `"@/" -> "src/"`.
    pub aliases: BTreeMap<String, String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            include: Vec::new(),
            exclude: Vec::new(),
            complexity_threshold: DEFAULT_COMPLEXITY_THRESHOLD,
            mixed_logic_threshold: DEFAULT_MIXED_LOGIC_THRESHOLD,
            related_min_shared: DEFAULT_RELATED_MIN_SHARED,
            parse_timeout_ms: DEFAULT_PARSE_TIMEOUT_MS,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            aliases: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Creates a config with default thresholds for the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Loads a config from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a config from a JSON string.
    pub fn from_json(content: &str) -> AnalysisResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn with_include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn with_alias(mut self, prefix: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(prefix.into(), target.into());
        self
    }

    /// Checks everything that can be checked without parsing.
    ///
    /// Verifies the root is a directory, compiles every glob and rejects
    /// thresholds that would make a detector meaningless.
    pub fn validate(&self) -> AnalysisResult<()> {
        if !self.root.is_dir() {
            return Err(AnalysisError::InvalidRoot(self.root.clone()));
        }
        self.validate_values()?;
        self.include_set()?;
        self.exclude_set()?;
        Ok(())
    }

    /// Threshold checks that do not touch the filesystem.
    pub(crate) fn validate_values(&self) -> AnalysisResult<()> {
        if self.mixed_logic_threshold < 2 {
            return Err(AnalysisError::Configuration(format!(
                "mixedLogicThreshold must be at least 2, got {}",
                self.mixed_logic_threshold
            )));
        }
        if self.related_min_shared == 0 {
            return Err(AnalysisError::Configuration(
                "relatedMinShared must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn include_set(&self) -> AnalysisResult<Option<GlobSet>> {
        build_globset(&self.include)
    }

    pub(crate) fn exclude_set(&self) -> AnalysisResult<Option<GlobSet>> {
        build_globset(&self.exclude)
    }
}

fn build_globset(patterns: &[String]) -> AnalysisResult<Option<GlobSet>> {
    let mut builder = GlobSetBuilder::new();
    let mut added = false;
    for pat in patterns {
        if pat.trim().is_empty() {
            continue;
        }
        let glob = Glob::new(pat).map_err(|source| AnalysisError::InvalidPattern {
            pattern: pat.clone(),
            source,
        })?;
        builder.add(glob);
        added = true;
    }
    if !added {
        return Ok(None);
    }
    builder
        .build()
        .map(Some)
        .map_err(|source| AnalysisError::InvalidPattern {
            pattern: patterns.join(", "),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.complexity_threshold, 10);
        assert_eq!(config.mixed_logic_threshold, 3);
        assert_eq!(config.related_min_shared, 2);
        assert!(config.include.is_empty());
    }

    #[test]
    fn test_from_json_partial() {
        let config = AnalysisConfig::from_json(
            r#"{"root": "app", "exclude": ["**/*.spec.ts"], "mixedLogicThreshold": 5, "aliases": {"@/": "src/"}}"#,
        )
        .unwrap();
        assert_eq!(config.root, PathBuf::from("app"));
        assert_eq!(config.exclude, vec!["**/*.spec.ts".to_string()]);
        assert_eq!(config.mixed_logic_threshold, 5);
        assert_eq!(config.complexity_threshold, 10);
        assert_eq!(config.aliases.get("@/").map(String::as_str), Some("src/"));
    }

    #[test]
    fn test_invalid_root_rejected() {
        let config = AnalysisConfig::new("/definitely/not/a/real/dir");
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig::new(dir.path()).with_include(["src/[unclosed"]);
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AnalysisConfig::new(dir.path());
        config.mixed_logic_threshold = 1;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::Configuration(_))
        ));
    }

    #[test]
    fn test_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig::new(dir.path()).with_exclude(["**/node_modules/**"]);
        assert!(config.validate().is_ok());
        assert!(config.exclude_set().unwrap().is_some());
        assert!(config.include_set().unwrap().is_none());
    }
}
