//! Source file discovery.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use tracing::debug;
use walkdir::WalkDir;

use super::resolve::normalize_path;
use super::source::SourceLanguage;
use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;

/// Walks the configured root and returns every candidate source file,
/// normalized and deduplicated, in path order.
pub fn discover_files(config: &AnalysisConfig) -> AnalysisResult<BTreeSet<PathBuf>> {
    let include = config.include_set()?;
    let exclude = config.exclude_set()?;
    let root = absolute_root(&config.root)?;

    let mut files = BTreeSet::new();
    for entry in WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if SourceLanguage::from_path(path).is_none() {
            continue;
        }

        let relative = relative_key(&root, path);
        if !is_selected(&relative, include.as_ref(), exclude.as_ref()) {
            continue;
        }
        files.insert(normalize_path(path));
    }

    debug!(root = %root.display(), count = files.len(), "discovered source files");
    Ok(files)
}

/// Canonical absolute form of the analysis root.
pub fn absolute_root(root: &Path) -> AnalysisResult<PathBuf> {
    Ok(normalize_path(&root.canonicalize()?))
}

/// Root-relative path with `/` separators, the form globs are matched against.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_selected(relative: &str, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    if let Some(include) = include {
        if !include.is_match(relative) {
            return false;
        }
    }
    match exclude {
        Some(exclude) => !exclude.is_match(relative),
        None => true,
    }
}

/// Check if a directory should be ignored during traversal.
fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    matches!(
        name.as_ref(),
        "node_modules" | ".git" | "dist" | "build" | ".next" | "coverage" | ".turbo"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn names(files: &BTreeSet<PathBuf>, root: &Path) -> Vec<String> {
        files.iter().map(|p| relative_key(root, p)).collect()
    }

    #[test]
    fn test_discovers_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ts", "");
        write(dir.path(), "src/b.jsx", "");
        write(dir.path(), "src/readme.md", "");
        write(dir.path(), "node_modules/pkg/index.js", "");
        write(dir.path(), "dist/bundle.js", "");

        let config = AnalysisConfig::new(dir.path());
        let files = discover_files(&config).unwrap();
        let root = absolute_root(dir.path()).unwrap();

        assert_eq!(names(&files, &root), vec!["src/a.ts", "src/b.jsx"]);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_include_and_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ts", "");
        write(dir.path(), "src/a.test.ts", "");
        write(dir.path(), "scripts/build.js", "");

        let config = AnalysisConfig::new(dir.path())
            .with_include(["src/**"])
            .with_exclude(["**/*.test.ts"]);
        let files = discover_files(&config).unwrap();
        let root = absolute_root(dir.path()).unwrap();

        assert_eq!(names(&files, &root), vec!["src/a.ts"]);
    }

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = Path::new("/app");
        assert_eq!(relative_key(root, Path::new("/app/src/x/y.ts")), "src/x/y.ts");
    }
}
