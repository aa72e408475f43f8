//! Module specifier resolution against the set of program files.
//!
//! Only specifiers that can point into the program are resolved: relative
//! (`./x`, `../x`), root-absolute (`/src/x`) and configured aliases. Bare
//! package names never resolve; that is a normal outcome, not an error.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use super::source::SUPPORTED_EXTENSIONS;

/// Lexically normalizes a path: drops `.` segments and folds `..` into the
/// preceding segment. Does not touch the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Maps `.js`-family suffixes to the TypeScript sources they are usually
/// compiled from (`import './a.js'` inside `a.ts`'s neighbours).
const SUFFIX_SWAPS: &[(&str, &[&str])] = &[
    ("js", &["ts", "tsx"]),
    ("jsx", &["tsx"]),
    ("mjs", &["mts"]),
    ("cjs", &["cts"]),
];

/// Resolves import specifiers to program files.
#[derive(Debug, Clone)]
pub struct ModuleResolver<'p> {
    root: &'p Path,
    files: &'p BTreeSet<PathBuf>,
    aliases: &'p BTreeMap<String, String>,
}

impl<'p> ModuleResolver<'p> {
    pub fn new(
        root: &'p Path,
        files: &'p BTreeSet<PathBuf>,
        aliases: &'p BTreeMap<String, String>,
    ) -> Self {
        Self {
            root,
            files,
            aliases,
        }
    }

    /// Resolves `specifier` as written in `from` to a program file.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::{BTreeMap, BTreeSet};
    /// use std::path::{Path, PathBuf};
    /// use codelens::program::ModuleResolver;
    ///
    /// let files: BTreeSet<PathBuf> = [PathBuf::from("/app/src/utils/index.ts")].into();
    /// let aliases = BTreeMap::new();
    /// let resolver = ModuleResolver::new(Path::new("/app"), &files, &aliases);
    ///
    /// let target = resolver.resolve(Path::new("/app/src/main.ts"), "./utils");
    /// assert_eq!(target, Some(Path::new("/app/src/utils/index.ts")));
    /// assert_eq!(resolver.resolve(Path::new("/app/src/main.ts"), "react"), None);
    /// ```
    pub fn resolve(&self, from: &Path, specifier: &str) -> Option<&'p Path> {
        let base = self.base_path(from, specifier)?;
        let files = self.files;
        self.candidates(&base)
            .into_iter()
            .find_map(|candidate| files.get(&candidate))
            .map(PathBuf::as_path)
    }

    fn base_path(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        let relative = specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier == "."
            || specifier == "..";
        if relative {
            let dir = from.parent()?;
            return Some(normalize_path(&dir.join(specifier)));
        }
        if let Some(rest) = specifier.strip_prefix('/') {
            return Some(normalize_path(&self.root.join(rest)));
        }
        // Longest alias prefix wins.
        self.aliases
            .iter()
            .filter(|(prefix, _)| specifier.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, target)| {
                let rest = specifier[prefix.len()..].trim_start_matches('/');
                let target = target.trim_start_matches('/');
                normalize_path(&self.root.join(target).join(rest))
            })
    }

    fn candidates(&self, base: &Path) -> Vec<PathBuf> {
        let mut out = vec![base.to_path_buf()];

        let base_str = base.to_string_lossy();
        for ext in SUPPORTED_EXTENSIONS {
            out.push(PathBuf::from(format!("{}.{}", base_str, ext)));
        }

        if let Some(ext) = base.extension().and_then(|e| e.to_str()) {
            for (from_ext, to_exts) in SUFFIX_SWAPS {
                if ext == *from_ext {
                    for to_ext in *to_exts {
                        out.push(base.with_extension(to_ext));
                    }
                }
            }
        }

        for ext in SUPPORTED_EXTENSIONS {
            out.push(base.join(format!("index.{}", ext)));
        }
        out
    }
}
