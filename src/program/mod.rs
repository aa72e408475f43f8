//! Program model: the set of successfully parsed files for one run.
//!
//! A [`Program`] is built once and never modified. Files that cannot be read
//! or parsed are left out and reported as [`Diagnostic`]s.
//!
//! # Example
//!
//! ```rust
//! use codelens::program::Program;
//!
//! let program = Program::from_sources(
//!     "/app",
//!     vec![
//!         ("/app/src/a.ts", "import { b } from './b';\nexport const a = b + 1;"),
//!         ("/app/src/b.ts", "export const b = 1;"),
//!     ],
//! );
//! assert_eq!(program.len(), 2);
//! assert!(program.diagnostics().is_empty());
//! ```

pub mod discovery;
pub mod resolve;
pub mod source;
pub mod syntax;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

pub use discovery::discover_files;
pub use resolve::{normalize_path, ModuleResolver};
pub use source::{
    Export, ExportKind, Import, ImportKind, ImportSpecifier, SourceFile, SourceLanguage,
    SourceParser, SUPPORTED_EXTENSIONS,
};

use crate::config::{AnalysisConfig, DEFAULT_MAX_FILE_BYTES, DEFAULT_PARSE_TIMEOUT_MS};
use crate::error::{AnalysisError, AnalysisResult, Diagnostic};

/// The parsed files of one analysis run, keyed by normalized absolute path.
#[derive(Debug, Clone)]
pub struct Program {
    root: PathBuf,
    files: BTreeMap<PathBuf, SourceFile>,
    paths: BTreeSet<PathBuf>,
    aliases: BTreeMap<String, String>,
    diagnostics: Vec<Diagnostic>,
}

impl Program {
    /// Discovers, reads and parses every file selected by `config`.
    ///
    /// Configuration problems fail immediately; per-file problems become
    /// diagnostics.
    pub fn load(config: &AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        let root = discovery::absolute_root(&config.root)?;
        let paths = discover_files(config)?;
        info!(root = %root.display(), files = paths.len(), "parsing program");

        let max_bytes = config.max_file_bytes;
        let results: Vec<(PathBuf, AnalysisResult<SourceFile>)> = paths
            .into_par_iter()
            .map_init(
                || SourceParser::new(config.parse_timeout_ms),
                |parser, path| {
                    let result = match parser {
                        Ok(parser) => read_source(&path, max_bytes)
                            .and_then(|text| parser.parse(&path, text)),
                        Err(_) => Err(AnalysisError::LanguageInit),
                    };
                    (path, result)
                },
            )
            .collect();

        Ok(Self::assemble(root, config.aliases.clone(), results))
    }

    /// Builds a program from in-memory sources with default parse limits.
    ///
    /// Paths are normalized but not checked against the filesystem.
    pub fn from_sources<R, P, S>(root: R, sources: Vec<(P, S)>) -> Self
    where
        R: Into<PathBuf>,
        P: AsRef<Path>,
        S: Into<String>,
    {
        Self::from_sources_with_aliases(root, sources, BTreeMap::new())
    }

    /// Like [`Program::from_sources`], with import aliases.
    pub fn from_sources_with_aliases<R, P, S>(
        root: R,
        sources: Vec<(P, S)>,
        aliases: BTreeMap<String, String>,
    ) -> Self
    where
        R: Into<PathBuf>,
        P: AsRef<Path>,
        S: Into<String>,
    {
        let root = normalize_path(&root.into());
        let mut parser = SourceParser::new(DEFAULT_PARSE_TIMEOUT_MS);
        let results = sources
            .into_iter()
            .map(|(path, text)| {
                let path = normalize_path(path.as_ref());
                let text: String = text.into();
                let result = if text.len() as u64 > DEFAULT_MAX_FILE_BYTES {
                    Err(AnalysisError::FileTooLarge {
                        path: path.display().to_string(),
                        size: text.len() as u64,
                        limit: DEFAULT_MAX_FILE_BYTES,
                    })
                } else {
                    match parser.as_mut() {
                        Ok(parser) => parser.parse(&path, text),
                        Err(_) => Err(AnalysisError::LanguageInit),
                    }
                };
                (path, result)
            })
            .collect();
        Self::assemble(root, aliases, results)
    }

    fn assemble(
        root: PathBuf,
        aliases: BTreeMap<String, String>,
        results: Vec<(PathBuf, AnalysisResult<SourceFile>)>,
    ) -> Self {
        let mut files = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for (path, result) in results {
            match result {
                Ok(file) => {
                    files.insert(path, file);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "excluding file from program");
                    diagnostics.push(Diagnostic::parse_failure(&path, &e));
                }
            }
        }

        let paths = files.keys().cloned().collect();
        Self {
            root,
            files,
            paths,
            aliases,
            diagnostics,
        }
    }

    /// The analysis root (absolute, normalized).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of parsed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Parsed files in path order.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    /// Looks up a file by (normalized) path.
    pub fn file(&self, path: &Path) -> Option<&SourceFile> {
        self.files.get(path)
    }

    /// Ordered set of file paths in the program.
    pub fn paths(&self) -> &BTreeSet<PathBuf> {
        &self.paths
    }

    /// Files that were discovered but could not be parsed.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Resolver bound to this program's file set.
    pub fn resolver(&self) -> ModuleResolver<'_> {
        ModuleResolver::new(&self.root, &self.paths, &self.aliases)
    }

    /// Resolves an import specifier written in `from` to a program file.
    pub fn resolve_import(&self, from: &Path, specifier: &str) -> Option<&Path> {
        self.resolver().resolve(from, specifier)
    }

    /// Path relative to the root, for display.
    pub fn display_path(&self, path: &Path) -> String {
        display_relative(&self.root, path)
    }
}

/// Root-relative display form of a path with `/` separators.
pub fn display_relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_source(path: &Path, max_bytes: u64) -> AnalysisResult<String> {
    let size = fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(AnalysisError::FileTooLarge {
            path: path.display().to_string(),
            size,
            limit: max_bytes,
        });
    }
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_is_excluded_not_fatal() {
        let program = Program::from_sources(
            "/app",
            vec![
                ("/app/ok.js", "export const ok = 1;"),
                ("/app/broken.js", "export const = ;"),
            ],
        );

        assert_eq!(program.len(), 1);
        assert!(program.file(Path::new("/app/ok.js")).is_some());
        assert_eq!(program.diagnostics().len(), 1);
        assert_eq!(
            program.diagnostics()[0].file.as_deref(),
            Some(Path::new("/app/broken.js"))
        );
    }

    #[test]
    fn test_paths_are_normalized_and_deduplicated() {
        let program = Program::from_sources(
            "/app/./",
            vec![
                ("/app/src/../a.ts", "export const a = 1;"),
                ("/app/a.ts", "export const a = 2;"),
            ],
        );
        assert_eq!(program.len(), 1);
        assert_eq!(program.root(), Path::new("/app"));
        assert!(program.file(Path::new("/app/a.ts")).is_some());
    }

    #[test]
    fn test_resolve_import_uses_program_files() {
        let program = Program::from_sources(
            "/app",
            vec![
                ("/app/src/main.ts", "import { a } from './a';"),
                ("/app/src/a.ts", "export const a = 1;"),
            ],
        );
        assert_eq!(
            program.resolve_import(Path::new("/app/src/main.ts"), "./a"),
            Some(Path::new("/app/src/a.ts"))
        );
        assert_eq!(
            program.resolve_import(Path::new("/app/src/main.ts"), "lodash"),
            None
        );
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "export const a = 1;").unwrap();
        fs::write(dir.path().join("src/bad.ts"), "export const = ;").unwrap();

        let program = Program::load(&AnalysisConfig::new(dir.path())).unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(program.diagnostics().len(), 1);
        assert_eq!(program.display_path(program.files().next().unwrap().path.as_path()), "src/a.ts");
    }

    #[test]
    fn test_load_rejects_bad_config_before_parsing() {
        let config = AnalysisConfig::new("/no/such/root");
        assert!(matches!(
            Program::load(&config),
            Err(AnalysisError::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_parse_timeout_becomes_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let huge: String = (0..20_000)
            .map(|i| format!("export const value{i} = {{ key: [{i}, {i} + 1, `t${{{i}}}`] }};\n"))
            .collect();
        fs::write(dir.path().join("huge.js"), huge).unwrap();
        fs::write(dir.path().join("small.js"), "export const small = 1;").unwrap();
        let mut config = AnalysisConfig::new(dir.path());
        config.parse_timeout_ms = 1;

        let program = Program::load(&config).unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(
            program.display_path(program.files().next().unwrap().path.as_path()),
            "small.js"
        );
        assert_eq!(program.diagnostics().len(), 1);
        assert!(program.diagnostics()[0].message.contains("timed out"));
    }

    #[test]
    fn test_oversized_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.js"), "export const big = 1;\n".repeat(100)).unwrap();
        let mut config = AnalysisConfig::new(dir.path());
        config.max_file_bytes = 10;

        let program = Program::load(&config).unwrap();
        assert!(program.is_empty());
        assert!(program.diagnostics()[0].message.contains("too large"));
    }
}
