//! Whole-program usage index.
//!
//! Maps every identifier-shaped name to the set of files in which it occurs,
//! regardless of scope. The index is deliberately coarse: a name that occurs
//! anywhere counts as used, so detectors built on it can report something as
//! used when it is not, but never the other way round.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;

use crate::program::syntax::for_each_identifier;
use crate::program::{ImportKind, ImportSpecifier, Program, SourceFile};

/// Name -> files in which the name occurs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageIndex {
    occurrences: HashMap<String, BTreeSet<PathBuf>>,
}

impl UsageIndex {
    /// Builds the index from every file in the program.
    ///
    /// Each file is scanned independently and the per-file name sets are
    /// merged by set union, so the result does not depend on scheduling.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::path::Path;
    /// use codelens::analysis::UsageIndex;
    /// use codelens::program::Program;
    ///
    /// let program = Program::from_sources(
    ///     "/app",
    ///     vec![
    ///         ("/app/a.ts", "export function helper() {}"),
    ///         ("/app/b.ts", "import { helper } from './a';\nhelper();"),
    ///     ],
    /// );
    /// let index = UsageIndex::build(&program);
    /// assert_eq!(index.files_for("helper").map(|f| f.len()), Some(2));
    /// assert!(index.occurs_outside("helper", Path::new("/app/a.ts")));
    /// ```
    pub fn build(program: &Program) -> Self {
        let files: Vec<&SourceFile> = program.files().collect();
        let per_file: Vec<(&Path, HashSet<String>)> = files
            .par_iter()
            .map(|file| (file.path.as_path(), file_names(program, file)))
            .collect();

        let mut occurrences: HashMap<String, BTreeSet<PathBuf>> = HashMap::new();
        for (path, names) in per_file {
            for name in names {
                occurrences
                    .entry(name)
                    .or_default()
                    .insert(path.to_path_buf());
            }
        }

        debug!(names = occurrences.len(), files = files.len(), "built usage index");
        Self { occurrences }
    }

    /// Files in which `name` occurs.
    pub fn files_for(&self, name: &str) -> Option<&BTreeSet<PathBuf>> {
        self.occurrences.get(name)
    }

    /// Returns true if `name` occurs in `file`.
    pub fn occurs_in(&self, name: &str, file: &Path) -> bool {
        self.occurrences
            .get(name)
            .is_some_and(|files| files.contains(file))
    }

    /// Returns true if `name` occurs in any file other than `file`.
    pub fn occurs_outside(&self, name: &str, file: &Path) -> bool {
        self.occurrences
            .get(name)
            .is_some_and(|files| files.iter().any(|f| f != file))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

/// Every name that occurs in `file`, with import aliases bound back to the
/// names they were imported as.
fn file_names(program: &Program, file: &SourceFile) -> HashSet<String> {
    let bindings = symbol_bindings(program, file);
    let mut names = HashSet::new();

    for_each_identifier(file.root(), &file.source, |token, _| {
        if let Some(declared) = bindings.get(token) {
            names.insert(declared.clone());
        }
        names.insert(token.to_string());
    });

    names
}

/// Local import name -> the name the binding refers to in its source module.
///
/// Named aliases (`{ a as b }`) map `b` to `a`. A default import maps to the
/// target file's default-exported declaration when the specifier resolves
/// inside the program. Anything else falls back to the raw token.
fn symbol_bindings(program: &Program, file: &SourceFile) -> HashMap<String, String> {
    let mut bindings = HashMap::new();

    for import in file.imports.iter().filter(|i| i.kind == ImportKind::ES6) {
        for spec in &import.specifiers {
            match spec {
                ImportSpecifier::Named { imported, local } if imported != local => {
                    bindings.insert(local.clone(), imported.clone());
                }
                ImportSpecifier::Default(local) => {
                    let declared = program
                        .resolve_import(&file.path, &import.source)
                        .and_then(|target| program.file(target))
                        .and_then(SourceFile::default_export_name);
                    if let Some(declared) = declared {
                        if declared != local {
                            bindings.insert(local.clone(), declared.to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    bindings
}
