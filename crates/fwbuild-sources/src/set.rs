//! Source set: include paths plus inclusion rules, resolved to concrete files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use fwbuild_targets::SourceKind;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SourceError};
use crate::pattern::normalize_script_path;
use crate::rule::InclusionRule;

/// A file selected for compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Kind detected from the extension.
    pub kind: SourceKind,
    /// Index of the first rule that selected the file.
    pub rule: usize,
}

/// Accumulated include paths and inclusion rules.
///
/// Relative paths are resolved against `base_dir`, the directory the
/// configuration was written relative to.
#[derive(Debug, Clone)]
pub struct SourceSet {
    base_dir: PathBuf,
    include_paths: Vec<PathBuf>,
    rules: Vec<InclusionRule>,
}

impl SourceSet {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            include_paths: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Append an include directory. Existence is not checked here.
    pub fn add_include_path(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let normalized = match path.to_str() {
            Some(s) => normalize_script_path(s),
            None => path.to_path_buf(),
        };
        self.include_paths.push(normalized);
    }

    /// Register an inclusion rule.
    pub fn add_files(&mut self, rule: InclusionRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[InclusionRule] {
        &self.rules
    }

    /// Include directories resolved against the base directory, duplicates removed
    /// (first occurrence wins).
    pub fn include_paths(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.include_paths
            .iter()
            .map(|p| self.absolutize(p))
            .filter(|p| seen.insert(p.clone()))
            .collect()
    }

    /// Walk every rule in registration order and return the selected files,
    /// deduplicated by absolute path. Kinds follow the conventional extensions.
    pub fn resolve(&self) -> Result<Vec<ResolvedSourceFile>> {
        self.resolve_with(SourceKind::from_path)
    }

    /// Like [`resolve`](Self::resolve), with `classify` deciding each matched
    /// file's kind. Files it returns `None` for are skipped.
    pub fn resolve_with<F>(&self, classify: F) -> Result<Vec<ResolvedSourceFile>>
    where
        F: Fn(&Path) -> Option<SourceKind>,
    {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for (index, rule) in self.rules.iter().enumerate() {
            let root = self.absolutize(rule.root());
            if !root.is_dir() {
                warn!(root = %root.display(), "inclusion rule root does not exist, skipping");
                continue;
            }

            let max_depth = if rule.is_recursive() { usize::MAX } else { 1 };
            let walker = WalkDir::new(&root)
                .min_depth(1)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0
                        || !rule.is_excluded(&entry.file_name().to_string_lossy())
                });

            let mut matched = 0usize;
            for entry in walker {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if !rule.matches_name(&name) {
                    continue;
                }
                let Some(kind) = classify(entry.path()) else {
                    warn!(
                        file = %entry.path().display(),
                        "matched file has no known source kind, skipping"
                    );
                    continue;
                };
                let path = canonical(entry.path());
                if seen.insert(path.clone()) {
                    matched += 1;
                    files.push(ResolvedSourceFile {
                        path,
                        kind,
                        rule: index,
                    });
                }
            }
            debug!(root = %root.display(), matched, "resolved inclusion rule");
        }

        if files.is_empty() {
            return Err(SourceError::NoSourceFiles {
                rules: self.rules.len(),
            });
        }
        Ok(files)
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        canonical(&joined)
    }
}

/// Canonical form when the path exists, the joined path otherwise.
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
