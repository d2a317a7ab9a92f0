//! File inclusion rules.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pattern::{normalize_script_path, split_list, FilePattern, DEFAULT_PATTERNS};

/// One `add_files` registration: a root, patterns, recursion, and exclusions.
///
/// Patterns are compiled and exclusions lowercased once, here, so resolution
/// never re-parses strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionRule {
    root: PathBuf,
    patterns: Vec<FilePattern>,
    recursive: bool,
    excludes: Vec<String>,
}

impl InclusionRule {
    /// A recursive rule over `root` with the default patterns and no exclusions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let patterns = FilePattern::parse_list(DEFAULT_PATTERNS).unwrap_or_default();
        Self {
            root: root.into(),
            patterns,
            recursive: true,
            excludes: Vec::new(),
        }
    }

    /// Build a rule from the script form:
    /// `add_files("..\\TinyIP", "*.c;*.cpp", false, "HttpClient")`.
    ///
    /// Omitted arguments take the defaults of [`InclusionRule::new`].
    pub fn from_script(
        root: &str,
        patterns: Option<&str>,
        recursive: Option<bool>,
        excludes: Option<&str>,
    ) -> Result<Self> {
        let mut rule = Self::new(normalize_script_path(root));
        if let Some(list) = patterns {
            rule = rule.with_patterns(list)?;
        }
        if let Some(recursive) = recursive {
            rule = rule.recursive(recursive);
        }
        if let Some(list) = excludes {
            rule = rule.excluding(&split_list(list));
        }
        Ok(rule)
    }

    /// Replace the patterns with a semicolon-delimited list. An empty list keeps the defaults.
    pub fn with_patterns(mut self, list: &str) -> Result<Self> {
        let patterns = FilePattern::parse_list(list)?;
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
        Ok(self)
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Add exclusion substrings.
    pub fn excluding<S: AsRef<str>>(mut self, substrings: &[S]) -> Self {
        for s in substrings {
            let lower = s.as_ref().trim().to_lowercase();
            if !lower.is_empty() && !self.excludes.contains(&lower) {
                self.excludes.push(lower);
            }
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &[FilePattern] {
        &self.patterns
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Lowercased exclusion substrings.
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// Whether a bare entry name contains any exclusion substring.
    pub fn is_excluded(&self, name: &str) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let lower = name.to_lowercase();
        self.excludes.iter().any(|e| lower.contains(e.as_str()))
    }

    /// Whether a bare file name matches at least one pattern.
    pub fn matches_name(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    /// Whether a bare file name is selected by this rule.
    pub fn selects(&self, name: &str) -> bool {
        self.matches_name(name) && !self.is_excluded(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let rule = InclusionRule::new("src");
        assert!(rule.is_recursive());
        assert!(rule.excludes().is_empty());
        assert!(rule.selects("Sys.cpp"));
        assert!(rule.selects("Usart.c"));
        assert!(!rule.selects("Spi.h"));
        assert!(!rule.selects("startup_stm32f0xx.s"));
    }

    #[test]
    fn script_form() {
        let rule = InclusionRule::from_script(
            "..\\",
            Some("*.c;*.cpp"),
            Some(false),
            Some("CAN;DMA;Memory;String"),
        )
        .unwrap();
        assert!(!rule.is_recursive());
        assert_eq!(rule.patterns().len(), 2);
        assert!(rule.selects("Flash.cpp"));
        assert!(!rule.selects("Can.cpp"));
        assert!(!rule.selects("DMA.cpp"));
        assert!(!rule.selects("StringTest.cpp"));
        assert!(!rule.selects("MemoryStream.cpp"));
    }

    #[test]
    fn exclusion_is_case_insensitive_substring() {
        let rule = InclusionRule::new("TinyIP").excluding(&["HttpClient"]);
        assert!(rule.is_excluded("HTTPCLIENT.cpp"));
        assert!(rule.is_excluded("MyHttpClientEx.cpp"));
        assert!(!rule.is_excluded("Tcp.cpp"));
    }

    #[test]
    fn empty_pattern_list_keeps_defaults() {
        let rule = InclusionRule::new("x").with_patterns(";").unwrap();
        assert_eq!(rule.patterns().len(), 4);
    }

    #[test]
    fn single_file_pattern() {
        let rule =
            InclusionRule::from_script("..\\Platform", Some("Boot_F0.cpp"), None, None).unwrap();
        assert!(rule.is_recursive());
        assert!(rule.selects("Boot_F0.cpp"));
        assert!(!rule.selects("Boot_F4.cpp"));
    }
}
