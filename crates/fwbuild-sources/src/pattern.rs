//! Filename glob patterns and script-form list parsing.

use std::path::{PathBuf, MAIN_SEPARATOR};

use regex::{Regex, RegexBuilder};

use crate::error::{Result, SourceError};

/// Patterns used when a rule does not name any.
pub const DEFAULT_PATTERNS: &str = "*.c;*.cpp;*.cc;*.cxx";

/// A compiled filename glob (`*` and `?` wildcards), matched case-insensitively
/// against a bare file name.
#[derive(Debug, Clone)]
pub struct FilePattern {
    glob: String,
    regex: Regex,
}

impl FilePattern {
    /// Compile a glob pattern.
    pub fn new(glob: &str) -> Result<Self> {
        let mut expr = String::with_capacity(glob.len() + 8);
        expr.push('^');
        for c in glob.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
            }
        }
        expr.push('$');
        let regex = RegexBuilder::new(&expr)
            .case_insensitive(true)
            .build()
            .map_err(|source| SourceError::InvalidPattern {
                pattern: glob.to_string(),
                source,
            })?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    /// Parse a semicolon-delimited pattern list such as `"*.c;*.cpp"`.
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        split_list(list).iter().map(|p| Self::new(p)).collect()
    }

    /// Whether a bare file name matches.
    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    /// The glob as written.
    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

impl PartialEq for FilePattern {
    fn eq(&self, other: &Self) -> bool {
        self.glob == other.glob
    }
}

impl Eq for FilePattern {}

/// Split a semicolon-delimited list, trimming and dropping empty items.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert a script path (`..\\Platform`) to a native path.
pub fn normalize_script_path(path: &str) -> PathBuf {
    if MAIN_SEPARATOR == '/' {
        PathBuf::from(path.replace('\\', "/"))
    } else {
        PathBuf::from(path.replace('/', "\\"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_and_question_mark() {
        let p = FilePattern::new("*.c").unwrap();
        assert!(p.matches("Queue.c"));
        assert!(p.matches("QUEUE.C"));
        assert!(!p.matches("Queue.cpp"));
        assert!(!p.matches("Queue.c.bak"));

        let q = FilePattern::new("Boot_F?.cpp").unwrap();
        assert!(q.matches("Boot_F0.cpp"));
        assert!(!q.matches("Boot_F10.cpp"));
    }

    #[test]
    fn literal_name_is_escaped() {
        let p = FilePattern::new("startup_stm32f0xx.s").unwrap();
        assert!(p.matches("startup_stm32f0xx.s"));
        assert!(!p.matches("startup_stm32f0xxXs"));
    }

    #[test]
    fn parse_script_list() {
        let patterns = FilePattern::parse_list("*.c;*.cpp; ;").unwrap();
        let globs: Vec<&str> = patterns.iter().map(FilePattern::as_str).collect();
        assert_eq!(globs, vec!["*.c", "*.cpp"]);
    }

    #[test]
    fn split_exclusions() {
        assert_eq!(
            split_list("CAN;DMA;Memory;String"),
            vec!["CAN", "DMA", "Memory", "String"]
        );
        assert!(split_list("").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn script_paths_become_native() {
        assert_eq!(normalize_script_path("..\\Platform"), PathBuf::from("../Platform"));
        assert_eq!(normalize_script_path("..\\"), PathBuf::from("../"));
    }
}
