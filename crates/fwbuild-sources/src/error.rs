//! Source discovery errors.

use thiserror::Error;

/// Errors that can occur while registering or resolving source rules.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Every rule was applied and no file matched.
    #[error("no source files matched {rules} inclusion rule(s)")]
    NoSourceFiles { rules: usize },

    /// A filename pattern could not be compiled.
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Directory traversal failed below an existing rule root.
    #[error("walking source tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
