//! Source discovery for fwbuild.
//!
//! A [`SourceSet`] accumulates include directories and [`InclusionRule`]s and
//! resolves them into a deduplicated, deterministically ordered list of
//! [`ResolvedSourceFile`]s.

pub mod error;
pub mod pattern;
pub mod rule;
pub mod set;

pub use error::{Result, SourceError};
pub use pattern::{normalize_script_path, split_list, FilePattern, DEFAULT_PATTERNS};
pub use rule::InclusionRule;
pub use set::{ResolvedSourceFile, SourceSet};
