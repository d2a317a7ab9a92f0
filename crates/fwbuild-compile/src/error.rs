//! Compile and archive errors.
//!
//! Per-file failures are unit statuses on the pass, not errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a compile pass or an archive step.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("pass is incomplete: {failed} unit(s) failed, {cancelled} cancelled")]
    IncompleteBuild { failed: usize, cancelled: usize },

    #[error("archiver did not produce {}: {diagnostics}", path.display())]
    ArchiveFailed { path: PathBuf, diagnostics: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pass produced no objects to archive")]
    NoObjects,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CompileError>;
