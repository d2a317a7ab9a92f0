//! Session errors.

use fwbuild_compile::CompileError;
use fwbuild_sources::SourceError;
use fwbuild_targets::TargetError;
use thiserror::Error;

/// Errors from session transitions and the stages they drive.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is not initialized; call init first")]
    NotInitialized,

    #[error("session is already initialized")]
    AlreadyInitialized,

    #[error("no compile pass has run in this session")]
    NotCompiled,

    #[error("configuration changed since the last compile (revision {compiled} -> {current}); compile again before archiving")]
    StaleBuild { compiled: u64, current: u64 },

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Sources(#[from] SourceError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
