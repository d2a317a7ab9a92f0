//! Build sessions for fwbuild.
//!
//! A [`BuildSession`] owns the target configuration and the source set and
//! drives any number of compile-then-archive passes over them, checking each
//! transition against an explicit [`SessionState`].

pub mod error;
pub mod naming;
pub mod session;

pub use error::{Result, SessionError};
pub use naming::ArtifactNaming;
pub use session::{BuildSession, CompletedPass, InitOptions, SessionOptions, SessionState};
