//! Compilation and packaging for fwbuild.
//!
//! A pass compiles every resolved source file against one configuration
//! snapshot; the archiver then packages the resulting objects into a static
//! library.
//!
//! ```text
//! ConfigSnapshot + ToolchainDescriptor + [ResolvedSourceFile]
//!     -> CompileDriver::compile_all -> PassResult
//!     -> Archiver::build_lib -> LibraryArtifact
//! ```

pub mod archive;
pub mod config;
pub mod driver;
pub mod error;
pub mod fingerprint;
pub mod report;
pub mod runner;

pub use archive::{Archiver, LibraryArtifact};
pub use config::{ConfigSnapshot, ConfigurationContext, Toggles};
pub use driver::{
    CompilationUnitResult, CompileDriver, DriverOptions, PassOutcome, PassResult, UnitStatus,
};
pub use error::{CompileError, Result};
pub use runner::{CancelToken, CommandOutput, CommandRunner, CommandSpec, ProcessRunner, RunStatus};
