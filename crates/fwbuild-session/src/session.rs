//! The build session state machine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fwbuild_compile::{
    Archiver, CancelToken, CommandRunner, CompileDriver, ConfigSnapshot, ConfigurationContext,
    DriverOptions, LibraryArtifact, PassResult, Toggles,
};
use fwbuild_sources::{normalize_script_path, InclusionRule, SourceSet};
use fwbuild_targets::{CoreGeneration, ToolchainDescriptor, ToolchainRegistry, Vendor};
use tracing::info;

use crate::error::{Result, SessionError};
use crate::naming::ArtifactNaming;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Configured,
    Compiled,
    Archived,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::Configured => "configured",
            SessionState::Compiled => "compiled",
            SessionState::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// Toolchain lookup defaults fixed at `init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitOptions {
    pub core: CoreGeneration,
    pub alt_compiler: bool,
}

/// Session-wide build settings.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Root for object directories; relative paths resolve against the base directory.
    pub object_root: PathBuf,
    pub jobs: usize,
    pub timeout: Option<Duration>,
    pub use_cache: bool,
    pub naming: ArtifactNaming,
}

impl Default for SessionOptions {
    fn default() -> Self {
        let driver = DriverOptions::default();
        Self {
            object_root: driver.object_dir,
            jobs: driver.jobs,
            timeout: driver.timeout,
            use_cache: driver.use_cache,
            naming: ArtifactNaming::default(),
        }
    }
}

/// The most recent pass together with what it was compiled against.
#[derive(Debug, Clone)]
pub struct CompletedPass {
    pub toolchain: ToolchainDescriptor,
    pub snapshot: ConfigSnapshot,
    pub result: PassResult,
}

/// One build description driven through repeated compile and archive passes.
pub struct BuildSession {
    base_dir: PathBuf,
    state: SessionState,
    config: ConfigurationContext,
    sources: SourceSet,
    registry: ToolchainRegistry,
    runner: Arc<dyn CommandRunner>,
    options: SessionOptions,
    cancel: CancelToken,
    last_pass: Option<CompletedPass>,
    artifacts: Vec<LibraryArtifact>,
}

impl BuildSession {
    /// A session rooted at `base_dir` using the built-in toolchains.
    pub fn new(base_dir: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        let base_dir = base_dir.into();
        Self {
            sources: SourceSet::new(base_dir.clone()),
            base_dir,
            state: SessionState::Unconfigured,
            config: ConfigurationContext::default(),
            registry: ToolchainRegistry::builtin(),
            runner,
            options: SessionOptions::default(),
            cancel: CancelToken::new(),
            last_pass: None,
            artifacts: Vec::new(),
        }
    }

    pub fn with_registry(mut self, registry: ToolchainRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config(&self) -> &ConfigurationContext {
        &self.config
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn last_pass(&self) -> Option<&CompletedPass> {
        self.last_pass.as_ref()
    }

    /// Libraries written so far, oldest first.
    pub fn artifacts(&self) -> &[LibraryArtifact] {
        &self.artifacts
    }

    /// A handle that cancels the pass currently running (or the next one to start).
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Initialize once. The base directory becomes the first include path.
    pub fn init(&mut self, options: InitOptions) -> Result<()> {
        if self.state != SessionState::Unconfigured {
            return Err(SessionError::AlreadyInitialized);
        }
        self.config = ConfigurationContext::new(options.core, options.alt_compiler);
        self.sources.add_include_path(self.base_dir.clone());
        self.state = SessionState::Configured;
        info!(
            base_dir = %self.base_dir.display(),
            core = %options.core,
            alt_compiler = options.alt_compiler,
            "session initialized"
        );
        Ok(())
    }

    pub fn set_core(&mut self, core: CoreGeneration) -> Result<()> {
        self.mutate(|c| c.set_core(core))
    }

    pub fn set_vendor(&mut self, vendor: Vendor) -> Result<()> {
        self.mutate(|c| c.set_vendor(vendor))
    }

    pub fn set_alt_compiler(&mut self, alt_compiler: bool) -> Result<()> {
        self.mutate(|c| c.set_alt_compiler(alt_compiler))
    }

    pub fn set_output(&mut self, output: &str) -> Result<()> {
        self.mutate(|c| c.set_output(output))
    }

    pub fn set_debug(&mut self, debug: bool) -> Result<()> {
        self.mutate(|c| c.set_debug(debug))
    }

    pub fn set_assert(&mut self, assert: bool) -> Result<()> {
        self.mutate(|c| c.set_assert(assert))
    }

    pub fn set_tiny(&mut self, tiny: bool) -> Result<()> {
        self.mutate(|c| c.set_tiny(tiny))
    }

    pub fn set_toggles(&mut self, toggles: Toggles) -> Result<()> {
        self.mutate(|c| c.set_toggles(toggles))
    }

    pub fn add_define(&mut self, define: &str) -> Result<()> {
        self.mutate(|c| {
            c.add_define(define);
        })
    }

    /// Add a library dependency archived after the compiled objects.
    pub fn add_lib(&mut self, lib: impl AsRef<Path>) -> Result<()> {
        let lib = self.resolve_path(lib.as_ref());
        self.mutate(|c| {
            c.add_lib(lib);
        })
    }

    pub fn clear_libs(&mut self) -> Result<()> {
        self.mutate(ConfigurationContext::clear_libs)
    }

    /// Add an include directory. Script-style separators are accepted.
    pub fn add_includes(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.require_configured()?;
        self.sources.add_include_path(path);
        self.mutate(ConfigurationContext::touch)
    }

    /// Register a file inclusion rule.
    pub fn add_files(&mut self, rule: InclusionRule) -> Result<()> {
        self.require_configured()?;
        self.sources.add_files(rule);
        self.mutate(ConfigurationContext::touch)
    }

    /// Toolchain for the current configuration.
    pub fn toolchain(&self) -> Result<ToolchainDescriptor> {
        Ok(self.registry.resolve(
            self.config.core(),
            self.config.vendor(),
            self.config.alt_compiler(),
        )?)
    }

    /// Resolve sources and compile them all. Unit failures are recorded on the
    /// returned pass; the session still moves to `Compiled`.
    pub fn compile_all(&mut self) -> Result<&PassResult> {
        self.require_configured()?;
        // A new pass supersedes the old one even when it aborts.
        self.last_pass = None;
        self.state = SessionState::Configured;

        let toolchain = self.toolchain()?;
        let files = self
            .sources
            .resolve_with(|path| toolchain.kind_for_path(path))?;
        let snapshot = self.config.snapshot(self.sources.include_paths());

        let driver = CompileDriver::new(
            self.runner.clone(),
            DriverOptions {
                object_dir: self.object_dir(&toolchain, snapshot.toggles),
                jobs: self.options.jobs,
                timeout: self.options.timeout,
                use_cache: self.options.use_cache,
            },
        );
        let result = driver.compile_all(&toolchain, &snapshot, &files, &self.cancel);
        self.cancel.reset();
        let result = result?;

        self.state = SessionState::Compiled;
        let pass = self.last_pass.insert(CompletedPass {
            toolchain,
            snapshot,
            result,
        });
        Ok(&pass.result)
    }

    /// Archive the last pass to `output` (relative to the base directory),
    /// named according to the session's [`ArtifactNaming`] policy.
    pub fn build_lib(&mut self, output: impl AsRef<Path>) -> Result<&LibraryArtifact> {
        self.require_configured()?;
        let pass = self.last_pass.as_ref().ok_or(SessionError::NotCompiled)?;
        if pass.snapshot.revision != self.config.revision() {
            return Err(SessionError::StaleBuild {
                compiled: pass.snapshot.revision,
                current: self.config.revision(),
            });
        }

        let output = self.resolve_path(output.as_ref());
        let named = self.options.naming.apply(
            &output,
            pass.snapshot.toggles,
            &pass.toolchain.library_extension,
        );
        let artifact = Archiver::new(self.runner.clone())
            .with_timeout(self.options.timeout)
            .build_lib(&named, &pass.toolchain, &pass.snapshot, &pass.result)?;

        self.state = SessionState::Archived;
        self.artifacts.push(artifact);
        match self.artifacts.last() {
            Some(artifact) => Ok(artifact),
            None => Err(SessionError::NotCompiled),
        }
    }

    fn require_configured(&self) -> Result<()> {
        if self.state == SessionState::Unconfigured {
            return Err(SessionError::NotInitialized);
        }
        Ok(())
    }

    /// Apply a configuration change. An effective change after a pass drops the
    /// session back to `Configured`; the stale pass is kept so that archiving
    /// it reports `StaleBuild`.
    fn mutate(&mut self, change: impl FnOnce(&mut ConfigurationContext)) -> Result<()> {
        self.require_configured()?;
        let before = self.config.revision();
        change(&mut self.config);
        if self.config.revision() != before
            && matches!(self.state, SessionState::Compiled | SessionState::Archived)
        {
            self.state = SessionState::Configured;
        }
        Ok(())
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        let path = match path.to_str() {
            Some(s) => normalize_script_path(s),
            None => path.to_path_buf(),
        };
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    /// `<object_root>/<output or toolchain>/<variant>`, so variants keep separate objects.
    fn object_dir(&self, toolchain: &ToolchainDescriptor, toggles: Toggles) -> PathBuf {
        let group = match self.config.output() {
            "" => toolchain.name.as_str(),
            output => output,
        };
        let tokens = toggles.variant_tokens();
        let variant = if tokens.is_empty() {
            "release".to_string()
        } else {
            tokens.join("-")
        };
        self.resolve_path(&self.options.object_root).join(group).join(variant)
    }
}
