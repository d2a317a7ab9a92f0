//! Static library packaging.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fwbuild_targets::ToolchainDescriptor;
use tracing::{info, warn};

use crate::config::ConfigSnapshot;
use crate::driver::{PassOutcome, PassResult, UnitStatus};
use crate::error::{CompileError, Result};
use crate::fingerprint::file_sha256;
use crate::runner::{CancelToken, CommandRunner, CommandSpec};

/// A library written by [`Archiver::build_lib`].
#[derive(Debug, Clone)]
pub struct LibraryArtifact {
    pub path: PathBuf,
    /// Objects in the order they were archived.
    pub objects: Vec<PathBuf>,
    /// Configuration the objects were compiled with.
    pub snapshot: ConfigSnapshot,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Runs the toolchain archiver over a successful pass.
pub struct Archiver {
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl Archiver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Package every object of `pass`, followed by the snapshot's library
    /// dependencies, into one static library at `output`.
    ///
    /// The toolchain's library extension is appended when missing. The
    /// archiver writes a sibling staging file that replaces the final path
    /// only once it succeeds, so a failed archive leaves any previous library
    /// untouched. Nothing is written when the pass did not fully succeed.
    pub fn build_lib(
        &self,
        output: &Path,
        toolchain: &ToolchainDescriptor,
        snapshot: &ConfigSnapshot,
        pass: &PassResult,
    ) -> Result<LibraryArtifact> {
        if pass.outcome != PassOutcome::Succeeded {
            return Err(CompileError::IncompleteBuild {
                failed: pass.failed_units().count(),
                cancelled: pass.count(UnitStatus::Cancelled),
            });
        }
        if pass.units.is_empty() {
            return Err(CompileError::NoObjects);
        }

        let path = toolchain.library_path(output);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let staging = staging_path(&path);
        remove_if_present(&staging)?;

        let objects: Vec<PathBuf> = pass.objects().into_iter().map(Path::to_path_buf).collect();
        let command = CommandSpec::new(toolchain.archiver.program.clone())
            .args(toolchain.archiver.flags.iter().cloned())
            .arg(staging.display().to_string())
            .args(objects.iter().map(|o| o.display().to_string()))
            .args(snapshot.libs.iter().map(|l| l.display().to_string()));

        let out = self
            .runner
            .run(&command, self.timeout, &CancelToken::new())
            .map_err(|source| {
                let _ = remove_if_present(&staging);
                CompileError::Spawn {
                    program: command.program.clone(),
                    source,
                }
            })?;

        if !out.success() || !staging.is_file() {
            let _ = remove_if_present(&staging);
            let diagnostics = match out.diagnostics() {
                d if d.is_empty() => format!("{} reported {:?}", command.program, out.status),
                d => d,
            };
            warn!(library = %path.display(), "archiving failed");
            return Err(CompileError::ArchiveFailed { path, diagnostics });
        }
        std::fs::rename(&staging, &path)?;

        let sha256 = file_sha256(&path)?;
        let size_bytes = std::fs::metadata(&path)?.len();
        info!(
            library = %path.display(),
            objects = objects.len(),
            size_bytes,
            "library written"
        );
        Ok(LibraryArtifact {
            path,
            objects,
            snapshot: snapshot.clone(),
            sha256,
            size_bytes,
        })
    }
}

/// Sibling staging file for `path`: `<dir>/.partial-<name>`.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".partial-{name}"))
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
