//! Content fingerprints that let a pass skip units whose inputs did not change.
//!
//! The fingerprint of a unit is the SHA-256 of the toolchain name, the full
//! command line and the source file's bytes. It is stored in a sidecar file
//! next to the object (`foo-1a2b3c4d.o.fp`).

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::runner::CommandSpec;

const SIDECAR_SUFFIX: &str = ".fp";

/// Compute the fingerprint for compiling `source` with `command`.
pub fn unit_fingerprint(
    toolchain: &str,
    command: &CommandSpec,
    source: &Path,
) -> std::io::Result<String> {
    let content = fs::read(source)?;
    let mut hasher = Sha256::new();
    hasher.update(toolchain.as_bytes());
    hasher.update([0u8]);
    hasher.update(command.program.as_bytes());
    for arg in &command.args {
        hasher.update([0u8]);
        hasher.update(arg.as_bytes());
    }
    hasher.update([0u8]);
    hasher.update(&content);
    Ok(hex(&hasher.finalize()))
}

/// Sidecar path for an object file.
pub fn sidecar_path(object: &Path) -> PathBuf {
    let mut name = object.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Whether `object` exists and was produced from inputs with `fingerprint`.
pub fn is_fresh(object: &Path, fingerprint: &str) -> bool {
    if !object.is_file() {
        return false;
    }
    fs::read_to_string(sidecar_path(object))
        .map(|recorded| recorded.trim() == fingerprint)
        .unwrap_or(false)
}

/// Record the fingerprint after a successful compile.
pub fn record(object: &Path, fingerprint: &str) -> std::io::Result<()> {
    fs::write(sidecar_path(object), fingerprint)
}

/// Remove an object and its sidecar so a failed compile cannot leave a stale hit.
pub fn invalidate(object: &Path) -> std::io::Result<()> {
    for path in [object.to_path_buf(), sidecar_path(object)] {
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// SHA-256 of a file, lowercase hex.
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex(&Sha256::digest(&bytes)))
}

/// Short stable tag for a path, used to keep object names unique when two
/// sources share a stem.
pub fn path_tag(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    hex(&digest[..4])
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
