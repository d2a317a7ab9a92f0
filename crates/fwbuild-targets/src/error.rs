//! Error types for target and toolchain operations.

use std::path::PathBuf;

use crate::cpu::{CoreGeneration, Vendor};

/// Errors that can occur while resolving or loading toolchains.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// No toolchain is registered for the requested combination.
    #[error("no toolchain registered for core {core}, vendor {vendor}, alternate compiler {alt_compiler}")]
    UnsupportedTarget {
        /// Requested core generation.
        core: CoreGeneration,
        /// Requested vendor family.
        vendor: Vendor,
        /// Whether the alternate compiler was requested.
        alt_compiler: bool,
    },

    /// Core generation text could not be parsed.
    #[error("invalid core generation '{input}' (expected e.g. M0, M3, Cortex-M4)")]
    InvalidCore {
        /// The rejected input.
        input: String,
    },

    /// Vendor family text could not be parsed.
    #[error("unknown vendor '{input}' (expected stm32 or gd32)")]
    InvalidVendor {
        /// The rejected input.
        input: String,
    },

    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading/writing toolchain files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Toolchain file not found.
    #[error("toolchain file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Validation error in a toolchain definition.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;
