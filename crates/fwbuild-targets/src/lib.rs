//! Target model and toolchain resolution for fwbuild.
//!
//! A build target is identified by three keys:
//! - **Core generation:** the ARM Cortex-M core (M0, M3, M4, M7)
//! - **Vendor family:** the MCU vendor SDK (STM32, GD32)
//! - **Alternate compiler:** whether the alternate compiler front-end is requested
//!
//! The [`ToolchainRegistry`] maps each key to exactly one [`ToolchainDescriptor`].

pub mod cpu;
pub mod error;
pub mod parse;
pub mod registry;
pub mod toolchain;

pub use cpu::{CompilerFamily, CoreGeneration, Vendor};
pub use error::{Result, TargetError};
pub use parse::{
    discover_toolchains, generate_template, load_registry, load_toolchain_toml,
    parse_toolchain_toml, toolchain_to_toml, validate_toolchain, ValidationIssue,
};
pub use registry::{resolve, MatchSpec, ToolchainDefinition, ToolchainKey, ToolchainRegistry};
pub use toolchain::{SourceKind, ToolSpec, ToolchainDescriptor};
