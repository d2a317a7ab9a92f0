//! TOML parsing, serialization, validation, and discovery for toolchain definitions.
//!
//! Custom toolchains are stored as `.toolchain.toml` files in a project's
//! toolchains directory and layered over the built-in registry.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::cpu::{CoreGeneration, Vendor};
use crate::error::{Result, TargetError};
use crate::registry::{MatchSpec, ToolchainDefinition, ToolchainRegistry};
use crate::toolchain::ToolchainDescriptor;

const TOOLCHAIN_SUFFIX: &str = ".toolchain.toml";

/// A validation issue found in a toolchain definition.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Load a toolchain definition from a `.toolchain.toml` file.
pub fn load_toolchain_toml(path: &Path) -> Result<ToolchainDefinition> {
    if !path.exists() {
        return Err(TargetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_toolchain_toml(&content)
}

/// Parse a toolchain definition from a TOML string.
pub fn parse_toolchain_toml(toml_str: &str) -> Result<ToolchainDefinition> {
    let definition: ToolchainDefinition = toml::from_str(toml_str)?;
    Ok(definition)
}

/// Serialize a toolchain definition to pretty TOML.
pub fn toolchain_to_toml(definition: &ToolchainDefinition) -> Result<String> {
    let toml_str = toml::to_string_pretty(definition)?;
    Ok(toml_str)
}

/// Validate a toolchain definition for structural correctness.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
pub fn validate_toolchain(
    definition: &ToolchainDefinition,
) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let tc = &definition.toolchain;

    if definition.matches.cores.is_empty() || definition.matches.vendors.is_empty() {
        issues.push(ValidationIssue {
            severity: "error",
            message: "match section covers no (core, vendor) combination".into(),
        });
    }

    for (role, tool) in [
        ("c", &tc.c),
        ("cpp", &tc.cpp),
        ("asm", &tc.asm),
        ("archiver", &tc.archiver),
    ] {
        if tool.program.trim().is_empty() {
            issues.push(ValidationIssue {
                severity: "error",
                message: format!("{role} tool has an empty program"),
            });
        }
    }

    if tc.extensions.is_empty() {
        issues.push(ValidationIssue {
            severity: "error",
            message: "extension map is empty; no file could be compiled".into(),
        });
    }

    for ext in tc.extensions.keys() {
        if ext.starts_with('.') || ext.chars().any(|c| c.is_ascii_uppercase()) {
            issues.push(ValidationIssue {
                severity: "error",
                message: format!("extension '{ext}' must be lowercase and without a leading dot"),
            });
        }
    }

    if tc.library_extension.trim().is_empty() {
        issues.push(ValidationIssue {
            severity: "error",
            message: "library-extension is empty".into(),
        });
    }

    if tc.object_extension.eq_ignore_ascii_case(&tc.library_extension) {
        issues.push(ValidationIssue {
            severity: "error",
            message: format!(
                "object-extension and library-extension are both '{}'",
                tc.object_extension
            ),
        });
    }

    let mut seen = BTreeSet::new();
    for core in &definition.matches.cores {
        if !seen.insert(*core) {
            issues.push(ValidationIssue {
                severity: "warning",
                message: format!("core {core} listed more than once"),
            });
        }
    }

    if tc.release_flags.is_empty() && tc.tiny_flags.is_empty() {
        issues.push(ValidationIssue {
            severity: "warning",
            message: "no release or tiny flags; non-debug builds will be unoptimized".into(),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Generate a template `.toolchain.toml` for a new toolchain.
///
/// Seeds from the ARM Compiler 5 Cortex-M3 descriptor with the given name.
pub fn generate_template(name: &str) -> Result<String> {
    let mut toolchain = ToolchainDescriptor::armcc(CoreGeneration::M3, Vendor::Stm32);
    toolchain.name = name.into();
    toolchain_to_toml(&ToolchainDefinition {
        matches: MatchSpec {
            cores: vec![CoreGeneration::M3],
            vendors: vec![Vendor::Stm32],
            alt_compiler: false,
        },
        toolchain,
    })
}

/// Discover all `.toolchain.toml` files in a directory.
///
/// Returns a list of (toolchain_name, file_path) pairs sorted by name.
pub fn discover_toolchains(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(stem) = file_name.strip_suffix(TOOLCHAIN_SUFFIX) {
            found.push((stem.to_string(), path.clone()));
        }
    }
    found.sort();
    Ok(found)
}

/// Built-in registry overlaid with every valid definition found in `dir`.
pub fn load_registry(dir: &Path) -> Result<ToolchainRegistry> {
    let mut registry = ToolchainRegistry::builtin();
    for (name, path) in discover_toolchains(dir)? {
        let definition = load_toolchain_toml(&path)?;
        if let Err(issues) = validate_toolchain(&definition) {
            if let Some(issue) = issues.iter().find(|i| i.severity == "error") {
                return Err(TargetError::Validation {
                    detail: format!("{name}: {}", issue.message),
                });
            }
        }
        registry.register(definition);
    }
    Ok(registry)
}
