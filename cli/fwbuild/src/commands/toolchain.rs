//! `fwbuild toolchain`: list, describe, validate and scaffold toolchains.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use fwbuild_targets::{
    discover_toolchains, generate_template, load_registry, load_toolchain_toml, toolchain_to_toml,
    validate_toolchain, CoreGeneration, MatchSpec, ToolSpec, ToolchainDefinition, Vendor,
};

/// List every registered key, built-in and custom.
pub fn list(toolchains_dir: &Path) -> Result<()> {
    let registry = load_registry(toolchains_dir)?;

    println!("Registered toolchains:");
    println!();
    println!("  {:<6} {:<7} {:<5} NAME", "CORE", "VENDOR", "ALT");
    for (key, toolchain) in registry.iter() {
        let alt = if key.alt_compiler { "yes" } else { "no" };
        println!(
            "  {:<6} {:<7} {:<5} {}",
            key.core.to_string(),
            key.vendor.to_string(),
            alt,
            toolchain.name
        );
    }

    let custom = discover_toolchains(toolchains_dir)?;
    if !custom.is_empty() {
        println!();
        println!("Custom definitions ({}):", toolchains_dir.display());
        for (name, path) in custom {
            println!("  {name:<25} {}", path.display());
        }
    }
    println!();
    println!("Use 'fwbuild toolchain describe <core>' for details.");
    Ok(())
}

/// Describe the toolchain a key resolves to.
pub fn describe(
    toolchains_dir: &Path,
    core: &str,
    vendor: &str,
    alt_compiler: bool,
    format: Option<&str>,
) -> Result<()> {
    let core: CoreGeneration = core.parse()?;
    let vendor: Vendor = vendor.parse()?;
    let registry = load_registry(toolchains_dir)?;
    let toolchain = registry.resolve(core, vendor, alt_compiler)?;

    if format == Some("toml") {
        let definition = ToolchainDefinition {
            matches: MatchSpec {
                cores: vec![core],
                vendors: vec![vendor],
                alt_compiler,
            },
            toolchain,
        };
        print!("{}", toolchain_to_toml(&definition)?);
        return Ok(());
    }

    println!("=== Toolchain: {} ===", toolchain.name);
    println!("Family: {}", toolchain.family);
    println!();

    println!("--- Tools ---");
    print_tool("C", &toolchain.c);
    print_tool("C++", &toolchain.cpp);
    print_tool("Asm", &toolchain.asm);
    print_tool("Archiver", &toolchain.archiver);
    println!();

    println!("--- Flags ---");
    println!("  Defines:  {}", toolchain.defines.join(" "));
    println!("  Debug:    {}", toolchain.debug_flags.join(" "));
    println!("  Release:  {}", toolchain.release_flags.join(" "));
    println!("  Tiny:     {}", toolchain.tiny_flags.join(" "));
    println!(
        "  Asm defines: {}",
        if toolchain.asm_defines { "passed" } else { "omitted" }
    );
    println!();

    println!("--- Files ---");
    for (ext, kind) in &toolchain.extensions {
        println!("  .{ext:<6} {kind:?}");
    }
    println!("  Objects:   .{}", toolchain.object_extension);
    println!("  Libraries: .{}", toolchain.library_extension);

    Ok(())
}

fn print_tool(role: &str, tool: &ToolSpec) {
    println!("  {role:<9} {} {}", tool.program, tool.flags.join(" "));
}

/// Validate a definition file, printing every issue. Fails on any error.
pub fn validate(file: &Path) -> Result<()> {
    let definition =
        load_toolchain_toml(file).with_context(|| format!("loading {}", file.display()))?;

    match validate_toolchain(&definition) {
        Ok(()) => {
            println!("{}: valid ({})", file.display(), definition.toolchain.name);
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                println!("  {}: {}", issue.severity, issue.message);
            }
            let errors = issues.iter().filter(|i| i.severity == "error").count();
            if errors > 0 {
                bail!("{}: {errors} error(s)", file.display());
            }
            println!("{}: valid with {} warning(s)", file.display(), issues.len());
            Ok(())
        }
    }
}

/// Write `<name>.toolchain.toml` into the toolchains directory.
pub fn new(name: &str, toolchains_dir: &Path) -> Result<()> {
    let path = toolchains_dir.join(format!("{name}.toolchain.toml"));
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::create_dir_all(toolchains_dir)
        .with_context(|| format!("creating {}", toolchains_dir.display()))?;
    fs::write(&path, generate_template(name)?)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_builtin_targets() {
        let dir = tempfile::tempdir().unwrap();
        assert!(describe(dir.path(), "M3", "stm32", false, None).is_ok());
        assert!(describe(dir.path(), "Cortex-M4", "gd32", true, Some("toml")).is_ok());
    }

    #[test]
    fn describe_unsupported_target_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(describe(dir.path(), "M9", "stm32", false, None).is_err());
        assert!(describe(dir.path(), "M0", "stm32", true, None).is_err());
        assert!(describe(dir.path(), "M3", "nxp", false, None).is_err());
    }

    #[test]
    fn new_template_validates_and_registers() {
        let dir = tempfile::tempdir().unwrap();
        let toolchains = dir.path().join("toolchains");
        new("board-gcc", &toolchains).unwrap();

        let path = toolchains.join("board-gcc.toolchain.toml");
        validate(&path).unwrap();
        assert!(new("board-gcc", &toolchains).is_err());

        let registry = load_registry(&toolchains).unwrap();
        let resolved = registry
            .resolve(CoreGeneration::M3, Vendor::Stm32, false)
            .unwrap();
        assert_eq!(resolved.name, "board-gcc");
        list(&toolchains).unwrap();
    }

    #[test]
    fn validate_rejects_broken_definition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toolchain.toml");
        let mut definition = fwbuild_targets::parse_toolchain_toml(
            &generate_template("broken").unwrap(),
        )
        .unwrap();
        definition.toolchain.library_extension = definition.toolchain.object_extension.clone();
        fs::write(&path, toolchain_to_toml(&definition).unwrap()).unwrap();

        assert!(validate(&path).is_err());
        assert!(validate(&dir.path().join("missing.toolchain.toml")).is_err());
    }
}
