//! `fwbuild doctor`: toolchain diagnostics.

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use fwbuild_targets::{load_registry, CompilerFamily, ToolchainDescriptor};

use crate::manifest::FwbuildManifest;

/// Print project and toolchain diagnostic information.
pub fn run(project_dir: &Path) -> Result<()> {
    println!("=== fwbuild Doctor ===");
    println!();
    println!("fwbuild version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("--- Project Status ---");
    let found = match FwbuildManifest::find_and_load(project_dir) {
        Ok(Some((manifest, dir))) => {
            println!("  fwbuild.toml: found at {}", dir.display());
            println!("  Project:      {}", manifest.project.name);
            println!("  Base dir:     {}", manifest.base_dir(&dir).display());
            println!("  Passes:       {}", manifest.passes().len());
            Some((manifest, dir))
        }
        Ok(None) => {
            println!("  fwbuild.toml: not found");
            None
        }
        Err(e) => {
            println!("  fwbuild.toml: error: {e:#}");
            None
        }
    };
    println!();

    let Some((manifest, dir)) = found else {
        return Ok(());
    };

    let target = &manifest.target;
    println!(
        "--- Toolchain: {} {} (alt compiler: {}) ---",
        target.core,
        target.vendor,
        if target.alt_compiler { "yes" } else { "no" }
    );
    let resolved = load_registry(&manifest.toolchains_dir(&dir))
        .and_then(|registry| registry.resolve(target.core, target.vendor, target.alt_compiler));
    match resolved {
        Ok(toolchain) => {
            println!("  Resolved: {}", toolchain.name);
            for program in programs(&toolchain) {
                print_tool_status(program, version_args(toolchain.family, program));
            }
        }
        Err(e) => println!("  Not resolvable: {e}"),
    }

    Ok(())
}

/// Distinct programs a toolchain invokes, in first-use order.
fn programs(toolchain: &ToolchainDescriptor) -> Vec<&str> {
    let mut programs: Vec<&str> = Vec::new();
    for tool in [&toolchain.c, &toolchain.cpp, &toolchain.asm, &toolchain.archiver] {
        if !programs.contains(&tool.program.as_str()) {
            programs.push(&tool.program);
        }
    }
    programs
}

fn version_args(family: CompilerFamily, program: &str) -> &'static [&'static str] {
    match family {
        // armar and armasm only answer --vsn, even under armclang.
        CompilerFamily::Armcc => &["--vsn"],
        CompilerFamily::Armclang if program != "armclang" => &["--vsn"],
        _ => &["--version"],
    }
}

fn print_tool_status(name: &str, args: &[&str]) {
    match Command::new(name).args(args).output() {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first_line = stdout
                .lines()
                .chain(stderr.lines())
                .find(|l| !l.trim().is_empty())
                .unwrap_or("(unknown version)");
            println!("  {name}: {first_line}");
        }
        Err(_) => {
            println!("  {name}: not found");
        }
    }
}

#[cfg(test)]
mod tests {
    use fwbuild_targets::{CoreGeneration, Vendor};

    use super::*;

    #[test]
    fn doctor_runs_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path()).unwrap();
    }

    #[test]
    fn doctor_runs_with_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fwbuild.toml"),
            FwbuildManifest::template("doc"),
        )
        .unwrap();
        run(dir.path()).unwrap();
    }

    #[test]
    fn programs_are_deduplicated() {
        let toolchain = ToolchainDescriptor::armcc(CoreGeneration::M3, Vendor::Stm32);
        assert_eq!(programs(&toolchain), vec!["armcc", "armasm", "armar"]);
        assert_eq!(version_args(CompilerFamily::Armclang, "armclang"), &["--version"]);
        assert_eq!(version_args(CompilerFamily::Armclang, "armar"), &["--vsn"]);
    }
}
