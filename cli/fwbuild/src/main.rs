//! fwbuild CLI: drives multi-variant firmware library builds from `fwbuild.toml`.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use manifest::FwbuildManifest;

#[derive(Parser)]
#[command(name = "fwbuild", version, about = "Declarative firmware library builds")]
struct Cli {
    /// Log per-unit command lines and cache decisions
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new fwbuild project
    Init {
        /// Project name
        name: String,
    },
    /// Compile and archive every pass in fwbuild.toml
    Build {
        /// Manifest file (default: search upward for fwbuild.toml)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Run only the pass at this index (0-based)
        #[arg(long)]
        pass: Option<usize>,
        /// Worker threads (overrides [build] jobs)
        #[arg(long)]
        jobs: Option<usize>,
        /// Per-unit timeout in seconds, 0 to disable (overrides [build] timeout-secs)
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Ignore cached objects
        #[arg(long)]
        no_cache: bool,
        /// Report format (human, json)
        #[arg(long)]
        report: Option<String>,
    },
    /// Inspect and author toolchains
    Toolchain {
        #[command(subcommand)]
        action: ToolchainAction,
    },
    /// Remove object directories
    Clean,
    /// Check toolchain and project status
    Doctor,
}

#[derive(Subcommand)]
enum ToolchainAction {
    /// List every registered toolchain key
    List,
    /// Show the toolchain resolved for a target
    Describe {
        /// Core generation (M0, M3, Cortex-M4, 7, ...)
        core: String,
        /// Vendor family (stm32, gd32)
        #[arg(long, default_value = "stm32")]
        vendor: String,
        /// Request the alternate compiler
        #[arg(long)]
        alt: bool,
        /// Output format (default: human-readable, "toml" for TOML)
        #[arg(long)]
        format: Option<String>,
    },
    /// Validate a .toolchain.toml file
    Validate {
        /// Path to the definition
        file: PathBuf,
    },
    /// Write a template .toolchain.toml into the toolchains directory
    New {
        /// Toolchain name
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env("FWBUILD_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name } => commands::init::run(&name),

        Commands::Build {
            manifest,
            pass,
            jobs,
            timeout_secs,
            no_cache,
            report,
        } => {
            let (manifest, project_dir) = match manifest {
                Some(path) => load_manifest_file(&path)?,
                None => load_manifest_required(&cwd)?,
            };
            let overrides = commands::build::Overrides {
                pass,
                jobs,
                timeout_secs,
                no_cache,
            };
            commands::build::run(&project_dir, &manifest, &overrides, report.as_deref())
        }

        Commands::Toolchain { action } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or_else(|| cwd.clone());
            let toolchains_dir = match &manifest {
                Some(m) => m.toolchains_dir(&project_dir),
                None => project_dir.join("toolchains"),
            };
            match action {
                ToolchainAction::List => commands::toolchain::list(&toolchains_dir),
                ToolchainAction::Describe {
                    core,
                    vendor,
                    alt,
                    format,
                } => commands::toolchain::describe(
                    &toolchains_dir,
                    &core,
                    &vendor,
                    alt,
                    format.as_deref(),
                ),
                ToolchainAction::Validate { file } => commands::toolchain::validate(&file),
                ToolchainAction::New { name } => commands::toolchain::new(&name, &toolchains_dir),
            }
        }

        Commands::Clean => {
            let (manifest, project_dir) = load_manifest_required(&cwd)?;
            commands::clean::run(&manifest.object_dir(&project_dir))
        }

        Commands::Doctor => commands::doctor::run(&cwd),
    }
}

/// Load the manifest if one exists upward of `cwd`.
fn load_manifest_optional(
    cwd: &Path,
) -> anyhow::Result<(Option<FwbuildManifest>, Option<PathBuf>)> {
    match FwbuildManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}

/// Load the manifest or fail with a hint.
fn load_manifest_required(cwd: &Path) -> anyhow::Result<(FwbuildManifest, PathBuf)> {
    match FwbuildManifest::find_and_load(cwd)? {
        Some(found) => Ok(found),
        None => anyhow::bail!(
            "no {} found (searched upward from {}). Run 'fwbuild init <name>' to create a project.",
            manifest::MANIFEST_FILE,
            cwd.display()
        ),
    }
}

fn load_manifest_file(path: &Path) -> anyhow::Result<(FwbuildManifest, PathBuf)> {
    use anyhow::Context;

    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let manifest =
        FwbuildManifest::parse(&content).with_context(|| format!("parsing {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    Ok((manifest, dir))
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn cli_parses_build_overrides() {
        let cli = Cli::try_parse_from([
            "fwbuild",
            "build",
            "--pass",
            "1",
            "--jobs",
            "2",
            "--timeout-secs",
            "0",
            "--no-cache",
        ])
        .unwrap();
        match cli.command {
            Commands::Build {
                pass,
                jobs,
                timeout_secs,
                no_cache,
                ..
            } => {
                assert_eq!(pass, Some(1));
                assert_eq!(jobs, Some(2));
                assert_eq!(timeout_secs, Some(0));
                assert!(no_cache);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn cli_parses_toolchain_describe() {
        let cli = Cli::try_parse_from([
            "fwbuild", "-v", "toolchain", "describe", "M4", "--vendor", "gd32", "--alt",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Toolchain {
                action:
                    ToolchainAction::Describe {
                        core, vendor, alt, ..
                    },
            } => {
                assert_eq!(core, "M4");
                assert_eq!(vendor, "gd32");
                assert!(alt);
            }
            _ => panic!("expected toolchain describe"),
        }
    }

    #[test]
    fn required_manifest_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest_required(dir.path()).unwrap_err();
        assert!(err.to_string().contains("fwbuild.toml"));
    }

    #[test]
    fn explicit_manifest_file_sets_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, FwbuildManifest::template("explicit")).unwrap();
        let (manifest, project_dir) = load_manifest_file(&path).unwrap();
        assert_eq!(manifest.project.name, "explicit");
        assert_eq!(project_dir, dir.path());
    }

    #[test]
    fn init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("demo");
        commands::init::create_project(&project, "demo").unwrap();
        let (manifest, found) = load_manifest_required(&project.join("src")).unwrap();
        assert_eq!(manifest.project.name, "demo");
        assert_eq!(found, project);
    }
}
