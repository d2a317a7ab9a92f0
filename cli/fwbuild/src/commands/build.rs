//! `fwbuild build`: configure a session from the manifest and run its passes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use fwbuild_compile::{
    CommandRunner, LibraryArtifact, PassResult, ProcessRunner, Toggles, UnitStatus,
};
use fwbuild_session::{BuildSession, InitOptions};
use fwbuild_sources::InclusionRule;
use serde::Serialize;
use tracing::info;

use crate::manifest::{FwbuildManifest, PassConfig};

/// Command-line overrides of the `[build]` section.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub pass: Option<usize>,
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub no_cache: bool,
}

/// Machine-readable summary of one archived pass.
#[derive(Debug, Serialize)]
struct PassSummary {
    toolchain: String,
    toggles: Toggles,
    library: String,
    sha256: String,
    size_bytes: u64,
    objects: usize,
    compiled: usize,
    cached: usize,
    duration_ms: u64,
}

impl PassSummary {
    fn new(pass: &PassResult, artifact: &LibraryArtifact) -> Self {
        Self {
            toolchain: pass.toolchain.clone(),
            toggles: artifact.snapshot.toggles,
            library: artifact.path.display().to_string(),
            sha256: artifact.sha256.clone(),
            size_bytes: artifact.size_bytes,
            objects: artifact.objects.len(),
            compiled: pass.count(UnitStatus::Compiled),
            cached: pass.count(UnitStatus::Cached),
            duration_ms: pass.duration_ms,
        }
    }
}

/// Build every pass (or the one selected) with real toolchain processes.
pub fn run(
    project_dir: &Path,
    manifest: &FwbuildManifest,
    overrides: &Overrides,
    report: Option<&str>,
) -> Result<()> {
    let json = match report {
        None | Some("human") => false,
        Some("json") => true,
        Some(other) => bail!("unknown report format: '{other}'. Use 'human' or 'json'."),
    };

    let summaries = run_with_runner(
        project_dir,
        manifest,
        overrides,
        Arc::new(ProcessRunner),
        !json,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }
    Ok(())
}

fn run_with_runner(
    project_dir: &Path,
    manifest: &FwbuildManifest,
    overrides: &Overrides,
    runner: Arc<dyn CommandRunner>,
    print: bool,
) -> Result<Vec<PassSummary>> {
    let passes = select_passes(manifest, overrides.pass)?;
    let mut session = configure(project_dir, manifest, overrides, runner)?;
    let default_output = manifest
        .target
        .output
        .clone()
        .unwrap_or_else(|| manifest.project.name.clone());

    let mut summaries = Vec::with_capacity(passes.len());
    for (index, pass) in passes {
        info!(
            pass = index,
            debug = pass.toggles.debug,
            assert = pass.toggles.assert,
            tiny = pass.toggles.tiny,
            "starting pass"
        );
        session.set_toggles(pass.toggles)?;

        let result = session.compile_all()?.clone();
        if print {
            println!("{result}");
        }
        if !result.is_success() {
            bail!(
                "pass {index} failed: {} unit(s) did not compile",
                result.failed_units().count()
            );
        }

        let output = pass.output.as_deref().unwrap_or(&default_output);
        let artifact = session
            .build_lib(output)
            .with_context(|| format!("archiving pass {index} to {output}"))?;
        if print {
            println!("{artifact}");
        }
        summaries.push(PassSummary::new(&result, artifact));
    }
    Ok(summaries)
}

fn select_passes(
    manifest: &FwbuildManifest,
    only: Option<usize>,
) -> Result<Vec<(usize, PassConfig)>> {
    let passes = manifest.passes();
    match only {
        None => Ok(passes.into_iter().enumerate().collect()),
        Some(index) => match passes.get(index) {
            Some(pass) => Ok(vec![(index, pass.clone())]),
            None => bail!(
                "pass {index} does not exist; the manifest declares {} pass(es)",
                passes.len()
            ),
        },
    }
}

/// A session carrying everything in the manifest except per-pass toggles.
fn configure(
    project_dir: &Path,
    manifest: &FwbuildManifest,
    overrides: &Overrides,
    runner: Arc<dyn CommandRunner>,
) -> Result<BuildSession> {
    let registry = fwbuild_targets::load_registry(&manifest.toolchains_dir(project_dir))
        .context("loading custom toolchains")?;

    let mut options = manifest.session_options(project_dir);
    if let Some(jobs) = overrides.jobs {
        options.jobs = jobs;
    }
    if let Some(secs) = overrides.timeout_secs {
        options.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if overrides.no_cache {
        options.use_cache = false;
    }

    let target = &manifest.target;
    let mut session = BuildSession::new(manifest.base_dir(project_dir), runner)
        .with_registry(registry)
        .with_options(options);
    session.init(InitOptions {
        core: target.core,
        alt_compiler: target.alt_compiler,
    })?;
    session.set_vendor(target.vendor)?;
    if let Some(output) = &target.output {
        session.set_output(output)?;
    }
    for define in &target.defines {
        session.add_define(define)?;
    }
    for include in &target.includes {
        session.add_includes(include)?;
    }
    for lib in &target.libs {
        session.add_lib(lib)?;
    }
    for (i, file) in manifest.files.iter().enumerate() {
        let rule = InclusionRule::from_script(
            &file.root,
            file.patterns.as_deref(),
            file.recursive,
            file.exclude.as_deref(),
        )
        .with_context(|| format!("files rule {i} ({})", file.root))?;
        session.add_files(rule)?;
    }

    let toolchain = session.toolchain()?;
    info!(toolchain = %toolchain.name, base_dir = %session.base_dir().display(), "configured");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use fwbuild_compile::runner::fake::FakeRunner;

    use super::*;

    const MANIFEST: &str = r#"
[project]
name = "Demo"

[target]
core = "M3"
defines = ["STM32F1"]
includes = ["inc"]

[build]
jobs = 2

[[files]]
root = "src"
patterns = "*.c;*.cpp"
exclude = "Skip"

[[pass]]

[[pass]]
debug = true
"#;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for rel in ["src/main.c", "src/Drivers/Uart.cpp", "src/SkipMe.c", "inc/board.h"] {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("// {rel}\n")).unwrap();
        }
        dir
    }

    #[test]
    fn builds_every_pass() {
        let dir = project();
        let manifest = FwbuildManifest::parse(MANIFEST).unwrap();
        let runner = Arc::new(FakeRunner::new());

        let summaries = run_with_runner(
            dir.path(),
            &manifest,
            &Overrides::default(),
            runner.clone(),
            false,
        )
        .unwrap();

        assert_eq!(summaries.len(), 2);
        assert!(dir.path().join("Demo.lib").is_file());
        assert!(dir.path().join("Demo-debug.lib").is_file());
        assert_eq!(summaries[0].objects, 2);
        assert_eq!(summaries[1].compiled, 2);
        assert!(summaries[1].toggles.debug);

        let main_call = runner
            .invocations()
            .into_iter()
            .find(|c| c.args.iter().any(|a| a.ends_with("main.c")))
            .unwrap();
        assert!(main_call.args.contains(&"-DSTM32F1".to_string()));
        assert!(!runner
            .invocations()
            .iter()
            .any(|c| c.args.iter().any(|a| a.ends_with("SkipMe.c"))));
    }

    #[test]
    fn selected_pass_only() {
        let dir = project();
        let manifest = FwbuildManifest::parse(MANIFEST).unwrap();
        let overrides = Overrides {
            pass: Some(1),
            ..Overrides::default()
        };
        let summaries =
            run_with_runner(dir.path(), &manifest, &overrides, Arc::new(FakeRunner::new()), false)
                .unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(!dir.path().join("Demo.lib").exists());
        assert!(dir.path().join("Demo-debug.lib").is_file());
    }

    #[test]
    fn rejects_missing_pass_index() {
        let manifest = FwbuildManifest::parse(MANIFEST).unwrap();
        assert!(select_passes(&manifest, Some(2)).is_err());
    }

    #[test]
    fn failed_unit_stops_before_archive() {
        let dir = project();
        let manifest = FwbuildManifest::parse(MANIFEST).unwrap();
        let runner = Arc::new(FakeRunner::new().fail_when("Uart.cpp"));
        let err = run_with_runner(dir.path(), &manifest, &Overrides::default(), runner, false)
            .unwrap_err();
        assert!(err.to_string().contains("pass 0 failed"));
        assert!(!dir.path().join("Demo.lib").exists());
    }

    #[test]
    fn rebuild_uses_cache_unless_disabled() {
        let dir = project();
        let manifest = FwbuildManifest::parse(MANIFEST).unwrap();
        let only_first = Overrides {
            pass: Some(0),
            ..Overrides::default()
        };
        run_with_runner(dir.path(), &manifest, &only_first, Arc::new(FakeRunner::new()), false)
            .unwrap();

        let again =
            run_with_runner(dir.path(), &manifest, &only_first, Arc::new(FakeRunner::new()), false)
                .unwrap();
        assert_eq!(again[0].cached, 2);

        let forced = Overrides {
            no_cache: true,
            ..only_first
        };
        let forced =
            run_with_runner(dir.path(), &manifest, &forced, Arc::new(FakeRunner::new()), false)
                .unwrap();
        assert_eq!(forced[0].compiled, 2);
    }

    #[test]
    fn unknown_report_format_is_rejected() {
        let dir = project();
        let manifest = FwbuildManifest::parse(MANIFEST).unwrap();
        assert!(run(dir.path(), &manifest, &Overrides::default(), Some("xml")).is_err());
    }
}
