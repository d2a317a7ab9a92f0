//! Compile driver: turns resolved source files into object files.
//!
//! Units run on a bounded pool of scoped worker threads fed through a job
//! channel. Each worker reports `(index, result)` back to the calling thread,
//! which stores it in the slot for that index, so results come back in
//! resolved order no matter which worker finished first.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use fwbuild_sources::ResolvedSourceFile;
use fwbuild_targets::{SourceKind, ToolchainDescriptor};
use tracing::{debug, info, warn};

use crate::config::ConfigSnapshot;
use crate::error::Result;
use crate::fingerprint;
use crate::runner::{CancelToken, CommandRunner, CommandSpec, RunStatus};

/// Per-unit timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Knobs for a compile pass.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Directory receiving object files and fingerprint sidecars.
    pub object_dir: PathBuf,
    /// Worker threads; 0 means available parallelism.
    pub jobs: usize,
    /// Per-unit subprocess timeout.
    pub timeout: Option<Duration>,
    /// Skip units whose fingerprint matches the recorded one.
    pub use_cache: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            object_dir: PathBuf::from("obj"),
            jobs: 0,
            timeout: Some(DEFAULT_TIMEOUT),
            use_cache: true,
        }
    }
}

/// How one unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    Compiled,
    Cached,
    Failed,
    TimedOut,
    Cancelled,
}

impl UnitStatus {
    /// Whether the unit left a usable object behind.
    pub fn is_success(self) -> bool {
        matches!(self, UnitStatus::Compiled | UnitStatus::Cached)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitStatus::Compiled => "compiled",
            UnitStatus::Cached => "cached",
            UnitStatus::Failed => "failed",
            UnitStatus::TimedOut => "timed out",
            UnitStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Result for a single source file.
#[derive(Debug, Clone)]
pub struct CompilationUnitResult {
    pub source: PathBuf,
    pub kind: SourceKind,
    pub object: PathBuf,
    pub status: UnitStatus,
    /// Captured tool output, empty for cached units.
    pub diagnostics: String,
    pub elapsed: Duration,
}

/// Pass-level verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for PassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassOutcome::Succeeded => f.write_str("SUCCEEDED"),
            PassOutcome::Failed => f.write_str("FAILED"),
            PassOutcome::Cancelled => f.write_str("CANCELLED"),
        }
    }
}

/// Everything one `compile_all` produced.
#[derive(Debug, Clone)]
pub struct PassResult {
    /// Toolchain name used for every unit.
    pub toolchain: String,
    /// Configuration revision the pass compiled.
    pub revision: u64,
    /// Units in resolved order.
    pub units: Vec<CompilationUnitResult>,
    pub outcome: PassOutcome,
    pub duration_ms: u64,
}

impl PassResult {
    pub fn is_success(&self) -> bool {
        self.outcome == PassOutcome::Succeeded
    }

    /// Number of units with the given status.
    pub fn count(&self, status: UnitStatus) -> usize {
        self.units.iter().filter(|u| u.status == status).count()
    }

    /// Units that failed or timed out.
    pub fn failed_units(&self) -> impl Iterator<Item = &CompilationUnitResult> {
        self.units
            .iter()
            .filter(|u| matches!(u.status, UnitStatus::Failed | UnitStatus::TimedOut))
    }

    /// Object files in resolved order.
    pub fn objects(&self) -> Vec<&Path> {
        self.units.iter().map(|u| u.object.as_path()).collect()
    }
}

/// Runs compile passes through a [`CommandRunner`].
pub struct CompileDriver {
    runner: Arc<dyn CommandRunner>,
    options: DriverOptions,
}

impl CompileDriver {
    pub fn new(runner: Arc<dyn CommandRunner>, options: DriverOptions) -> Self {
        Self { runner, options }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Compile every file. Per-unit failures do not stop the pass; they are
    /// recorded on the result. Only setup failures (object directory) are errors.
    pub fn compile_all(
        &self,
        toolchain: &ToolchainDescriptor,
        snapshot: &ConfigSnapshot,
        files: &[ResolvedSourceFile],
        cancel: &CancelToken,
    ) -> Result<PassResult> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.options.object_dir)?;

        let workers = self.worker_count(files.len());
        info!(
            toolchain = %toolchain.name,
            units = files.len(),
            workers,
            revision = snapshot.revision,
            "compile pass started"
        );

        let (job_tx, job_rx) = mpsc::channel::<usize>();
        let (result_tx, result_rx) = mpsc::channel::<(usize, CompilationUnitResult)>();
        for index in 0..files.len() {
            // Receiver lives until the end of this function.
            let _ = job_tx.send(index);
        }
        drop(job_tx);
        let job_rx = Mutex::new(job_rx);

        let mut slots: Vec<Option<CompilationUnitResult>> =
            (0..files.len()).map(|_| None).collect();

        thread::scope(|s| {
            for _ in 0..workers {
                let tx = result_tx.clone();
                let job_rx = &job_rx;
                s.spawn(move || loop {
                    let next = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok(index) = next else { break };
                    let file = &files[index];
                    let unit = if cancel.is_cancelled() {
                        self.unit(
                            toolchain,
                            file,
                            toolchain.kind_for_path(&file.path).unwrap_or(file.kind),
                            UnitStatus::Cancelled,
                            String::new(),
                            Duration::ZERO,
                        )
                    } else {
                        self.compile_one(toolchain, snapshot, file, cancel)
                    };
                    if tx.send((index, unit)).is_err() {
                        break;
                    }
                });
            }
            drop(result_tx);

            for (index, unit) in result_rx {
                slots[index] = Some(unit);
            }
        });

        let units: Vec<CompilationUnitResult> = slots
            .into_iter()
            .zip(files)
            .map(|(slot, file)| {
                slot.unwrap_or_else(|| {
                    self.unit(
                        toolchain,
                        file,
                        toolchain.kind_for_path(&file.path).unwrap_or(file.kind),
                        UnitStatus::Failed,
                        "worker exited without reporting".into(),
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        // Judged by the units alone: a cancel arriving after the last unit
        // finished does not discard a complete pass.
        let outcome = if units.iter().any(|u| u.status == UnitStatus::Cancelled) {
            PassOutcome::Cancelled
        } else if units.iter().all(|u| u.status.is_success()) {
            PassOutcome::Succeeded
        } else {
            PassOutcome::Failed
        };

        let pass = PassResult {
            toolchain: toolchain.name.clone(),
            revision: snapshot.revision,
            units,
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            outcome = %pass.outcome,
            compiled = pass.count(UnitStatus::Compiled),
            cached = pass.count(UnitStatus::Cached),
            failed = pass.count(UnitStatus::Failed) + pass.count(UnitStatus::TimedOut),
            duration_ms = pass.duration_ms,
            "compile pass finished"
        );
        Ok(pass)
    }

    /// Object path for a source: `<object_dir>/<stem>-<path tag>.<ext>`.
    pub fn object_path(&self, toolchain: &ToolchainDescriptor, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unit".into());
        self.options.object_dir.join(format!(
            "{stem}-{}.{}",
            fingerprint::path_tag(source),
            toolchain.object_extension
        ))
    }

    fn worker_count(&self, units: usize) -> usize {
        let configured = match self.options.jobs {
            0 => thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            n => n,
        };
        configured.min(units).max(1)
    }

    fn compile_one(
        &self,
        toolchain: &ToolchainDescriptor,
        snapshot: &ConfigSnapshot,
        file: &ResolvedSourceFile,
        cancel: &CancelToken,
    ) -> CompilationUnitResult {
        let start = Instant::now();
        let kind = toolchain.kind_for_path(&file.path).unwrap_or(file.kind);
        let object = self.object_path(toolchain, &file.path);
        let command = build_command(toolchain, snapshot, kind, &file.path, &object);
        debug!(
            source = %file.path.display(),
            command = %command.display_line(),
            "compiling unit"
        );
        let unit = |status: UnitStatus, diagnostics: String| {
            self.unit(toolchain, file, kind, status, diagnostics, start.elapsed())
        };
        let failed = |diagnostics: String| {
            warn!(source = %file.path.display(), "{diagnostics}");
            unit(UnitStatus::Failed, diagnostics)
        };

        let fingerprint =
            match fingerprint::unit_fingerprint(&toolchain.name, &command, &file.path) {
                Ok(fp) => fp,
                Err(e) => return failed(format!("cannot read source: {e}")),
            };
        if self.options.use_cache && fingerprint::is_fresh(&object, &fingerprint) {
            debug!(source = %file.path.display(), "unit up to date");
            return unit(UnitStatus::Cached, String::new());
        }
        if let Err(e) = fingerprint::invalidate(&object) {
            return failed(format!("cannot remove stale object {}: {e}", object.display()));
        }

        let output = match self.runner.run(&command, self.options.timeout, cancel) {
            Ok(output) => output,
            Err(e) => return failed(format!("failed to run {}: {e}", command.program)),
        };
        let diagnostics = output.diagnostics();
        match output.status {
            RunStatus::Exited { success: true, .. } if object.is_file() => {
                if let Err(e) = fingerprint::record(&object, &fingerprint) {
                    warn!(object = %object.display(), error = %e, "could not record fingerprint");
                }
                unit(UnitStatus::Compiled, diagnostics)
            }
            RunStatus::Exited { success: true, .. } => {
                let mut text =
                    format!("{} exited successfully but wrote no object", command.program);
                if !diagnostics.is_empty() {
                    text.push('\n');
                    text.push_str(&diagnostics);
                }
                failed(text)
            }
            RunStatus::Exited { code, .. } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                warn!(source = %file.path.display(), code = %code, "unit failed");
                unit(UnitStatus::Failed, diagnostics)
            }
            RunStatus::TimedOut => {
                warn!(source = %file.path.display(), "unit timed out");
                unit(UnitStatus::TimedOut, diagnostics)
            }
            RunStatus::Cancelled => unit(UnitStatus::Cancelled, diagnostics),
        }
    }

    fn unit(
        &self,
        toolchain: &ToolchainDescriptor,
        file: &ResolvedSourceFile,
        kind: SourceKind,
        status: UnitStatus,
        diagnostics: String,
        elapsed: Duration,
    ) -> CompilationUnitResult {
        CompilationUnitResult {
            source: file.path.clone(),
            kind,
            object: self.object_path(toolchain, &file.path),
            status,
            diagnostics,
            elapsed,
        }
    }
}

/// Full command line for one unit.
///
/// Order: tool flags, defines, include paths (configuration, then toolchain),
/// variant flags, output, source. The assembler receives no defines unless
/// the toolchain accepts them, and never receives variant flags.
pub fn build_command(
    toolchain: &ToolchainDescriptor,
    snapshot: &ConfigSnapshot,
    kind: SourceKind,
    source: &Path,
    object: &Path,
) -> CommandSpec {
    let tool = toolchain.tool_for(kind);
    let mut args = tool.flags.clone();

    if kind != SourceKind::Asm || toolchain.asm_defines {
        for define in snapshot.effective_defines(toolchain) {
            args.push(format!("{}{define}", toolchain.define_prefix));
        }
    }

    for dir in snapshot.include_paths.iter().chain(&toolchain.system_includes) {
        args.push(format!("{}{}", toolchain.include_prefix, dir.display()));
    }

    if kind != SourceKind::Asm {
        let toggles = snapshot.toggles;
        let variant = if toggles.debug {
            &toolchain.debug_flags
        } else {
            &toolchain.release_flags
        };
        args.extend(variant.iter().cloned());
        if toggles.tiny {
            args.extend(toolchain.tiny_flags.iter().cloned());
        }
    }

    args.push(toolchain.output_flag.clone());
    args.push(object.display().to_string());
    args.push(source.display().to_string());

    CommandSpec {
        program: tool.program.clone(),
        args,
        cwd: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationContext;
    use crate::runner::fake::FakeRunner;
    use crate::runner::CommandOutput;
    use fwbuild_targets::{CoreGeneration, Vendor};
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        files: Vec<ResolvedSourceFile>,
        obj: PathBuf,
    }

    fn fixture(names: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let files = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, format!("// {name}\n")).unwrap();
                ResolvedSourceFile {
                    kind: SourceKind::from_path(&path).unwrap(),
                    path,
                    rule: 0,
                }
            })
            .collect();
        let obj = dir.path().join("obj");
        Fixture {
            _dir: dir,
            files,
            obj,
        }
    }

    fn driver(runner: Arc<FakeRunner>, obj: &Path) -> CompileDriver {
        CompileDriver::new(
            runner,
            DriverOptions {
                object_dir: obj.to_path_buf(),
                jobs: 2,
                timeout: Some(Duration::from_millis(200)),
                use_cache: true,
            },
        )
    }

    fn m3() -> ToolchainDescriptor {
        ToolchainDescriptor::armcc(CoreGeneration::M3, Vendor::Stm32)
    }

    fn snapshot(ctx: &ConfigurationContext) -> ConfigSnapshot {
        ctx.snapshot(vec![PathBuf::from("/fw/Core")])
    }

    #[test]
    fn command_layout_for_c_and_asm() {
        let tc = m3();
        let mut ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        ctx.add_define("STM32F1");
        ctx.set_tiny(true);
        let snap = snapshot(&ctx);

        let c = build_command(
            &tc,
            &snap,
            SourceKind::C,
            Path::new("/fw/a.c"),
            Path::new("/o/a.o"),
        );
        assert_eq!(c.program, "armcc");
        assert_eq!(&c.args[..2], &["--cpu", "Cortex-M3"]);
        let tail: Vec<&str> = c.args.iter().rev().take(3).map(String::as_str).collect();
        assert_eq!(tail, vec!["/fw/a.c", "/o/a.o", "-o"]);
        assert!(c.args.contains(&"-DSTM32F1".to_string()));
        assert!(c.args.contains(&"-DNDEBUG".to_string()));
        assert!(c.args.contains(&"-I/fw/Core".to_string()));
        assert!(c.args.contains(&"-O3".to_string()));
        assert!(c.args.contains(&"-Ospace".to_string()));

        let s = build_command(
            &tc,
            &snap,
            SourceKind::Asm,
            Path::new("/fw/startup.s"),
            Path::new("/o/s.o"),
        );
        assert_eq!(s.program, "armasm");
        assert!(!s.args.iter().any(|a| a.starts_with("-D")));
        assert!(!s.args.contains(&"-O3".to_string()));
        assert!(s.args.contains(&"-I/fw/Core".to_string()));
    }

    #[test]
    fn debug_toggle_swaps_flag_sets() {
        let tc = m3();
        let mut ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        ctx.set_debug(true);
        let cmd = build_command(
            &tc,
            &snapshot(&ctx),
            SourceKind::Cpp,
            Path::new("a.cpp"),
            Path::new("a.o"),
        );
        assert!(cmd.args.contains(&"-g".to_string()));
        assert!(cmd.args.contains(&"-DDEBUG".to_string()));
        assert!(!cmd.args.contains(&"-O3".to_string()));
    }

    #[test]
    fn successful_pass_keeps_resolved_order() {
        let fx = fixture(&["Sys.cpp", "Queue.cpp", "Time.c", "startup.s"]);
        let runner = Arc::new(FakeRunner::new());
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        let pass = driver(runner.clone(), &fx.obj)
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();

        assert!(pass.is_success());
        assert_eq!(pass.count(UnitStatus::Compiled), 4);
        let sources: Vec<&PathBuf> = pass.units.iter().map(|u| &u.source).collect();
        let expected: Vec<&PathBuf> = fx.files.iter().map(|f| &f.path).collect();
        assert_eq!(sources, expected);
        assert!(pass.objects().iter().all(|o| o.is_file()));
        assert_eq!(runner.compile_count(), 4);
    }

    #[test]
    fn unchanged_rerun_is_fully_cached_and_identical() {
        let fx = fixture(&["Sys.cpp", "Queue.cpp"]);
        let runner = Arc::new(FakeRunner::new());
        let drv = driver(runner.clone(), &fx.obj);
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);

        let first = drv
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();
        let before: Vec<Vec<u8>> = first.objects().iter().map(|o| fs::read(o).unwrap()).collect();

        let second = drv
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();
        assert_eq!(second.count(UnitStatus::Cached), 2);
        assert_eq!(runner.compile_count(), 2);
        let after: Vec<Vec<u8>> = second.objects().iter().map(|o| fs::read(o).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn toggle_change_invalidates_units() {
        let fx = fixture(&["Sys.cpp", "startup.s"]);
        let runner = Arc::new(FakeRunner::new());
        let drv = driver(runner.clone(), &fx.obj);
        let mut ctx = ConfigurationContext::new(CoreGeneration::M3, false);

        drv.compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();
        ctx.set_debug(true);
        let pass = drv
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();

        // The C++ unit's flags changed; the assembler line did not.
        assert_eq!(pass.units[0].status, UnitStatus::Compiled);
        assert_eq!(pass.units[1].status, UnitStatus::Cached);
    }

    #[test]
    fn edited_source_is_recompiled() {
        let fx = fixture(&["Sys.cpp"]);
        let runner = Arc::new(FakeRunner::new());
        let drv = driver(runner.clone(), &fx.obj);
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        drv.compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();
        fs::write(&fx.files[0].path, "int changed;\n").unwrap();
        let pass = drv
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();
        assert_eq!(pass.units[0].status, UnitStatus::Compiled);
    }

    #[test]
    fn one_failure_fails_the_pass_but_others_finish() {
        let fx = fixture(&["Good1.c", "Bad.c", "Good2.c"]);
        let runner = Arc::new(FakeRunner::new().fail_when("Bad.c"));
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        let pass = driver(runner, &fx.obj)
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();

        assert_eq!(pass.outcome, PassOutcome::Failed);
        assert_eq!(pass.count(UnitStatus::Compiled), 2);
        let failed: Vec<_> = pass.failed_units().collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].source.ends_with("Bad.c"));
        assert!(failed[0].diagnostics.contains("error"));
        assert!(!fingerprint::sidecar_path(&failed[0].object).exists());
    }

    #[test]
    fn success_without_object_is_a_failure() {
        let fx = fixture(&["Ghost.c"]);
        let runner = Arc::new(FakeRunner::new().no_output_when("Ghost.c"));
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        let pass = driver(runner, &fx.obj)
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();
        assert_eq!(pass.units[0].status, UnitStatus::Failed);
        assert!(pass.units[0].diagnostics.contains("no object"));
    }

    #[test]
    fn hung_unit_times_out() {
        let fx = fixture(&["Slow.c", "Fast.c"]);
        let runner = Arc::new(FakeRunner::new().hang_when("Slow.c"));
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        let pass = driver(runner, &fx.obj)
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();
        assert_eq!(pass.units[0].status, UnitStatus::TimedOut);
        assert_eq!(pass.units[1].status, UnitStatus::Compiled);
        assert_eq!(pass.outcome, PassOutcome::Failed);
    }

    #[test]
    fn cancelled_before_start_marks_every_unit() {
        let fx = fixture(&["a.c", "b.c"]);
        let runner = Arc::new(FakeRunner::new());
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        let token = CancelToken::new();
        token.cancel();
        let pass = driver(runner.clone(), &fx.obj)
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &token)
            .unwrap();
        assert_eq!(pass.outcome, PassOutcome::Cancelled);
        assert_eq!(pass.count(UnitStatus::Cancelled), 2);
        assert_eq!(runner.compile_count(), 0);
    }

    /// Fires the pass token as soon as its command returns.
    struct CancelAfterRun {
        inner: FakeRunner,
        token: CancelToken,
    }

    impl CommandRunner for CancelAfterRun {
        fn run(
            &self,
            command: &CommandSpec,
            timeout: Option<Duration>,
            cancel: &CancelToken,
        ) -> std::io::Result<CommandOutput> {
            let out = self.inner.run(command, timeout, cancel);
            self.token.cancel();
            out
        }
    }

    #[test]
    fn cancel_after_last_unit_keeps_successful_pass() {
        let fx = fixture(&["Done.c"]);
        let token = CancelToken::new();
        let runner = Arc::new(CancelAfterRun {
            inner: FakeRunner::new(),
            token: token.clone(),
        });
        let drv = CompileDriver::new(
            runner,
            DriverOptions {
                object_dir: fx.obj.clone(),
                jobs: 1,
                timeout: None,
                use_cache: true,
            },
        );
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        let pass = drv
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &token)
            .unwrap();

        assert!(token.is_cancelled());
        assert_eq!(pass.units[0].status, UnitStatus::Compiled);
        assert_eq!(pass.outcome, PassOutcome::Succeeded);
    }

    #[test]
    fn unit_kind_follows_toolchain_extension_map() {
        let fx = fixture(&["startup.s"]);
        let mut tc = m3();
        tc.extensions.insert("s".into(), SourceKind::C);
        let runner = Arc::new(FakeRunner::new());
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        let pass = driver(runner.clone(), &fx.obj)
            .compile_all(&tc, &snapshot(&ctx), &fx.files, &CancelToken::new())
            .unwrap();

        assert_eq!(fx.files[0].kind, SourceKind::Asm);
        assert_eq!(pass.units[0].kind, SourceKind::C);
        assert_eq!(runner.invocations()[0].program, "armcc");
    }

    #[test]
    fn cancellation_stops_in_flight_unit() {
        let fx = fixture(&["Hang.c"]);
        let runner = Arc::new(FakeRunner::new().hang_when("Hang.c"));
        let ctx = ConfigurationContext::new(CoreGeneration::M3, false);
        let drv = CompileDriver::new(
            runner,
            DriverOptions {
                object_dir: fx.obj.clone(),
                jobs: 1,
                timeout: None,
                use_cache: true,
            },
        );
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });
        let pass = drv
            .compile_all(&m3(), &snapshot(&ctx), &fx.files, &token)
            .unwrap();
        handle.join().unwrap();
        assert_eq!(pass.units[0].status, UnitStatus::Cancelled);
        assert_eq!(pass.outcome, PassOutcome::Cancelled);
    }

    #[test]
    fn same_stem_in_different_dirs_gets_distinct_objects() {
        let drv = driver(Arc::new(FakeRunner::new()), Path::new("/obj"));
        let tc = m3();
        let a = drv.object_path(&tc, Path::new("/fw/Core/Queue.cpp"));
        let b = drv.object_path(&tc, Path::new("/fw/Kernel/Queue.cpp"));
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("Queue-"));
        assert_eq!(a.extension().unwrap(), "o");
    }
}
