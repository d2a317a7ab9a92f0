//! Subprocess invocation behind a trait so passes can run without a real toolchain.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a killed tool's pipes may stay open before its output is dropped.
/// Grandchildren inherit the pipes and can outlive the kill.
const KILLED_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// One tool invocation: executable plus argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The command line as one string, for logs and fingerprints.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Exited { success: bool, code: Option<i32> },
    TimedOut,
    Cancelled,
}

/// Exit status plus captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        matches!(self.status, RunStatus::Exited { success: true, .. })
    }

    /// Stdout and stderr joined, trimmed.
    pub fn diagnostics(&self) -> String {
        let mut text = String::new();
        for part in [self.stdout.trim(), self.stderr.trim()] {
            if part.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(part);
        }
        text
    }
}

/// Shared cancellation flag for a pass.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before reusing the token for another pass.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs tool commands. Implementations must be shareable across worker threads.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion, killing it when `timeout` elapses or
    /// `cancel` fires. `Err` means the process could not be started.
    fn run(
        &self,
        command: &CommandSpec,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> std::io::Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        command: &CommandSpec,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> std::io::Result<CommandOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn()?;

        // Drain pipes on their own threads so a chatty tool cannot block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(exit)) => {
                    break RunStatus::Exited {
                        success: exit.success(),
                        code: exit.code(),
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e);
                }
            }
            if cancel.is_cancelled() {
                debug!(program = %command.program, "cancelling running tool");
                let _ = child.kill();
                let _ = child.wait();
                break RunStatus::Cancelled;
            }
            if timeout.is_some_and(|limit| start.elapsed() >= limit) {
                debug!(program = %command.program, "tool exceeded timeout, killing");
                let _ = child.kill();
                let _ = child.wait();
                break RunStatus::TimedOut;
            }
            thread::sleep(POLL_INTERVAL);
        };

        // An exited tool closes its pipes; a killed one may have left
        // descendants holding them, so only wait a grace period.
        let wait = match status {
            RunStatus::Exited { .. } => None,
            RunStatus::TimedOut | RunStatus::Cancelled => Some(KILLED_DRAIN_GRACE),
        };
        Ok(CommandOutput {
            status,
            stdout: collect(stdout, wait),
            stderr: collect(stderr, wait),
        })
    }
}

/// Read `pipe` to the end on a detached thread, delivering the bytes once.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

fn collect(pipe: Option<mpsc::Receiver<Vec<u8>>>, wait: Option<Duration>) -> String {
    let Some(rx) = pipe else {
        return String::new();
    };
    let bytes = match wait {
        None => rx.recv().unwrap_or_default(),
        Some(limit) => rx.recv_timeout(limit).unwrap_or_default(),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(any(test, feature = "fake-runner"))]
pub mod fake {
    //! A scripted runner that writes fake objects and libraries.

    use std::path::Path;
    use std::sync::Mutex;

    use super::*;

    /// Behaves like a compiler and archiver without executing anything.
    ///
    /// A command whose arguments contain `-o <path>` is a compile: the object
    /// at `<path>` is written with content derived from the command line. Any
    /// other command is an archive: the first non-flag argument is the output
    /// and the remaining existing files are concatenated into it.
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        fail: Vec<String>,
        silent: Vec<String>,
        hang: Vec<String>,
        fail_archive: bool,
        log: Mutex<Vec<CommandSpec>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Exit non-zero when any argument contains `needle`.
        pub fn fail_when(mut self, needle: &str) -> Self {
            self.fail.push(needle.into());
            self
        }

        /// Exit zero without writing output when any argument contains `needle`.
        pub fn no_output_when(mut self, needle: &str) -> Self {
            self.silent.push(needle.into());
            self
        }

        /// Block until timeout or cancellation when any argument contains `needle`.
        pub fn hang_when(mut self, needle: &str) -> Self {
            self.hang.push(needle.into());
            self
        }

        /// Make every archive command fail.
        pub fn fail_archive(mut self) -> Self {
            self.fail_archive = true;
            self
        }

        /// Every command run so far, in start order.
        pub fn invocations(&self) -> Vec<CommandSpec> {
            self.log.lock().map(|log| log.clone()).unwrap_or_default()
        }

        /// Number of compile commands run so far.
        pub fn compile_count(&self) -> usize {
            self.invocations()
                .iter()
                .filter(|c| c.args.iter().any(|a| a == "-o"))
                .count()
        }

        fn hits(list: &[String], command: &CommandSpec) -> bool {
            list.iter()
                .any(|needle| command.args.iter().any(|a| a.contains(needle.as_str())))
        }

        fn exited(success: bool, stderr: String) -> CommandOutput {
            CommandOutput {
                status: RunStatus::Exited {
                    success,
                    code: Some(if success { 0 } else { 1 }),
                },
                stdout: String::new(),
                stderr,
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(
            &self,
            command: &CommandSpec,
            timeout: Option<Duration>,
            cancel: &CancelToken,
        ) -> std::io::Result<CommandOutput> {
            if let Ok(mut log) = self.log.lock() {
                log.push(command.clone());
            }

            if Self::hits(&self.hang, command) {
                let start = Instant::now();
                loop {
                    if cancel.is_cancelled() {
                        return Ok(CommandOutput {
                            status: RunStatus::Cancelled,
                            stdout: String::new(),
                            stderr: String::new(),
                        });
                    }
                    if timeout.is_some_and(|limit| start.elapsed() >= limit) {
                        return Ok(CommandOutput {
                            status: RunStatus::TimedOut,
                            stdout: String::new(),
                            stderr: String::new(),
                        });
                    }
                    thread::sleep(Duration::from_millis(2));
                }
            }

            if Self::hits(&self.fail, command) {
                return Ok(Self::exited(false, "error: #20: identifier is undefined".into()));
            }
            if Self::hits(&self.silent, command) {
                return Ok(Self::exited(true, String::new()));
            }

            if let Some(pos) = command.args.iter().position(|a| a == "-o") {
                let Some(out) = command.args.get(pos + 1) else {
                    return Ok(Self::exited(false, "missing output path".into()));
                };
                std::fs::write(out, format!("obj:{}\n", command.display_line()))?;
                return Ok(Self::exited(true, String::new()));
            }

            if self.fail_archive {
                return Ok(Self::exited(false, "Error: L6002U: could not open file".into()));
            }
            let mut operands = command.args.iter().filter(|a| !a.starts_with('-'));
            let Some(library) = operands.next() else {
                return Ok(Self::exited(false, "no library operand".into()));
            };
            let mut content = Vec::new();
            for input in operands {
                let path = Path::new(input);
                if path.is_file() {
                    content.extend(std::fs::read(path)?);
                }
            }
            std::fs::write(library, content)?;
            Ok(Self::exited(true, String::new()))
        }
    }
}
