//! External process execution
//!
//! Every external program extbackup talks to (the transfer tool, the
//! desktop notifier) goes through the [`CommandRunner`] trait so tests can
//! substitute canned exit codes and output.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::backup::CancellationToken;
use crate::error::{BackupError, BackupResult};

/// How often a running command is polled for completion
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A command line to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Kill the process if it runs longer than this
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a command with no arguments and no timeout
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bound the execution time
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Render the command line for logging
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub status: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Build an output with the given exit code and no captured text
    pub fn with_status(status: i32) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external commands
pub trait CommandRunner: Send + Sync {
    /// Execute the command to completion and capture its output
    ///
    /// Returns an error only when the command could not be launched or
    /// timed out; a non-zero exit is reported through [`CommandOutput`].
    fn run(&self, spec: &CommandSpec) -> BackupResult<CommandOutput>;
}

/// Runs commands with `std::process::Command`
///
/// With a [`CancellationToken`] attached, each child is registered with the
/// token while it runs and is killed as soon as the token is cancelled.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    cancel: Option<CancellationToken>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop running children when `token` is cancelled
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> BackupResult<CommandOutput> {
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackupError::launch(&spec.program, e))?;

        let pid = child.id();
        if let Some(token) = &self.cancel {
            token.track_child(pid);
        }

        let result = wait_child(child, spec, self.cancel.as_ref());

        if let Some(token) = &self.cancel {
            token.untrack_child(pid);
        }
        result
    }
}

/// Wait for a child, killing it on timeout or cancellation
fn wait_child(
    mut child: Child,
    spec: &CommandSpec,
    cancel: Option<&CancellationToken>,
) -> BackupResult<CommandOutput> {
    // Drain pipes on their own threads so a chatty child cannot block on a full pipe
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let deadline = spec.timeout.map(|timeout| Instant::now() + timeout);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(BackupError::Cancelled(spec.program.clone()));
        }

        if let (Some(deadline), Some(timeout)) = (deadline, spec.timeout) {
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BackupError::Timeout {
                    program: spec.program.clone(),
                    seconds: timeout.as_secs(),
                });
            }
        }

        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        status: status.code(),
        stdout: join_reader(stdout),
        stderr: join_reader(stderr),
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
