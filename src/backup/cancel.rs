//! Interrupt handling
//!
//! `SIGINT` and `SIGTERM` are watched on a dedicated thread. On arrival
//! the listener flips the shared [`CancellationToken`], stops any child
//! process registered with the token, tells the operator, and terminates
//! the process with [`INTERRUPTED_EXIT_CODE`]. The orchestrator also polls
//! the token between steps, so a run that observes a cancelled token never
//! starts another step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use signal_hook::low_level::signal_name;
use tracing::warn;

use crate::error::{BackupError, BackupResult};
use crate::notify::{Notifier, Urgency};

/// Process exit status after an interrupt
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Shared cancellation flag
///
/// Also tracks the child processes started on behalf of the run, so an
/// interrupt can stop them before the process exits.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    children: Arc<Mutex<Vec<u32>>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the run as cancelled
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Register a running child process
    pub fn track_child(&self, pid: u32) {
        if let Ok(mut children) = self.children.lock() {
            children.push(pid);
        }
    }

    /// Forget a child process once it has been reaped
    pub fn untrack_child(&self, pid: u32) {
        if let Ok(mut children) = self.children.lock() {
            children.retain(|&p| p != pid);
        }
    }

    /// Send `SIGTERM` to every tracked child; returns how many were signalled
    pub fn terminate_children(&self) -> usize {
        let Ok(children) = self.children.lock() else {
            return 0;
        };

        let mut signalled = 0;
        for &pid in children.iter() {
            let Ok(pid) = libc::pid_t::try_from(pid) else {
                continue;
            };

            // SAFETY: kill(2) only reads its integer arguments
            if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
                signalled += 1;
            }
        }
        signalled
    }
}

type ExitHook = Box<dyn Fn(i32) + Send + Sync>;

/// Reacts to interrupt signals
pub struct CancellationListener {
    token: CancellationToken,
    notifier: Arc<dyn Notifier>,
    exit: ExitHook,
}

impl CancellationListener {
    /// Create a listener that exits the process on interrupt
    pub fn new(token: CancellationToken, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_exit_hook(
            token,
            notifier,
            Box::new(|code| {
                std::process::exit(code);
            }),
        )
    }

    /// Create a listener with a custom terminate action
    pub fn with_exit_hook(
        token: CancellationToken,
        notifier: Arc<dyn Notifier>,
        exit: ExitHook,
    ) -> Self {
        Self {
            token,
            notifier,
            exit,
        }
    }

    /// Abort the run in response to `signal`
    pub fn handle(&self, signal: i32) {
        // A second signal while the first is being handled changes nothing
        if self.token.is_cancelled() {
            return;
        }

        let name = signal_name(signal)
            .map(str::to_string)
            .unwrap_or_else(|| format!("signal {}", signal));

        warn!("Received {}. Interrupting backup...", name);
        self.token.cancel();

        let stopped = self.token.terminate_children();
        if stopped > 0 {
            warn!("Stopped {} running child process(es).", stopped);
        }

        self.notifier.notify(
            "Backup Interrupted",
            &format!("The backup was interrupted by {}.", name),
            Urgency::Critical,
        );

        (self.exit)(INTERRUPTED_EXIT_CODE);
    }

    /// Start watching `SIGINT` and `SIGTERM` on a background thread
    pub fn install(self) -> BackupResult<thread::JoinHandle<()>> {
        let mut signals = Signals::new([SIGINT, SIGTERM])
            .map_err(|e| BackupError::Signal(format!("Failed to install signal handler: {}", e)))?;

        let handle = thread::Builder::new()
            .name("signal-listener".into())
            .spawn(move || {
                for signal in signals.forever() {
                    self.handle(signal);
                }
            })?;

        Ok(handle)
    }
}
