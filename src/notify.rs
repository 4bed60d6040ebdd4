//! Operator notifications
//!
//! Notifications are best-effort: a missing notification daemon, a hung
//! `notify-send`, or a non-zero exit never affects the backup itself.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::process::{CommandRunner, CommandSpec, SystemRunner};

/// Upper bound on a single notification call
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Severity attached to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    /// Value understood by `notify-send --urgency`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers short messages to the operator
pub trait Notifier: Send + Sync {
    /// Fire-and-forget; implementations swallow their own failures
    fn notify(&self, title: &str, body: &str, urgency: Urgency);
}

/// Sends desktop notifications through `notify-send`
pub struct DesktopNotifier {
    runner: Box<dyn CommandRunner>,
    program: String,
    timeout: Duration,
}

impl DesktopNotifier {
    /// Create a notifier that runs the real `notify-send`
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemRunner::new()))
    }

    /// Create a notifier with a custom command runner
    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            program: "notify-send".to_string(),
            timeout: NOTIFY_TIMEOUT,
        }
    }

    fn command(&self, title: &str, body: &str, urgency: Urgency) -> CommandSpec {
        CommandSpec::new(&self.program)
            .arg(format!("--urgency={}", urgency))
            .arg(title)
            .arg(body)
            .timeout(self.timeout)
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str, urgency: Urgency) {
        let spec = self.command(title, body, urgency);
        match self.runner.run(&spec) {
            Ok(output) if output.success() => {}
            Ok(output) => debug!(
                "{} exited with {:?}: {}",
                self.program,
                output.status,
                output.stderr.trim()
            ),
            Err(e) => debug!("Notification not delivered: {}", e),
        }
    }
}
