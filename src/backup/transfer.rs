//! Incremental transfer through rsync
//!
//! The copy itself is delegated to rsync; this module only builds the
//! command line, runs it, and interprets the result.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{BackupError, BackupResult};
use crate::process::{CommandRunner, CommandSpec};

/// Program that performs the copy
pub const TRANSFER_PROGRAM: &str = "rsync";

/// How many trailing output lines are kept for the log
pub const OUTPUT_TAIL_LINES: usize = 20;

/// Outcome of one transfer tool invocation
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// Exit code; `None` when the tool was killed by a signal
    pub exit_code: Option<i32>,
    /// Wall-clock time the tool ran
    pub duration: Duration,
    /// Last lines of combined stdout/stderr
    pub output_tail: Vec<String>,
    /// Trimmed stderr, for failure messages
    pub stderr: String,
}

impl TransferReport {
    /// Success is decided by the exit status alone
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable failure reason
    pub fn error_text(&self) -> &str {
        if self.stderr.is_empty() {
            "unknown error"
        } else {
            &self.stderr
        }
    }
}

/// Totals for a finished backup directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub files: u64,
    pub bytes: u64,
}

/// Builds and runs the rsync invocation for one backup
pub struct TransferEngine<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> TransferEngine<'a> {
    /// Create a new TransferEngine that runs `rsync`
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Build the command line for one transfer
    ///
    /// Recursive, keeps timestamps and symlinks, mirrors deletions, and
    /// drops permission and ownership metadata.
    pub fn command(
        &self,
        source: &Path,
        backup_dir: &Path,
        exclusions: &[String],
        dry_run: bool,
    ) -> CommandSpec {
        let mut spec = CommandSpec::new(TRANSFER_PROGRAM).args([
            "-rltvh",
            "--progress",
            "--delete",
            "--no-perms",
            "--no-owner",
            "--no-group",
        ]);

        if dry_run {
            spec = spec.arg("--dry-run");
        }

        spec.args(exclusions.iter().map(|p| format!("--exclude={}", p)))
            .arg(source.to_string_lossy())
            .arg(backup_dir.to_string_lossy())
    }

    /// Run the transfer from `source` into `backup_dir`
    ///
    /// Creates `backup_dir` first unless `dry_run` is set. A launch failure
    /// is returned as an error; a non-zero exit is reported through
    /// [`TransferReport::success`].
    pub fn transfer(
        &self,
        source: &Path,
        backup_dir: &Path,
        exclusions: &[String],
        dry_run: bool,
    ) -> BackupResult<TransferReport> {
        if dry_run {
            info!("DRY-RUN mode enabled - no files will be copied.");
        } else {
            fs::create_dir_all(backup_dir).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to create backup directory {}: {}",
                    backup_dir.display(),
                    e
                ))
            })?;
        }

        let spec = self.command(source, backup_dir, exclusions, dry_run);
        info!(
            "Starting transfer: {} -> {}",
            source.display(),
            backup_dir.display()
        );
        debug!("Command: {}", spec.display());

        let started = Instant::now();
        let output = self.runner.run(&spec)?;
        let duration = started.elapsed();

        let output_tail = tail_lines(&output.stdout, &output.stderr, OUTPUT_TAIL_LINES);
        for line in &output_tail {
            debug!("rsync: {}", line);
        }

        Ok(TransferReport {
            exit_code: output.status,
            duration,
            output_tail,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Last `limit` non-empty lines of stdout followed by stderr
fn tail_lines(stdout: &str, stderr: &str, limit: usize) -> Vec<String> {
    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let start = lines.len().saturating_sub(limit);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// Count regular files and their total size under `dir`
pub fn summarize(dir: &Path) -> BackupResult<TransferSummary> {
    let mut summary = TransferSummary::default();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| BackupError::Io(e.to_string()))?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata().map_err(|e| BackupError::Io(e.to_string()))?;
            summary.files += 1;
            summary.bytes += metadata.len();
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use crate::testing::FakeRunner;
    use tempfile::TempDir;

    fn exclusions() -> Vec<String> {
        vec![".cache/*".to_string(), "*.tmp".to_string()]
    }

    #[test]
    fn test_command_line() {
        let runner = FakeRunner::exiting(0);
        let engine = TransferEngine::new(&runner);

        let spec = engine.command(
            Path::new("/home/ana"),
            Path::new("/mnt/usb/backup_2025-01-01"),
            &exclusions(),
            false,
        );

        assert_eq!(spec.program, "rsync");
        assert_eq!(
            spec.args,
            vec![
                "-rltvh",
                "--progress",
                "--delete",
                "--no-perms",
                "--no-owner",
                "--no-group",
                "--exclude=.cache/*",
                "--exclude=*.tmp",
                "/home/ana",
                "/mnt/usb/backup_2025-01-01",
            ]
        );
        assert_eq!(spec.timeout, None);
    }

    #[test]
    fn test_dry_run_command_line() {
        let runner = FakeRunner::exiting(0);
        let engine = TransferEngine::new(&runner);

        let spec = engine.command(Path::new("/src"), Path::new("/dst"), &exclusions(), true);

        assert!(spec.args.contains(&"--dry-run".to_string()));
        assert!(spec.args.contains(&"--exclude=*.tmp".to_string()));
        assert_eq!(spec.args.last().unwrap(), "/dst");
    }

    #[test]
    fn test_transfer_success_creates_directory() {
        let temp = TempDir::new().unwrap();
        let backup_dir = temp.path().join("backup_2025-01-01");
        let runner = FakeRunner::new(vec![Ok(CommandOutput {
            status: Some(0),
            stdout: "sending incremental file list\nfile.txt\n".into(),
            stderr: String::new(),
        })]);
        let engine = TransferEngine::new(&runner);

        let report = engine
            .transfer(Path::new("/src"), &backup_dir, &[], false)
            .unwrap();

        assert!(report.success());
        assert!(backup_dir.is_dir());
        assert_eq!(report.output_tail, vec!["sending incremental file list", "file.txt"]);
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let backup_dir = temp.path().join("backup_2025-01-01");
        let runner = FakeRunner::exiting(0);
        let engine = TransferEngine::new(&runner);

        let report = engine
            .transfer(Path::new("/src"), &backup_dir, &exclusions(), true)
            .unwrap();

        assert!(report.success());
        assert!(!backup_dir.exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_transfer_nonzero_exit() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new(vec![Ok(CommandOutput {
            status: Some(23),
            stdout: String::new(),
            stderr: "rsync: some files could not be transferred\n".into(),
        })]);
        let engine = TransferEngine::new(&runner);

        let report = engine
            .transfer(Path::new("/src"), &temp.path().join("b"), &[], false)
            .unwrap();

        assert!(!report.success());
        assert_eq!(report.exit_code, Some(23));
        assert_eq!(report.error_text(), "rsync: some files could not be transferred");
    }

    #[test]
    fn test_transfer_killed_by_signal_is_failure() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new(vec![Ok(CommandOutput::default())]);
        let engine = TransferEngine::new(&runner);

        let report = engine
            .transfer(Path::new("/src"), &temp.path().join("b"), &[], false)
            .unwrap();

        assert!(!report.success());
        assert_eq!(report.error_text(), "unknown error");
    }

    #[test]
    fn test_transfer_launch_failure() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new(vec![]);
        let engine = TransferEngine::new(&runner);

        let err = engine
            .transfer(Path::new("/src"), &temp.path().join("b"), &[], false)
            .unwrap_err();

        assert!(matches!(err, BackupError::Launch { .. }));
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let stdout: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
        let tail = tail_lines(&stdout, "warning\n", OUTPUT_TAIL_LINES);

        assert_eq!(tail.len(), 20);
        assert_eq!(tail[0], "line 12");
        assert_eq!(tail[19], "warning");
    }

    #[test]
    fn test_summarize() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::write(temp.path().join("a/one.txt"), b"12345").unwrap();
        std::fs::write(temp.path().join("a/b/two.txt"), b"123").unwrap();

        let summary = summarize(temp.path()).unwrap();
        assert_eq!(summary, TransferSummary { files: 2, bytes: 8 });
    }

    #[test]
    fn test_summarize_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(summarize(&temp.path().join("missing")).is_err());
    }
}
