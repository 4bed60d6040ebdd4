//! Backup orchestration
//!
//! Runs the four steps of a backup in order, stopping at the first hard
//! failure:
//!
//! 1. mount check
//! 2. free-space check
//! 3. incremental transfer
//! 4. retention rotation (skipped in dry-run mode)

use std::path::Path;

use chrono::{Local, NaiveDateTime};
use tracing::{error, info, warn};

use super::cancel::CancellationToken;
use super::disk::{check_mount, check_space, DiskProbe};
use super::retention::{backup_dir_for, RetentionManager};
use super::run::{BackupRun, Outcome};
use super::transfer::{summarize, TransferEngine};
use crate::config::BackupConfig;
use crate::display::{format_count, format_duration};
use crate::notify::{Notifier, Urgency};
use crate::process::CommandRunner;

/// Source of the current local time
pub type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

const BANNER_WIDTH: usize = 60;

/// Sequences one backup run
pub struct BackupOrchestrator<'a> {
    config: &'a BackupConfig,
    runner: &'a dyn CommandRunner,
    disk: &'a dyn DiskProbe,
    notifier: &'a dyn Notifier,
    cancel: CancellationToken,
    clock: Clock,
}

impl<'a> BackupOrchestrator<'a> {
    /// Create a new orchestrator
    pub fn new(
        config: &'a BackupConfig,
        runner: &'a dyn CommandRunner,
        disk: &'a dyn DiskProbe,
        notifier: &'a dyn Notifier,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            runner,
            disk,
            notifier,
            cancel,
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Replace the wall clock
    ///
    /// Read once for the backup date and again when rotation computes its cutoff.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Execute one backup run
    pub fn run(&self, dry_run: bool) -> BackupRun {
        let now = (self.clock)();
        let destination = self.config.destination_path();
        let mut run = BackupRun::new(now, backup_dir_for(&destination, now.date()), dry_run);

        self.log_start_banner(&run);

        let mut outcome = self.execute(&mut run, &destination);

        // An interrupt anywhere in the run wins over whatever the steps decided
        run.cancelled = self.cancel.is_cancelled();
        if run.cancelled {
            outcome = Outcome::Interrupted;
        }
        run.outcome = Some(outcome);

        self.log_end_banner(outcome);
        run
    }

    fn execute(&self, run: &mut BackupRun, destination: &Path) -> Outcome {
        if self.interrupted() {
            return Outcome::Interrupted;
        }

        info!("Step 1/4: Checking that the external drive is mounted...");
        if !check_mount(self.disk, self.notifier, destination) {
            return Outcome::AbortedPrecheck;
        }

        if self.interrupted() {
            return Outcome::Interrupted;
        }

        info!("Step 2/4: Checking free disk space...");
        if !check_space(
            self.disk,
            self.notifier,
            destination,
            self.config.min_free_space_gb,
        ) {
            return Outcome::AbortedPrecheck;
        }

        if self.interrupted() {
            return Outcome::Interrupted;
        }

        info!("Step 3/4: Running incremental transfer...");
        if let Some(outcome) = self.transfer(run) {
            return outcome;
        }

        info!("Step 4/4: Checking for old backups to rotate...");
        if run.dry_run {
            info!("Dry-run: skipping backup rotation.");
            return Outcome::Success;
        }

        if self.interrupted() {
            return Outcome::Interrupted;
        }

        self.rotate(destination);

        if self.interrupted() {
            return Outcome::Interrupted;
        }

        self.notifier.notify(
            "Backup Completed",
            &format!(
                "Backup of {} completed successfully in {}.",
                self.config.source,
                run.backup_dir.display()
            ),
            Urgency::Low,
        );

        Outcome::Success
    }

    /// Run the transfer step; `Some` carries a terminal outcome
    fn transfer(&self, run: &mut BackupRun) -> Option<Outcome> {
        let engine = TransferEngine::new(self.runner);
        let result = engine.transfer(
            &self.config.source_path(),
            &run.backup_dir,
            &self.config.exclusions,
            run.dry_run,
        );

        // The transfer tool shares our process group and dies with us on ^C
        if self.interrupted() {
            return Some(Outcome::Interrupted);
        }

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!("Failed to run rsync: {}", e);
                self.notifier.notify(
                    "Backup Failed",
                    &format!("Failed to run rsync:\n{}", e),
                    Urgency::Critical,
                );
                return Some(Outcome::FailedTransfer);
            }
        };

        run.duration = Some(report.duration);

        if !report.success() {
            let code = report
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "killed by signal".to_string());

            error!("rsync failed (exit code {}): {}", code, report.error_text());
            self.notifier.notify(
                "Backup Failed",
                &format!(
                    "rsync returned an error (exit code {}).\nCheck the log for details.",
                    code
                ),
                Urgency::Critical,
            );
            return Some(Outcome::FailedTransfer);
        }

        info!(
            "Backup completed successfully! Duration: {}",
            format_duration(report.duration)
        );

        if !run.dry_run {
            self.record_summary(run);
        }

        None
    }

    /// Log file count and size of the finished backup; failures only warn
    fn record_summary(&self, run: &mut BackupRun) {
        match summarize(&run.backup_dir) {
            Ok(summary) => {
                run.files_copied = Some(summary.files);
                run.bytes_copied = Some(summary.bytes);
                info!(
                    "Summary: {} files | {:.2} GB | Duration: {}",
                    format_count(summary.files),
                    crate::display::bytes_to_gib(summary.bytes),
                    format_duration(run.duration.unwrap_or_default())
                );
            }
            Err(e) => warn!("Could not compute backup summary: {}", e),
        }
    }

    fn rotate(&self, destination: &Path) {
        let manager = RetentionManager::new(destination, self.config.retention_days);
        if let Err(e) = manager.rotate((self.clock)()) {
            error!("Backup rotation failed: {}", e);
        }
    }

    fn interrupted(&self) -> bool {
        if self.cancel.is_cancelled() {
            warn!("Backup cancelled; no further steps will run.");
            return true;
        }
        false
    }

    fn log_start_banner(&self, run: &BackupRun) {
        let rule = "=".repeat(BANNER_WIDTH);
        info!("{}", rule);
        info!(
            "BACKUP STARTED at {}",
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        if run.dry_run {
            info!("*** DRY-RUN MODE - NO FILES WILL BE MODIFIED ***");
        }
        info!("{}", rule);
    }

    fn log_end_banner(&self, outcome: Outcome) {
        let rule = "=".repeat(BANNER_WIDTH);
        let status = if outcome.is_success() {
            "SUCCESS"
        } else {
            "FAILURE"
        };

        info!("{}", rule);
        info!("BACKUP FINISHED - Status: {} ({})", status, outcome);
        info!("{}", rule);
    }
}
