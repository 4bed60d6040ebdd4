//! Per-run record of a backup execution

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;

use super::cancel::INTERRUPTED_EXIT_CODE;

/// Final state of a backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Transfer succeeded (rotation problems do not change this)
    Success,
    /// Mount or free-space verification failed; nothing was written
    AbortedPrecheck,
    /// The transfer tool failed to launch or exited non-zero
    FailedTransfer,
    /// An interrupt signal cancelled the run
    Interrupted,
}

impl Outcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::AbortedPrecheck | Self::FailedTransfer => 1,
            Self::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::AbortedPrecheck => "ABORTED_PRECHECK",
            Self::FailedTransfer => "FAILED_TRANSFER",
            Self::Interrupted => "INTERRUPTED",
        };
        f.write_str(s)
    }
}

/// Mutable state of one backup run, owned by the orchestrator
#[derive(Debug, Clone)]
pub struct BackupRun {
    pub started_at: NaiveDateTime,
    /// `destination/backup_YYYY-MM-DD` for the run's calendar day
    pub backup_dir: PathBuf,
    pub dry_run: bool,
    pub cancelled: bool,
    pub files_copied: Option<u64>,
    pub bytes_copied: Option<u64>,
    pub duration: Option<Duration>,
    /// `None` while the run is still in progress
    pub outcome: Option<Outcome>,
}

impl BackupRun {
    pub fn new(started_at: NaiveDateTime, backup_dir: PathBuf, dry_run: bool) -> Self {
        Self {
            started_at,
            backup_dir,
            dry_run,
            cancelled: false,
            files_copied: None,
            bytes_copied: None,
            duration: None,
            outcome: None,
        }
    }

    /// Outcome of the run, treating an unfinished run as interrupted
    pub fn outcome(&self) -> Outcome {
        self.outcome.unwrap_or(Outcome::Interrupted)
    }
}
