//! Retention-based rotation of dated backup directories
//!
//! Backups live directly under the destination root as `backup_YYYY-MM-DD`.
//! Anything else found there is left alone, so operators can keep their own
//! folders on the drive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{error, info, warn};

use crate::error::{BackupError, BackupResult};

/// Prefix shared by every backup directory name
pub const BACKUP_DIR_PREFIX: &str = "backup_";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Name of the backup directory for a calendar day
pub fn backup_dir_name(date: NaiveDate) -> String {
    format!("{}{}", BACKUP_DIR_PREFIX, date.format(DATE_FORMAT))
}

/// Path of the backup directory for a calendar day under `destination`
pub fn backup_dir_for(destination: &Path, date: NaiveDate) -> PathBuf {
    destination.join(backup_dir_name(date))
}

/// Parse the date out of a `backup_YYYY-MM-DD` name
///
/// Returns `None` for any other name, including near misses like
/// `backup_2024-1-1` or `backup_2024-02-30`.
pub fn parse_backup_date(name: &str) -> Option<NaiveDate> {
    let date_part = name.strip_prefix(BACKUP_DIR_PREFIX)?;

    // chrono accepts unpadded fields; the on-disk format is strictly padded
    if date_part.len() != 10 {
        return None;
    }

    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

/// Date of a directory entry that is a backup directory
///
/// Unreadable entries are logged and skipped so one bad entry cannot stop
/// a rotation.
fn backup_entry(entry: io::Result<fs::DirEntry>) -> Option<(PathBuf, NaiveDate)> {
    let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Skipping unreadable directory entry: {}", e);
            return None;
        }
    };

    let date = entry.file_name().to_str().and_then(parse_backup_date)?;

    // Plain files and symlinks that happen to match the name are not ours
    match entry.file_type() {
        Ok(file_type) if file_type.is_dir() => Some((entry.path(), date)),
        Ok(_) => None,
        Err(e) => {
            warn!("Skipping {}: {}", entry.path().display(), e);
            None
        }
    }
}

/// Removes backup directories that have aged out of the retention window
pub struct RetentionManager {
    destination: PathBuf,
    retention_days: u32,
}

impl RetentionManager {
    /// Create a new RetentionManager
    pub fn new(destination: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            destination: destination.into(),
            retention_days,
        }
    }

    /// Instant before which a backup has expired
    ///
    /// `None` when the window reaches past the earliest representable date,
    /// in which case nothing expires.
    pub fn cutoff(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        now.checked_sub_signed(Duration::days(i64::from(self.retention_days)))
    }

    /// Backup directories under the destination, sorted by name
    pub fn list_backups(&self) -> BackupResult<Vec<(PathBuf, NaiveDate)>> {
        let entries = fs::read_dir(&self.destination).map_err(|e| {
            BackupError::Io(format!(
                "Failed to read {}: {}",
                self.destination.display(),
                e
            ))
        })?;

        let mut backups: Vec<_> = entries.filter_map(backup_entry).collect();
        backups.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(backups)
    }

    /// Remove every backup whose date (at midnight) is before `now - retention_days`
    ///
    /// Removal failures are logged and skipped. Returns how many directories
    /// were removed.
    pub fn rotate(&self, now: NaiveDateTime) -> BackupResult<usize> {
        let Some(cutoff) = self.cutoff(now) else {
            info!(
                "Retention window of {} days keeps every backup.",
                self.retention_days
            );
            return Ok(0);
        };

        info!(
            "Checking for backups older than {} days (before {})...",
            self.retention_days,
            cutoff.format("%Y-%m-%d %H:%M:%S")
        );

        let mut removed = 0;
        for (path, date) in self.list_backups()? {
            let expired = date.and_hms_opt(0, 0, 0).is_some_and(|start| start < cutoff);
            if !expired {
                continue;
            }

            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            info!("Removing old backup: {}", name);
            match fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) => error!("Failed to remove {}: {}", name, e),
            }
        }

        if removed > 0 {
            info!("{} old backup(s) removed.", removed);
        } else {
            info!("No old backups to remove.");
        }

        Ok(removed)
    }
}
