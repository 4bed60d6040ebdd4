//! Mount and free-space verification for the destination drive

use std::path::Path;

use tracing::{error, info, warn};

use crate::display::{bytes_to_gib, format_gib};
use crate::error::{BackupError, BackupResult};
use crate::notify::{Notifier, Urgency};

/// Filesystem capacity figures, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    /// Space available to unprivileged users
    pub free: u64,
}

impl DiskUsage {
    /// Percentage of the filesystem in use
    pub fn percent_used(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.used as f64 / self.total as f64 * 100.0
    }

    pub fn free_gib(&self) -> f64 {
        bytes_to_gib(self.free)
    }
}

/// Queries the filesystem a path lives on
pub trait DiskProbe {
    /// Whether `path` is the root of a mounted filesystem
    fn is_mount_point(&self, path: &Path) -> BackupResult<bool>;

    /// Capacity of the filesystem holding `path`
    fn usage(&self, path: &Path) -> BackupResult<DiskUsage>;
}

/// Probe backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDisk;

#[cfg(unix)]
impl DiskProbe for SystemDisk {
    fn is_mount_point(&self, path: &Path) -> BackupResult<bool> {
        use std::os::unix::fs::MetadataExt;

        let meta = std::fs::metadata(path)?;
        if !meta.is_dir() {
            return Ok(false);
        }

        let parent = std::fs::metadata(path.join(".."))?;

        // A different device than the parent, or `/` itself (same inode as its parent)
        Ok(meta.dev() != parent.dev() || meta.ino() == parent.ino())
    }

    fn usage(&self, path: &Path) -> BackupResult<DiskUsage> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| BackupError::Io(format!("Path contains NUL: {}", path.display())))?;

        let mut stat = std::mem::MaybeUninit::<libc::statvfs>::uninit();
        // SAFETY: c_path is NUL-terminated and stat points to writable memory
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        // SAFETY: statvfs returned 0, so the struct is initialised
        let stat = unsafe { stat.assume_init() };

        let frsize = stat.f_frsize as u64;
        let total = stat.f_blocks as u64 * frsize;
        let used = (stat.f_blocks as u64).saturating_sub(stat.f_bfree as u64) * frsize;
        let free = stat.f_bavail as u64 * frsize;

        Ok(DiskUsage { total, used, free })
    }
}

/// Result of comparing free space against the configured minimum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceVerdict {
    /// At least twice the minimum is free
    Plenty,
    /// Above the minimum but below twice the minimum
    Low,
    /// Below the minimum
    Insufficient,
}

impl SpaceVerdict {
    /// Classify `free_gib` against `minimum_gib`
    pub fn classify(free_gib: f64, minimum_gib: f64) -> Self {
        if free_gib < minimum_gib {
            Self::Insufficient
        } else if free_gib < minimum_gib * 2.0 {
            Self::Low
        } else {
            Self::Plenty
        }
    }

    /// Whether the run may continue
    pub fn may_proceed(&self) -> bool {
        !matches!(self, Self::Insufficient)
    }
}

/// Verify the destination exists and is a mounted filesystem
///
/// Logs the verdict and sends a critical notification on failure.
pub fn check_mount(probe: &dyn DiskProbe, notifier: &dyn Notifier, destination: &Path) -> bool {
    if !destination.exists() {
        error!("Destination directory does not exist: {}", destination.display());
        notifier.notify(
            "Backup Failed",
            &format!("The destination directory does not exist:\n{}", destination.display()),
            Urgency::Critical,
        );
        return false;
    }

    match probe.is_mount_point(destination) {
        Ok(true) => {
            info!("External drive mounted at: {}", destination.display());
            true
        }
        Ok(false) => {
            error!("External drive is not mounted at: {}", destination.display());
            notifier.notify(
                "Backup Failed",
                &format!(
                    "The external drive is not mounted at:\n{}\n\nConnect the drive and try again.",
                    destination.display()
                ),
                Urgency::Critical,
            );
            false
        }
        Err(e) => {
            error!("Could not check mount point {}: {}", destination.display(), e);
            notifier.notify(
                "Backup Failed",
                &format!("Could not check whether {} is mounted:\n{}", destination.display(), e),
                Urgency::Critical,
            );
            false
        }
    }
}

/// Verify the destination has at least `minimum_gib` free
///
/// Below the minimum is a hard failure with a critical notification;
/// below twice the minimum sends a single normal-urgency warning.
pub fn check_space(
    probe: &dyn DiskProbe,
    notifier: &dyn Notifier,
    destination: &Path,
    minimum_gib: f64,
) -> bool {
    let usage = match probe.usage(destination) {
        Ok(usage) => usage,
        Err(e) => {
            error!("Failed to check disk space: {}", e);
            notifier.notify(
                "Backup Failed",
                &format!("Could not check disk space:\n{}", e),
                Urgency::Critical,
            );
            return false;
        }
    };

    let free_gib = usage.free_gib();
    let percent_used = usage.percent_used();

    info!(
        "Disk space - Total: {} | Used: {} ({:.1}%) | Free: {}",
        format_gib(usage.total),
        format_gib(usage.used),
        percent_used,
        format_gib(usage.free)
    );

    let verdict = SpaceVerdict::classify(free_gib, minimum_gib);
    match verdict {
        SpaceVerdict::Insufficient => {
            error!(
                "DRIVE FULL - Free space: {:.1} GB, minimum required: {:.1} GB. Backup cancelled.",
                free_gib, minimum_gib
            );
            notifier.notify(
                "Drive Full - Backup Cancelled",
                &format!(
                    "Not enough space on the destination drive!\n\n\
                     Free: {:.1} GB\n\
                     Minimum required: {:.1} GB\n\
                     Used: {:.1}%\n\n\
                     The backup will NOT run.\n\
                     Free up space on the drive or lower\n\
                     'min_free_space_gb' in the configuration file.",
                    free_gib, minimum_gib, percent_used
                ),
                Urgency::Critical,
            );
        }
        SpaceVerdict::Low => {
            warn!(
                "Low disk space! Free: {:.1} GB. Consider freeing space soon.",
                free_gib
            );
            notifier.notify(
                "Low Disk Space",
                &format!(
                    "The drive has only {:.1} GB free.\nConsider freeing space soon.",
                    free_gib
                ),
                Urgency::Normal,
            );
        }
        SpaceVerdict::Plenty => {}
    }

    verdict.may_proceed()
}
