//! Log sink setup
//!
//! Installs a `tracing` subscriber with two outputs:
//!
//! - the terminal, as `[LEVEL] message` at INFO (DEBUG with `--verbose`)
//! - `<log_dir>/backup.log`, always at DEBUG, each line timestamped
//!
//! The log file is rotated by size when the process starts.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::error::{BackupError, BackupResult};

/// File name of the persistent log inside the log directory
pub const LOG_FILE_NAME: &str = "backup.log";

/// Rotate once the log reaches this size
pub const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

/// Number of rotated files kept (`backup.log.1` .. `backup.log.3`)
pub const ROTATED_FILES: usize = 3;

/// Formats one event per line, optionally with a timestamp
#[derive(Debug, Clone, Copy)]
pub struct LineFormat {
    timestamps: bool,
}

impl LineFormat {
    /// `[INFO] message`
    pub fn terminal() -> Self {
        Self { timestamps: false }
    }

    /// `2025-01-01 03:00:00 [INFO    ] message`
    pub fn file() -> Self {
        Self { timestamps: true }
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG | Level::TRACE => "DEBUG",
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = level_name(event.metadata().level());
        if self.timestamps {
            write!(
                writer,
                "{} [{:<8}] ",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level
            )?;
        } else {
            write!(writer, "[{}] ", level)?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber; returns the log file path
pub fn init(log_dir: &Path, verbose: bool) -> BackupResult<PathBuf> {
    fs::create_dir_all(log_dir).map_err(|e| {
        BackupError::Config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let log_file = log_dir.join(LOG_FILE_NAME);
    rotate_if_needed(&log_file, MAX_LOG_BYTES, ROTATED_FILES)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| {
            BackupError::Config(format!("Failed to open {}: {}", log_file.display(), e))
        })?;

    let terminal_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let terminal_layer = tracing_subscriber::fmt::layer()
        .event_format(LineFormat::terminal())
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_filter(terminal_level);

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(LineFormat::file())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BackupError::Config(format!("Failed to initialise logging: {}", e)))?;

    Ok(log_file)
}

/// Shift `path` to `path.1` (and older files up) once it reaches `max_bytes`
pub fn rotate_if_needed(path: &Path, max_bytes: u64, keep: usize) -> BackupResult<()> {
    let Ok(metadata) = fs::metadata(path) else {
        return Ok(());
    };

    if metadata.len() < max_bytes || keep == 0 {
        return Ok(());
    }

    for i in (1..keep).rev() {
        let from = numbered(path, i);
        if from.exists() {
            fs::rename(&from, numbered(path, i + 1))?;
        }
    }

    fs::rename(path, numbered(path, 1))?;
    Ok(())
}

fn numbered(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}", n));
    PathBuf::from(name)
}
