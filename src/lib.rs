//! extbackup - scheduled incremental backups to an external drive
//!
//! This library provides the core functionality for the extbackup command.
//! A run verifies the destination drive is mounted and has room, mirrors
//! the source tree into a dated directory with rsync, prunes dated
//! directories older than the retention window, and tells the operator how
//! it went.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Config file location and YAML settings
//! - `error`: Custom error types
//! - `backup`: Orchestration, verification, transfer, rotation, cancellation
//! - `process`: External command execution
//! - `notify`: Desktop notifications
//! - `logging`: Terminal and file log sinks
//! - `display`: Duration and size formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use extbackup::config::BackupConfig;
//!
//! let config = BackupConfig::load(Path::new("~/.config/extbackup/config.yaml"))?;
//! config.validate()?;
//! ```

pub mod backup;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod notify;
pub mod process;

#[cfg(test)]
mod testing;

pub use error::{BackupError, BackupResult};
