//! Configuration module for extbackup
//!
//! This module provides configuration management including:
//! - Config file location resolution
//! - YAML backup settings with defaults

pub mod paths;
pub mod settings;

pub use paths::{expand_tilde, ConfigPaths};
pub use settings::{BackupConfig, DEFAULT_EXCLUSIONS};
