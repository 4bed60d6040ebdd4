//! Backup settings for extbackup
//!
//! A `BackupConfig` is an immutable snapshot of everything one backup run
//! needs: where to copy from, where to copy to, how long to keep old
//! backups, and which paths to leave out.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::expand_tilde;
use crate::error::BackupError;

/// Exclusion patterns applied when the config file does not list its own
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    ".cache/*",
    "Trash/*",
    ".local/share/Trash/*",
    "__pycache__/*",
    "*.tmp",
    ".venv/*",
    "node_modules/*",
    ".thumbnails/*",
    "snap/*",
];

/// Configuration for a backup run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory tree to back up
    #[serde(default)]
    pub source: String,

    /// Mount point of the external drive
    #[serde(default)]
    pub destination: String,

    /// Directory for the persistent log file
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Days a backup is kept before rotation removes it
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Minimum free space on the destination, in GB
    #[serde(default = "default_min_free_space_gb")]
    pub min_free_space_gb: f64,

    /// Glob patterns passed to the transfer tool as exclusions
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<String>,
}

fn default_log_dir() -> String {
    "~/logs/backup".to_string()
}

fn default_retention_days() -> u32 {
    30
}

fn default_min_free_space_gb() -> f64 {
    5.0
}

/// Owned copy of the built-in exclusion list
pub fn default_exclusions() -> Vec<String> {
    DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            destination: String::new(),
            log_dir: default_log_dir(),
            retention_days: default_retention_days(),
            min_free_space_gb: default_min_free_space_gb(),
            exclusions: default_exclusions(),
        }
    }
}

impl BackupConfig {
    /// Create a config for the given source and destination with defaults elsewhere
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Load a config from a YAML file
    ///
    /// An empty file yields the defaults, which then fail [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self, BackupError> {
        let path = expand_tilde(path);

        if !path.exists() {
            return Err(BackupError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            BackupError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&contents)
    }

    /// Parse a config from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, BackupError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        // A document holding only `~` or comments parses as null
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        if value.is_null() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_value(value)?)
    }

    /// Check that a run may start with this config
    pub fn validate(&self) -> Result<(), BackupError> {
        if self.source.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(BackupError::Validation(
                "'source' and 'destination' must be set in the configuration file".into(),
            ));
        }

        if !self.min_free_space_gb.is_finite() || self.min_free_space_gb < 0.0 {
            return Err(BackupError::Validation(format!(
                "'min_free_space_gb' must be a non-negative number, got {}",
                self.min_free_space_gb
            )));
        }

        Ok(())
    }

    /// Source path with `~` expanded
    pub fn source_path(&self) -> PathBuf {
        expand_tilde(&self.source)
    }

    /// Destination path with `~` expanded
    pub fn destination_path(&self) -> PathBuf {
        expand_tilde(&self.destination)
    }

    /// Log directory with `~` expanded
    pub fn log_dir_path(&self) -> PathBuf {
        expand_tilde(&self.log_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BackupConfig::default();
        assert_eq!(config.log_dir, "~/logs/backup");
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.min_free_space_gb, 5.0);
        assert_eq!(config.exclusions.len(), DEFAULT_EXCLUSIONS.len());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_exclusions_are_not_shared() {
        let mut first = BackupConfig::default();
        let second = BackupConfig::default();

        first.exclusions.push("*.iso".into());

        assert_eq!(second.exclusions, default_exclusions());
        assert_ne!(first.exclusions, second.exclusions);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = BackupConfig::from_yaml(
            "source: /home/ana\ndestination: /media/ana/HD\nretention_days: 7\n",
        )
        .unwrap();

        assert_eq!(config.source, "/home/ana");
        assert_eq!(config.destination, "/media/ana/HD");
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.min_free_space_gb, 5.0);
        assert_eq!(config.exclusions, default_exclusions());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_exclusions_replace_defaults() {
        let config = BackupConfig::from_yaml(
            "source: /src\ndestination: /dst\nexclusions:\n  - '*.iso'\n  - Downloads/*\n",
        )
        .unwrap();

        assert_eq!(config.exclusions, vec!["*.iso", "Downloads/*"]);
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        assert_eq!(BackupConfig::from_yaml("").unwrap(), BackupConfig::default());
        assert_eq!(
            BackupConfig::from_yaml("# nothing here\n").unwrap(),
            BackupConfig::default()
        );
    }

    #[test]
    fn test_invalid_yaml() {
        let err = BackupConfig::from_yaml("source: [unterminated").unwrap_err();
        assert!(matches!(err, BackupError::Yaml(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = BackupConfig::load(&temp_dir.path().join("missing.yaml")).unwrap_err();

        assert!(err.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "source: /home/ana\ndestination: /mnt/usb\nmin_free_space_gb: 12.5\n",
        )
        .unwrap();

        let config = BackupConfig::load(&path).unwrap();
        assert_eq!(config.min_free_space_gb, 12.5);
        assert_eq!(config.destination_path(), PathBuf::from("/mnt/usb"));
    }

    #[test]
    fn test_validate_rejects_negative_space() {
        let mut config = BackupConfig::new("/src", "/dst");
        config.min_free_space_gb = -1.0;
        assert!(config.validate().is_err());

        config.min_free_space_gb = f64::NAN;
        assert!(config.validate().is_err());

        config.min_free_space_gb = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_paths() {
        assert!(BackupConfig::new("  ", "/dst").validate().is_err());
        assert!(BackupConfig::new("/src", "").validate().is_err());
    }
}
