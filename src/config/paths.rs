//! Path management for extbackup
//!
//! Resolves where the configuration file lives and expands `~` in
//! user-supplied paths.
//!
//! ## Config File Resolution Order
//!
//! 1. `--config <path>` on the command line
//! 2. `EXTBACKUP_CONFIG` environment variable (if set)
//! 3. `$XDG_CONFIG_HOME/extbackup/config.yaml` or `~/.config/extbackup/config.yaml`

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::BackupError;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "EXTBACKUP_CONFIG";

/// Name of the config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Manages all paths used by extbackup
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Directory holding the configuration file
    config_dir: PathBuf,
}

impl ConfigPaths {
    /// Create a new ConfigPaths instance using the platform config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, BackupError> {
        let config_dir = resolve_default_dir()?;
        Ok(Self { config_dir })
    }

    /// Create ConfigPaths with a custom config directory (useful for testing)
    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the config directory (~/.config/extbackup/ or equivalent)
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Get the default config file path
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Pick the config file: explicit override first, then the default location
    pub fn resolve(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => expand_tilde(path),
            None => self.config_file(),
        }
    }
}

/// Resolve the default config directory
fn resolve_default_dir() -> Result<PathBuf, BackupError> {
    // Honour XDG_CONFIG_HOME explicitly so it also applies on macOS
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("extbackup"));
        }
    }

    let base = BaseDirs::new()
        .ok_or_else(|| BackupError::Config("Could not determine home directory".into()))?;
    Ok(base.home_dir().join(".config").join("extbackup"))
}

/// Expand a leading `~` to the user's home directory
///
/// Paths without a leading `~` are returned unchanged, as are paths
/// when no home directory can be determined. A trailing `/` survives the
/// expansion, since rsync reads `dir/` and `dir` differently.
pub fn expand_tilde(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    let Some(base) = BaseDirs::new() else {
        return path.to_path_buf();
    };

    let mut expanded = base.home_dir().join(rest).into_os_string();
    let wants_slash = path.as_os_str().to_string_lossy().ends_with('/');
    if wants_slash && !expanded.to_string_lossy().ends_with('/') {
        expanded.push("/");
    }
    PathBuf::from(expanded)
}
