//! Path management for drips configuration and logs.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/drips/             # Config directory (platform default)
//! ├── config.toml              # Application configuration
//! └── logs/                    # Application logs
//!     └── drips.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

use drips_core::DripsError;
use drips_core::error::Result;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "DRIPS_CONFIG";

const APP_DIR: &str = "drips";

pub struct DripsPaths;

impl DripsPaths {
    /// Returns the drips configuration directory, e.g. `~/.config/drips/`.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| DripsError::config("Cannot find the user config directory"))
    }

    /// Returns the configuration file path.
    ///
    /// `DRIPS_CONFIG` wins when set and non-empty.
    pub fn config_file() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory rolling log files are written to.
    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
