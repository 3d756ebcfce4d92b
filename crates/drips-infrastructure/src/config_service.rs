//! Configuration service implementation.
//!
//! Loads [`DripsConfig`] from `config.toml` and caches it. A missing file is
//! not an error: every setting has a default.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use drips_core::DripsError;
use drips_core::config::DripsConfig;
use drips_core::error::Result;

use crate::paths::DripsPaths;

#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<DripsConfig>>>,
}

impl ConfigService {
    /// Uses the default location (or `DRIPS_CONFIG`).
    pub fn new_default() -> Result<Self> {
        Ok(Self::with_path(DripsPaths::config_file()?))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<DripsConfig> {
        {
            let cached = self
                .config
                .read()
                .map_err(|_| DripsError::internal("config cache lock poisoned"))?;
            if let Some(ref config) = *cached {
                return Ok(config.clone());
            }
        }

        let loaded = Self::load_config(&self.path)?;

        let mut cached = self
            .config
            .write()
            .map_err(|_| DripsError::internal("config cache lock poisoned"))?;
        *cached = Some(loaded.clone());

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cached) = self.config.write() {
            *cached = None;
        }
    }

    fn load_config(path: &Path) -> Result<DripsConfig> {
        if !path.exists() {
            tracing::debug!(
                "[ConfigService] No config at {}, using defaults",
                path.display()
            );
            return Ok(DripsConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: DripsConfig = toml::from_str(&content)?;
        config.validate()?;

        tracing::info!("[ConfigService] Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        let config = service.get_config().expect("Should fall back to defaults");
        assert_eq!(config, DripsConfig::default());
    }

    #[test]
    fn test_loads_and_caches_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nlimit = 50\n").unwrap();

        let service = ConfigService::with_path(&path);
        assert_eq!(service.get_config().unwrap().search.limit, 50);

        // Cached until invalidated
        std::fs::write(&path, "[search]\nlimit = 25\n").unwrap();
        assert_eq!(service.get_config().unwrap().search.limit, 50);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().search.limit, 25);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[avatar]\nworkers = 0\n").unwrap();

        let err = ConfigService::with_path(&path).get_config().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_unparsable_file_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session\ndebounce_ms = ").unwrap();

        let err = ConfigService::with_path(&path).get_config().unwrap_err();
        assert!(err.is_serialization());
    }
}
