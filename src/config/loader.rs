use super::{get_global_incidash_dir, ConfigValidator, DashboardConfig, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Resolves, reads and validates the service configuration
pub struct ConfigLoader {
    working_dir: PathBuf,
    global_dir: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            global_dir: get_global_incidash_dir().ok(),
        }
    }

    /// Override the per-user directory (`~/.incidash`)
    pub fn with_global_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.global_dir = dir;
        self
    }

    /// File that [`load`](Self::load) would read, if any
    ///
    /// An explicit path wins, then `incidash.toml` in the working directory,
    /// then `config.toml` in the per-user directory.
    pub fn resolve_path(&self, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let local = self.working_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(Some(local));
        }

        Ok(self
            .global_dir
            .as_ref()
            .map(|dir| dir.join("config.toml"))
            .filter(|path| path.exists()))
    }

    pub async fn load(&self, explicit: Option<&Path>) -> Result<DashboardConfig> {
        let mut config = match self.resolve_path(explicit)? {
            Some(path) => {
                let content = fs::read_to_string(&path).await?;
                let config: DashboardConfig = toml::from_str(&content)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => {
                debug!("No configuration file found, using defaults");
                DashboardConfig::default()
            }
        };

        config.merge_env_vars()?;
        ConfigValidator::validate_config(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_without_any_file() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(dir.path()).with_global_dir(None);
        assert_eq!(loader.resolve_path(None).unwrap(), None);

        let config = loader.load(None).await.unwrap();
        assert_eq!(config.server.port, DashboardConfig::default().server.port);
    }

    #[tokio::test]
    async fn test_working_dir_file_wins_over_global() {
        let local = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        std::fs::write(
            local.path().join(CONFIG_FILE_NAME),
            "[server]\nport = 4100\n",
        )
        .unwrap();
        std::fs::write(global.path().join("config.toml"), "[server]\nport = 4200\n").unwrap();

        let loader =
            ConfigLoader::new(local.path()).with_global_dir(Some(global.path().to_path_buf()));
        let config = loader.load(None).await.unwrap();
        assert_eq!(config.server.port, 4100);
    }

    #[tokio::test]
    async fn test_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[store]\nbackend = \"json\"\npath = \"incidents.json\"\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path()).with_global_dir(None);
        let config = loader.load(Some(&path)).await.unwrap();
        assert_eq!(config.store.backend, StoreBackend::Json);
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(dir.path()).with_global_dir(None);
        let err = loader
            .load(Some(&dir.path().join("absent.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_invalid_file_fails_validation() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[store]\nbackend = \"json\"\n",
        )
        .unwrap();
        let loader = ConfigLoader::new(dir.path()).with_global_dir(None);
        assert!(loader.load(None).await.is_err());
    }
}
