//! Application configuration
//!
//! Process-level settings taken from the command line, as opposed to the
//! service settings in [`crate::config`].

use anyhow::Result;
use std::path::PathBuf;

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Working directory
    pub working_dir: PathBuf,
    /// Explicit configuration file passed with `--config`
    pub config_file: Option<PathBuf>,
    /// Level used when no `-v` flag is given
    pub base_level: String,
}

impl AppConfig {
    /// Create a new application configuration
    pub fn new(verbose: u8) -> Result<Self> {
        let working_dir = std::env::current_dir()
            .map_err(|e| anyhow::anyhow!("Failed to get current directory: {}", e))?;

        Ok(Self {
            verbose,
            working_dir,
            config_file: None,
            base_level: "info".to_string(),
        })
    }

    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    /// Set the level used at verbosity zero
    pub fn with_base_level(mut self, level: impl Into<String>) -> Self {
        self.base_level = level.into();
        self
    }

    /// Get the log filter string based on verbosity
    pub fn log_level(&self) -> String {
        match self.verbose {
            0 => self.base_level.clone(),
            1 => "debug".to_string(),
            2 => "trace".to_string(),
            _ => "trace,hyper=debug,tower=debug".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            working_dir: PathBuf::from("."),
            config_file: None,
            base_level: "info".to_string(),
        }
    }
}
