//! Service configuration
//!
//! Settings are read from a TOML file, overridden by `INCIDASH_*` environment
//! variables, and validated as a whole before use.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

pub mod loader;
pub mod validator;

pub use loader::ConfigLoader;
pub use validator::ConfigValidator;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "incidash.toml";

/// Per-user configuration directory, `~/.incidash`
pub fn get_global_incidash_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".incidash"))
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub log_level: Option<String>,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Json,
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Json => "json",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::Config(format!(
                "Unknown store backend '{other}'. Must be one of: memory, json, sqlite"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Data file for the `json` and `sqlite` backends
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    /// Mail relay accepting JSON messages; messages are only logged when unset
    pub endpoint: Option<String>,
    /// Bearer token sent to the relay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub from: String,
    /// Receives the P0 alert
    pub critical_recipient: Option<String>,
    /// Base URL used to build the update links in reminders
    pub public_app_url: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            auth_token: None,
            from: "incidents@localhost".to_string(),
            critical_recipient: None,
            public_app_url: "http://localhost:3000".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `INCIDASH_*` overrides read through `lookup`
    ///
    /// Every value that fails to parse is reported in one `Error::Config`.
    pub fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let mut problems = Vec::new();

        if let Some(level) = lookup("INCIDASH_LOG_LEVEL") {
            self.log_level = Some(level);
        }

        if let Some(backend) = lookup("INCIDASH_STORE_BACKEND") {
            match backend.parse() {
                Ok(backend) => self.store.backend = backend,
                Err(e) => problems.push(format!("INCIDASH_STORE_BACKEND: {e}")),
            }
        }
        if let Some(path) = lookup("INCIDASH_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(host) = lookup("INCIDASH_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("INCIDASH_SERVER_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => problems.push(format!("INCIDASH_SERVER_PORT={port}: {e}")),
            }
        }

        if let Some(enabled) = lookup("INCIDASH_NOTIFICATIONS_ENABLED") {
            match enabled.trim().parse::<bool>() {
                Ok(value) => self.notifications.enabled = value,
                Err(_) => problems.push(format!(
                    "INCIDASH_NOTIFICATIONS_ENABLED={enabled}: expected true or false"
                )),
            }
        }
        if let Some(endpoint) = lookup("INCIDASH_NOTIFICATIONS_ENDPOINT") {
            self.notifications.endpoint = Some(endpoint);
        }
        if let Some(token) = lookup("INCIDASH_NOTIFICATIONS_TOKEN") {
            self.notifications.auth_token = Some(token);
        }
        if let Some(from) = lookup("INCIDASH_NOTIFICATIONS_FROM") {
            self.notifications.from = from;
        }
        if let Some(recipient) = lookup("INCIDASH_CRITICAL_RECIPIENT") {
            self.notifications.critical_recipient = Some(recipient);
        }
        if let Some(url) = lookup("INCIDASH_PUBLIC_APP_URL") {
            self.notifications.public_app_url = url;
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Invalid environment overrides: {}",
                problems.join("; ")
            )))
        }
    }
}
