use super::{DashboardConfig, NotificationsConfig, StoreBackend, StoreConfig};
use crate::error::{Error, Result};
use crate::incidents::draft::is_valid_email;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub struct ConfigValidator;

impl ConfigValidator {
    /// Check the whole configuration, reporting every problem at once
    pub fn validate_config(config: &DashboardConfig) -> Result<()> {
        let mut problems = Vec::new();

        if let Some(level) = &config.log_level {
            if !VALID_LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                problems.push(format!(
                    "Invalid log level: {}. Must be one of: {:?}",
                    level, VALID_LOG_LEVELS
                ));
            }
        }

        problems.extend(Self::store_problems(&config.store));

        if config.server.host.trim().is_empty() {
            problems.push("server.host cannot be empty".to_string());
        }

        problems.extend(Self::notification_problems(&config.notifications));

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }

    fn store_problems(store: &StoreConfig) -> Vec<String> {
        let mut problems = Vec::new();

        match store.backend {
            StoreBackend::Memory => {}
            StoreBackend::Json | StoreBackend::Sqlite if store.path.is_none() => {
                problems.push(format!(
                    "store.path is required for the {} backend",
                    store.backend
                ));
            }
            _ => {}
        }

        if store.backend == StoreBackend::Sqlite && !cfg!(feature = "sqlite") {
            problems.push(
                "store.backend = \"sqlite\" requires building with the 'sqlite' feature"
                    .to_string(),
            );
        }

        problems
    }

    fn notification_problems(notifications: &NotificationsConfig) -> Vec<String> {
        let mut problems = Vec::new();
        if !notifications.enabled {
            return problems;
        }

        if !is_valid_email(&notifications.from) {
            problems.push(format!(
                "notifications.from is not a valid e-mail address: {}",
                notifications.from
            ));
        }
        if let Some(recipient) = &notifications.critical_recipient {
            if !is_valid_email(recipient) {
                problems.push(format!(
                    "notifications.critical_recipient is not a valid e-mail address: {recipient}"
                ));
            }
        }
        if let Some(endpoint) = &notifications.endpoint {
            if !is_http_url(endpoint) {
                problems.push(format!(
                    "notifications.endpoint must be an http(s) URL: {endpoint}"
                ));
            }
        }
        if !is_http_url(&notifications.public_app_url) {
            problems.push(format!(
                "notifications.public_app_url must be an http(s) URL: {}",
                notifications.public_app_url
            ));
        }

        problems
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
