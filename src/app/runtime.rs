//! Runtime initialization and setup
//!
//! This module loads the service configuration, starts logging and wires the
//! store, notifier and dashboard together.

use crate::app::{config::AppConfig, logging::init_logging};
use crate::config::{ConfigLoader, DashboardConfig};
use crate::dashboard::DashboardService;
use crate::notifications::NotificationService;
use crate::store::open_store;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

/// Load configuration and initialize logging
pub async fn initialize_app(app: AppConfig) -> Result<(AppConfig, DashboardConfig)> {
    let config = ConfigLoader::new(&app.working_dir)
        .load(app.config_file.as_deref())
        .await
        .context("Failed to load configuration")?;

    let app = app.with_base_level(config.log_level().to_ascii_lowercase());
    init_logging(&app);
    debug!(
        "Using {} store, notifications {}",
        config.store.backend,
        if config.notifications.enabled { "enabled" } else { "disabled" }
    );

    Ok((app, config))
}

/// Open the configured store and build the dashboard service on top of it
pub async fn build_dashboard(config: &DashboardConfig) -> Result<Arc<DashboardService>> {
    let store = open_store(&config.store)
        .await
        .with_context(|| format!("Failed to open {} store", config.store.backend))?;
    let notifier = NotificationService::from_config(&config.notifications)
        .context("Failed to set up notifications")?;
    Ok(Arc::new(DashboardService::new(store, notifier)))
}
