//! REST API for the incident dashboard

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::dashboard::DashboardService;
use crate::error::Result;

mod handlers;

pub use handlers::ApiResponse;

/// HTTP front end over a [`DashboardService`]
pub struct ApiServer {
    service: Arc<DashboardService>,
    addr: String,
}

impl ApiServer {
    pub fn new(service: Arc<DashboardService>, addr: impl Into<String>) -> Self {
        Self {
            service,
            addr: addr.into(),
        }
    }

    /// Bind and serve until the process stops
    pub async fn start(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Starting incident API server on {}", listener.local_addr()?);
        axum::serve(listener, router(self.service)).await?;
        Ok(())
    }
}

/// All API routes, ready to be served
pub fn router(service: Arc<DashboardService>) -> Router {
    let state = ApiState { service };

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .route(
            "/api/v1/incidents",
            get(handlers::list_incidents).post(handlers::report_incident),
        )
        .route("/api/v1/incidents/{id}", get(handlers::get_incident))
        .route(
            "/api/v1/incidents/{id}/duration",
            get(handlers::get_duration),
        )
        .route("/api/v1/incidents/{id}/status", post(handlers::change_status))
        .route(
            "/api/v1/incidents/{id}/root-cause",
            put(handlers::record_root_cause),
        )
        .route(
            "/api/v1/incidents/{id}/solution",
            put(handlers::record_solution),
        )
        .route(
            "/api/v1/incidents/{id}/reminder",
            post(handlers::send_reminder),
        )
        .route("/api/v1/stats", get(handlers::get_stats))
        .route("/api/v1/stats/trend", get(handlers::get_trend))
        .route("/api/v1/stats/export", get(handlers::export_stats))
        .route("/api/v1/platforms", get(handlers::list_platforms))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Shared API state
#[derive(Clone)]
struct ApiState {
    service: Arc<DashboardService>,
}
