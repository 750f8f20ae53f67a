use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::ApiState;
use crate::analytics::{DashboardFilter, IncidentDuration, IncidentStats, TimeWindow, TrendPoint};
use crate::error::Error;
use crate::incidents::{Incident, IncidentDraft, Status};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Crate error rendered as an error envelope
pub(super) struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Notification(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

pub(super) type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Platform and window query parameters
#[derive(Debug, Deserialize)]
pub(super) struct FilterQuery {
    platform: Option<String>,
    window: Option<String>,
}

impl FilterQuery {
    fn to_filter(&self) -> Result<DashboardFilter, Error> {
        let window = match &self.window {
            Some(raw) => raw.parse()?,
            None => TimeWindow::All,
        };
        Ok(DashboardFilter::new(self.platform.clone(), window))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ExportQuery {
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusRequest {
    status: Status,
}

#[derive(Debug, Deserialize)]
pub(super) struct TextRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReminderRequest {
    email: String,
}

#[derive(Debug, Serialize)]
pub(super) struct HealthReport {
    status: &'static str,
    refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct DurationReport {
    #[serde(flatten)]
    duration: IncidentDuration,
    text: String,
    /// Time since the start of an open incident
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed: Option<String>,
}

/// Re-aggregate after a write so the next read reflects it
async fn refresh_after_write(state: &ApiState) {
    if let Err(e) = state.service.refresh(Utc::now()).await {
        warn!("Failed to refresh dashboard after write: {}", e);
    }
}

pub(super) async fn health_check(State(state): State<ApiState>) -> Response {
    match state.service.health().await {
        Ok(()) => Json(ApiResponse::success(HealthReport {
            status: "healthy",
            refreshed_at: state.service.refreshed_at().await,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error(format!("Store unavailable: {e}"))),
        )
            .into_response(),
    }
}

pub(super) async fn list_incidents(State(state): State<ApiState>) -> ApiResult<Vec<Incident>> {
    ok(state.service.store().list().await?)
}

pub(super) async fn report_incident(
    State(state): State<ApiState>,
    Json(draft): Json<IncidentDraft>,
) -> Result<(StatusCode, Json<ApiResponse<Incident>>), ApiError> {
    let incident = state.service.report_incident(draft).await?;
    refresh_after_write(&state).await;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(incident))))
}

pub(super) async fn get_incident(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Incident> {
    ok(state.service.incident(&id).await?)
}

pub(super) async fn get_duration(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<DurationReport> {
    let summary = state.service.duration(&id, Utc::now()).await?;
    ok(DurationReport {
        duration: summary.recorded,
        text: summary.recorded.to_string(),
        elapsed: summary.elapsed.map(|d| d.to_string()),
    })
}

pub(super) async fn change_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Incident> {
    let incident = state
        .service
        .change_status(&id, request.status, Utc::now())
        .await?;
    refresh_after_write(&state).await;
    ok(incident)
}

pub(super) async fn record_root_cause(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<TextRequest>,
) -> ApiResult<Incident> {
    let incident = state.service.record_root_cause(&id, &request.text).await?;
    refresh_after_write(&state).await;
    ok(incident)
}

pub(super) async fn record_solution(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<TextRequest>,
) -> ApiResult<Incident> {
    let incident = state.service.record_solution(&id, &request.text).await?;
    refresh_after_write(&state).await;
    ok(incident)
}

pub(super) async fn send_reminder(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<ReminderRequest>,
) -> ApiResult<Incident> {
    let incident = state.service.send_reminder(&id, &request.email).await?;
    refresh_after_write(&state).await;
    ok(incident)
}

pub(super) async fn get_stats(
    State(state): State<ApiState>,
    Query(params): Query<FilterQuery>,
) -> ApiResult<IncidentStats> {
    let filter = params.to_filter()?;
    ok(state.service.filtered_stats(&filter, Utc::now()).await)
}

pub(super) async fn get_trend(
    State(state): State<ApiState>,
    Query(params): Query<FilterQuery>,
) -> ApiResult<Vec<TrendPoint>> {
    let filter = params.to_filter()?;
    ok(state.service.trend(&filter, Utc::now()).await)
}

pub(super) async fn export_stats(
    State(state): State<ApiState>,
    Query(params): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let stats = state.service.snapshot().await;
    match params.format.as_deref().unwrap_or("json") {
        "json" => Ok(Json(stats).into_response()),
        "csv" => {
            let csv = stats.team_stats_csv()?;
            Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response())
        }
        other => Err(Error::Validation(format!(
            "unsupported export format '{other}' (expected json or csv)"
        ))
        .into()),
    }
}

pub(super) async fn list_platforms(State(state): State<ApiState>) -> ApiResult<Vec<String>> {
    ok(state.service.platforms().await)
}
