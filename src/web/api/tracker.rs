use axum::{extract::State, Json};

use crate::tracker::TrackerStatus;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::server::AppState;

#[utoipa::path(
    post,
    path = "/api/tracker/toggle",
    responses(
        (status = 200, description = "Tracking toggled", body = TrackerStatus),
        (status = 500, description = "Tracker error", body = ErrorResponse)
    ),
    tag = "tracker"
)]
pub async fn toggle(State(state): State<AppState>) -> ApiResult<Json<TrackerStatus>> {
    let mut tracker = state.tracker.lock().await;
    Ok(Json(tracker.toggle().await?))
}

#[utoipa::path(
    post,
    path = "/api/tracker/start",
    responses(
        (status = 200, description = "Tracking started", body = TrackerStatus),
        (status = 409, description = "Tracker already running", body = ErrorResponse)
    ),
    tag = "tracker"
)]
pub async fn start(State(state): State<AppState>) -> ApiResult<Json<TrackerStatus>> {
    let mut tracker = state.tracker.lock().await;
    Ok(Json(tracker.start().await?))
}

#[utoipa::path(
    post,
    path = "/api/tracker/stop",
    responses(
        (status = 200, description = "Tracking stopped", body = TrackerStatus)
    ),
    tag = "tracker"
)]
pub async fn stop(State(state): State<AppState>) -> Json<TrackerStatus> {
    let mut tracker = state.tracker.lock().await;
    Json(tracker.stop().await)
}

#[utoipa::path(
    get,
    path = "/api/tracker/status",
    responses(
        (status = 200, description = "Tracker status", body = TrackerStatus)
    ),
    tag = "tracker"
)]
pub async fn status(State(state): State<AppState>) -> Json<TrackerStatus> {
    let tracker = state.tracker.lock().await;
    Json(tracker.status())
}
