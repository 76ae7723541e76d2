use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::models::scene::Scene;
use crate::models::status::SchedulerStatus;
use crate::shared_state::AppState;

/// GET /api/scene
/// Current dashboard scene
///
/// Returns everything a front end needs to draw the power flow picture: labels,
/// icon states and the transitions that are playing right now.
#[utoipa::path(
    get,
    path = "/api/scene",
    responses(
        (status = 200, description = "Current scene", body = Scene),
        (status = 503, description = "Scene not readable")
    )
)]
pub async fn get_scene(State(state): State<AppState>) -> impl IntoResponse {
    match state.scene_snapshot() {
        Some(scene) => (StatusCode::OK, Json(scene)).into_response(),
        None => unavailable("scene not readable"),
    }
}

/// GET /api/status
/// Refresh loop health
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Fetch and batch counters", body = SchedulerStatus),
        (status = 503, description = "Status not readable")
    )
)]
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.status_snapshot() {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => unavailable("status not readable"),
    }
}

/// GET /api/locale
/// Active translation table
#[utoipa::path(
    get,
    path = "/api/locale",
    responses(
        (status = 200, description = "Key to text map of the active language", body = std::collections::HashMap<String, String>)
    )
)]
pub async fn get_locale(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.locale.strings().clone()).into_response()
}

fn unavailable(message: &str) -> axum::response::Response {
    (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "error": message }))).into_response()
}
