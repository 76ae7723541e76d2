use axum::{routing::get, Router};

use crate::controllers::dashboard_controller::{get_locale, get_scene, get_status};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/scene",  get(get_scene))
        .route("/status", get(get_status))
        .route("/locale", get(get_locale))
        .with_state(state)
}
