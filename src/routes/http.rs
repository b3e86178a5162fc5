// GET handlers: version, api/info, api/snapshot. POST api/dashboard/reset.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use tokio::sync::oneshot;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::scheduler::Command;
use crate::version::{NAME, VERSION};

/// A reset waits for the tick in progress; bound the wait.
const RESET_TIMEOUT: Duration = Duration::from_secs(30);

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/info: monitored nodes (never their passwords), host label and interval.
pub(super) async fn api_info_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "host": state.host_label.as_ref(),
        "intervalSecs": state.interval.as_secs(),
        "nodes": state.nodes.as_ref(),
    }))
}

/// GET /api/snapshot: latest snapshot, 404 until the first tick completes.
pub(super) async fn snapshot_handler(State(state): State<AppState>) -> Response {
    let latest = state.latest.borrow().clone();
    match latest {
        Some(snapshot) => axum::Json(snapshot.as_ref().clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no snapshot yet"),
    }
}

/// POST /api/dashboard/reset: forget the live message; the next tick creates a new one.
/// Responds once the scheduler has applied the reset.
pub(super) async fn reset_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = &state.admin_token
        && !bearer_matches(&headers, token)
    {
        return error_response(StatusCode::UNAUTHORIZED, "invalid admin token");
    }

    let (done, applied) = oneshot::channel();
    if state
        .commands
        .send(Command::ResetDashboard { done })
        .await
        .is_err()
    {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "scheduler not running");
    }

    match timeout(RESET_TIMEOUT, applied).await {
        Ok(Ok(())) => {
            tracing::info!(operation = "reset", "dashboard reset requested via admin API");
            axum::Json(serde_json::json!({ "reset": true })).into_response()
        }
        Ok(Err(_)) => error_response(StatusCode::SERVICE_UNAVAILABLE, "scheduler stopped"),
        Err(_) => error_response(StatusCode::GATEWAY_TIMEOUT, "reset not applied in time"),
    }
}

fn bearer_matches(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|given| given == token)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
