// Admin HTTP + WebSocket surface

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

use crate::models::NodeSummary;
use crate::monitor::LatestSnapshot;
use crate::scheduler::Command;

/// Everything the admin surface reads from or sends to the running monitor.
pub struct AdminDeps {
    pub nodes: Vec<NodeSummary>,
    pub host_label: String,
    pub interval: Duration,
    pub latest: LatestSnapshot,
    pub commands: mpsc::Sender<Command>,
    pub admin_token: Option<String>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) nodes: Arc<Vec<NodeSummary>>,
    pub(crate) host_label: Arc<str>,
    pub(crate) interval: Duration,
    pub(crate) latest: LatestSnapshot,
    pub(crate) commands: mpsc::Sender<Command>,
    pub(crate) admin_token: Option<Arc<str>>,
}

pub fn app(deps: AdminDeps) -> Router {
    let state = AppState {
        nodes: Arc::new(deps.nodes),
        host_label: deps.host_label.into(),
        interval: deps.interval,
        latest: deps.latest,
        commands: deps.commands,
        admin_token: deps
            .admin_token
            .filter(|t| !t.is_empty())
            .map(Into::into),
    };
    Router::new()
        .route("/", get(|| async { "lavawatch: Lavalink node dashboard" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/info", get(http::api_info_handler)) // GET /api/info
        .route("/api/snapshot", get(http::snapshot_handler)) // GET /api/snapshot
        .route("/api/dashboard/reset", post(http::reset_handler)) // POST /api/dashboard/reset
        .route("/ws/snapshots", get(ws::ws_snapshots)) // WS /ws/snapshots
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
