// Dashboard HTTP API server
//
// Read-only JSON endpoints consumed by the dashboard's charts, tables, and
// map, plus the poll triggers used by external cron and manual debugging.

use super::ApiConfig;
use crate::now_ms;
use crate::prpc::NodeSource;
use crate::stats::StatsPoller;
use crate::store::StatsDb;
use crate::types::NetworkSummary;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub source: Arc<dyn NodeSource>,
    pub db: StatsDb,
    pub poller: Arc<StatsPoller>,
}

/// HTTP server for the dashboard API.
pub struct ApiServer {
    config: ApiConfig,
    state: ApiState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: ApiState) -> Self {
        Self { config, state }
    }

    /// Start the API server (runs until the process exits).
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            target: "api",
            url = %format!("http://{}", addr),
            "Dashboard API ready"
        );

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the API router. Exposed separately so tests can serve it on an
/// ephemeral port.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/network", get(network_handler))
        .route("/api/nodes", get(nodes_handler))
        .route("/api/nodes/:id", get(node_stats_handler))
        .route("/api/history", get(history_handler))
        .route("/api/activity", get(activity_handler))
        .route("/api/cron/update-stats", get(cron_update_handler))
        .route("/api/debug/poll", get(debug_poll_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// 500 with the JSON error object the UI expects.
fn internal_error(msg: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": msg })),
    )
}

/// Network-wide health summary from a live node fetch.
async fn network_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match state.source.pnodes().await {
        Ok(nodes) => Json(NetworkSummary::from_nodes(&nodes)).into_response(),
        Err(e) => {
            error!(target: "api", error = %e, "Failed to fetch network summary");
            internal_error("Failed to fetch network summary").into_response()
        }
    }
}

/// Full node inventory.
async fn nodes_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match state.source.pnodes().await {
        Ok(nodes) => Json(nodes).into_response(),
        Err(e) => {
            error!(target: "api", error = %e, "Failed to fetch pNodes");
            internal_error("Failed to fetch pNodes").into_response()
        }
    }
}

/// Statistics for a single node.
async fn node_stats_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.source.node_stats(&id).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!(target: "api", node_id = %id, error = %e, "Failed to fetch node stats");
            internal_error(&format!("Failed to fetch stats for node {}", id)).into_response()
        }
    }
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_hours")]
    hours: i64,
}

fn default_hours() -> i64 {
    24
}

/// Hourly aggregates for the health chart.
async fn history_handler(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let stats = state.db.historical_stats(query.hours).await;
    Json(stats)
}

#[derive(Deserialize)]
struct ActivityQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Recent activity feed, newest first.
async fn activity_handler(
    State(state): State<ApiState>,
    Query(query): Query<ActivityQuery>,
) -> impl IntoResponse {
    let logs = state.db.recent_activity(query.limit).await;
    Json(logs)
}

/// External cron hook: run one poll cycle now.
async fn cron_update_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match state.poller.run_once().await {
        Ok(()) => Json(json!({ "success": true, "timestamp": now_ms() })).into_response(),
        Err(e) => {
            error!(target: "api", error = %e, "Scheduled stats update failed");
            internal_error("Failed to update stats").into_response()
        }
    }
}

/// Manual poll trigger for debugging.
async fn debug_poll_handler(State(state): State<ApiState>) -> impl IntoResponse {
    info!(target: "api", "Manual poll trigger");
    match state.poller.run_once().await {
        Ok(()) => Json(json!({ "status": "poll triggered" })).into_response(),
        Err(e) => {
            error!(target: "api", error = %e, "Manual poll failed");
            internal_error("Failed").into_response()
        }
    }
}
