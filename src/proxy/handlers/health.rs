// Health handler - GET /health with upstream liveness probe

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use super::AppState;
use crate::config::SERVICE_NAME;

/// Handle GET /health. Always 200; upstream reachability is reported in the
/// `upstream_status` field (`online`, `offline (<code>)` or `unreachable`).
pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    let upstream_status = state.upstream.probe_health().await;

    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "upstream_status": upstream_status,
    }))
}
