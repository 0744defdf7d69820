// API key authentication middleware

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::proxy::error::ApiError;

/// True for paths that require the master API key. Matches the API surface
/// only; unknown paths fall through to the 404 handler unauthenticated.
fn is_protected_path(path: &str) -> bool {
    path.starts_with("/v1/") || path == "/generate"
}

/// Extract the bearer token from the Authorization header.
fn extract_api_key(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

/// Master-key comparison on API paths. Health checks and CORS preflight
/// pass through.
pub async fn auth_middleware(
    State(config): State<Arc<GatewayConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if request.method() == Method::OPTIONS || !is_protected_path(&path) {
        return next.run(request).await;
    }

    let provided = extract_api_key(&request).map(|k| k.to_string());
    match provided {
        Some(key) if key == config.api_master_key => next.run(request).await,
        provided => {
            tracing::warn!(
                "Rejected request to {} ({} API key)",
                path,
                if provided.is_some() { "wrong" } else { "missing" }
            );
            ApiError::invalid_api_key().into_response()
        }
    }
}
