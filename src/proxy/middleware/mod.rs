// Middleware stack: API key auth and CORS

pub mod auth;

pub use auth::auth_middleware;

use axum::http::{header, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// CORS layer for the public API: permissive origin, the two headers
/// browsers actually send, preflight cached for a day.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86_400))
}
