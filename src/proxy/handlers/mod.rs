// Handlers module - API endpoint processors

pub mod health;
pub mod images;

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::proxy::upstream::UpstreamClient;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(config: Arc<GatewayConfig>, upstream: Arc<UpstreamClient>) -> Self {
        Self { config, upstream }
    }
}
