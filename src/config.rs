// Gateway configuration
//
// All values are resolved once at startup from defaults plus environment
// overrides, then shared immutably across requests. The master key default
// exists so the gateway works out of the box; deployments are expected to
// override it via FREEAI_API_MASTER_KEY.

use std::time::Duration;

/// Service name reported by /health.
pub const SERVICE_NAME: &str = "freeai-image-gateway";

/// Static gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Master API key clients must present as `Authorization: Bearer <key>`.
    pub api_master_key: String,
    /// Base URL of the upstream image-generation service (no trailing slash).
    pub upstream_url: String,
    /// Model name reported as the default.
    pub default_model: String,
    /// Model aliases accepted in the `model` field of inbound requests.
    pub compatible_models: Vec<String>,
    /// Delay between two consecutive task status polls.
    pub poll_interval: Duration,
    /// Hard wall-clock ceiling for one task's polling loop.
    pub poll_timeout: Duration,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_master_key: "freeai-to-api-key".to_string(),
            upstream_url: "https://freeaiimage.net".to_string(),
            default_model: "dall-e-3".to_string(),
            compatible_models: vec![
                "dall-e-3".to_string(),
                "freeai-image".to_string(),
                "gpt-image".to_string(),
            ],
            poll_interval: Duration::from_millis(2_000),
            poll_timeout: Duration::from_millis(180_000),
            host: "127.0.0.1".to_string(),
            port: 8045,
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("FREEAI_API_MASTER_KEY") {
            if !key.trim().is_empty() {
                config.api_master_key = key;
            }
        }
        if let Ok(url) = std::env::var("FREEAI_UPSTREAM_URL") {
            if !url.trim().is_empty() {
                config.upstream_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Ok(model) = std::env::var("FREEAI_DEFAULT_MODEL") {
            if !model.trim().is_empty() {
                config.default_model = model;
            }
        }
        if let Some(ms) = parse_env_u64("FREEAI_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env_u64("FREEAI_POLL_TIMEOUT_MS") {
            config.poll_timeout = Duration::from_millis(ms);
        }
        if let Ok(host) = std::env::var("FREEAI_HOST") {
            if !host.trim().is_empty() {
                config.host = host;
            }
        }
        if let Some(port) = parse_env_u64("FREEAI_PORT") {
            if port > 0 && port <= u16::MAX as u64 {
                config.port = port as u16;
            }
        }

        config
    }

    /// True when `model` is the default model or one of the accepted aliases.
    pub fn is_known_model(&self, model: &str) -> bool {
        model == self.default_model || self.compatible_models.iter().any(|m| m == model)
    }
}

fn parse_env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
