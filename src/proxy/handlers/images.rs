// Image generation handler - POST /v1/images/generations and /generate
//
// Per-request flow: validate → resolve aspect ratio → create upstream task
// → poll to completion → translate. Any guard failure short-circuits with
// the normalized error envelope; the correlation id is threaded through
// every upstream call and log line.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use super::AppState;
use crate::proxy::aspect_ratio;
use crate::proxy::error::ApiError;
use crate::proxy::poller::poll_until_complete;
use crate::proxy::translator::{
    build_generation_response, poll_error_to_api, upstream_error_to_api,
};
use crate::proxy::types::GenerationResponse;

/// Response header carrying the per-request correlation id.
pub const TRACE_HEADER: &str = "x-gateway-trace-id";

pub async fn handle_images_generations(State(state): State<AppState>, body: Bytes) -> Response {
    let correlation_id = format!("img-{}", Uuid::new_v4());

    match generate(&state, &body, &correlation_id).await {
        Ok(result) => {
            let mut response = (StatusCode::OK, Json(result)).into_response();
            if let Ok(value) = HeaderValue::from_str(&correlation_id) {
                response.headers_mut().insert(TRACE_HEADER, value);
            }
            response
        }
        Err(error) => {
            tracing::error!(
                "[{}] Image generation failed: {}",
                correlation_id,
                error
            );
            error.into_response()
        }
    }
}

async fn generate(
    state: &AppState,
    body: &[u8],
    correlation_id: &str,
) -> Result<GenerationResponse, ApiError> {
    let body: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::invalid_request(format!("Malformed JSON body: {}", e)))?;

    let prompt = body
        .get("prompt")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::invalid_request("Missing required `prompt` parameter."))?;

    // `n` is accepted for OpenAI compatibility but not forwarded; the
    // upstream decides how many images one task yields.
    let n = body.get("n").and_then(|v| v.as_u64()).unwrap_or(1);

    let size = body
        .get("size")
        .and_then(|v| v.as_str())
        .unwrap_or("1024x1024");

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or(state.config.default_model.as_str());
    if !state.config.is_known_model(model) {
        tracing::warn!("[{}] Unknown model alias '{}', proceeding", correlation_id, model);
    }

    let aspect_ratio = aspect_ratio::resolve(size).ok_or_else(|| {
        ApiError::invalid_request(format!(
            "Unsupported 'size' parameter: {}. Use a WxH size near 1:1, 4:3, 3:4, 16:9 or 9:16.",
            size
        ))
    })?;

    tracing::info!(
        "[{}] Generation request: model={}, n={}, size={} → {}, prompt={:.50}",
        correlation_id,
        model,
        n,
        size,
        aspect_ratio,
        prompt
    );

    let task_id = state
        .upstream
        .create_task(prompt, aspect_ratio, correlation_id)
        .await
        .map_err(upstream_error_to_api)?;

    let task = poll_until_complete(
        || state.upstream.get_task_status(&task_id, correlation_id),
        state.config.poll_interval,
        state.config.poll_timeout,
        correlation_id,
    )
    .await
    .map_err(poll_error_to_api)?;

    Ok(build_generation_response(task))
}
