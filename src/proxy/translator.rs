// Response translation
//
// Two jobs: classify non-success upstream responses (including the
// undocumented error shapes the upstream emits) into `UpstreamError`
// variants, and map terminal outcomes into the client-facing contract.
// New upstream error shapes get a new match arm here, nothing else moves.

use serde_json::Value;

use crate::proxy::error::ApiError;
use crate::proxy::poller::PollError;
use crate::proxy::types::{CompletedTask, GenerationResponse, ImageData};
use crate::proxy::upstream::UpstreamError;

/// Upstream marker embedded in 403 bodies for content-policy rejections.
const SENSITIVE_CONTENT_CODE: &str = "SENSITIVE_CONTENT";

/// Textual marker the upstream buries in 500 bodies when the real cause is
/// a payment/quota failure.
const QUOTA_FAILURE_MARKER: &str = "402";

/// Classify a non-success upstream HTTP response.
///
/// Body parsing failures never abort classification; anything that does not
/// match a known shape falls back to the generic case with the raw status
/// and body preserved.
pub fn classify_upstream_failure(status: u16, body: &str) -> UpstreamError {
    match status {
        429 => UpstreamError::RateLimited(body.trim().to_string()),
        403 => {
            if let Ok(json) = serde_json::from_str::<Value>(body) {
                if json.get("code").and_then(|c| c.as_str()) == Some(SENSITIVE_CONTENT_CODE) {
                    let detail = json
                        .get("error")
                        .and_then(|e| e.as_str())
                        .unwrap_or(body)
                        .to_string();
                    return UpstreamError::ContentPolicy(detail);
                }
            }
            UpstreamError::Http {
                status,
                body: body.to_string(),
            }
        }
        500 if body.contains(QUOTA_FAILURE_MARKER) => UpstreamError::QuotaExhausted { status },
        _ => UpstreamError::Http {
            status,
            body: body.to_string(),
        },
    }
}

/// Build the OpenAI-compatible success response, pairing every image URL
/// with the single echoed-back prompt.
pub fn build_generation_response(task: CompletedTask) -> GenerationResponse {
    let revised_prompt = task.prompt;
    GenerationResponse {
        created: chrono::Utc::now().timestamp(),
        data: task
            .images
            .into_iter()
            .map(|url| ImageData {
                url,
                revised_prompt: revised_prompt.clone(),
            })
            .collect(),
    }
}

/// Map a task-creation failure to the client error envelope.
pub fn upstream_error_to_api(error: UpstreamError) -> ApiError {
    ApiError::upstream(error.to_string())
}

/// Map a polling failure to the client error envelope.
pub fn poll_error_to_api(error: PollError) -> ApiError {
    ApiError::upstream(error.to_string())
}
