// Shared request/response and upstream wire types

use serde::{Deserialize, Serialize};

// ============================================================================
// Client-facing OpenAI-compatible response
// ============================================================================

/// One generated image entry in the OpenAI response shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageData {
    pub url: String,
    pub revised_prompt: String,
}

/// OpenAI-compatible image generation response.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResponse {
    /// Unix timestamp of when the response was built.
    pub created: i64,
    pub data: Vec<ImageData>,
}

// ============================================================================
// Upstream task state
// ============================================================================

/// Payload of a task that reached the `completed` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTask {
    /// Prompt echoed back by the upstream, paired with every image.
    pub prompt: String,
    /// Generated image URLs in upstream order.
    pub images: Vec<String>,
}

/// Terminal and non-terminal task states reported by the upstream.
/// `Pending` is the only non-terminal state; transitions are forward-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Completed(CompletedTask),
    Failed,
}

// ============================================================================
// Upstream wire formats
// ============================================================================

/// Body returned by `POST /api/services/create-qwen-image`.
#[derive(Debug, Deserialize)]
pub struct CreateTaskResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TaskParams {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Body returned by `GET /api/services/aigc/task`.
#[derive(Debug, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<String>>,
    #[serde(default)]
    pub params: Option<TaskParams>,
}

impl TaskStatusResponse {
    /// Interpret the upstream status payload.
    ///
    /// `completed` counts only when image data is present; a `completed`
    /// report without data is still pending. A missing echoed prompt
    /// degrades to an empty string instead of failing the request.
    pub fn into_status(self) -> TaskStatus {
        match self.status.as_deref() {
            Some("completed") => match self.data {
                Some(images) if !images.is_empty() => TaskStatus::Completed(CompletedTask {
                    prompt: self
                        .params
                        .and_then(|p| p.prompt)
                        .unwrap_or_default(),
                    images,
                }),
                _ => TaskStatus::Pending,
            },
            Some("failed") => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }
}
