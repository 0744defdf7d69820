// Client-facing error envelope
//
// Every failure leaving the gateway is normalized into
// `{"error": {"message": ..., "type": ..., "code": ...}}` with a matching
// HTTP status. Upstream details never leak beyond the human-readable
// message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error taxonomy exposed in the envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    InvalidApiKey,
    NotFound,
    Upstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request_error",
            ErrorKind::InvalidApiKey => "invalid_api_key",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Upstream => "upstream_error",
        }
    }
}

/// Normalized gateway error. Fully populated on construction.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: StatusCode,
    pub code: Option<&'static str>,
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidRequest,
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
            code: None,
        }
    }

    pub fn invalid_api_key() -> Self {
        Self {
            kind: ErrorKind::InvalidApiKey,
            message: "Invalid or missing API key.".to_string(),
            status: StatusCode::UNAUTHORIZED,
            code: None,
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: format!("Path not found: {}", path),
            status: StatusCode::NOT_FOUND,
            code: Some("not_found"),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            kind: ErrorKind::InvalidRequest,
            message: "This endpoint only supports POST.".to_string(),
            status: StatusCode::METHOD_NOT_ALLOWED,
            code: None,
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Upstream,
            message: message.into(),
            status: StatusCode::BAD_GATEWAY,
            code: None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "message": self.message,
            "type": self.kind.as_str(),
        });
        if let Some(code) = self.code {
            error["code"] = json!(code);
        }
        (self.status, Json(json!({ "error": error }))).into_response()
    }
}
