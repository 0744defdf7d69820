// Upstream client
//
// reqwest wrapper around the freeaiimage.net task API. Every outbound call
// carries the fixed identity header set the upstream gates on, plus the
// per-request correlation id as X-Request-ID.

use reqwest::{header, Client};
use serde_json::json;
use tokio::time::Duration;

use crate::proxy::aspect_ratio::AspectRatio;
use crate::proxy::translator::classify_upstream_failure;
use crate::proxy::types::{CreateTaskResponse, TaskStatus, TaskStatusResponse};

/// Browser-like User-Agent the upstream expects.
const UPSTREAM_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Locale cookie the upstream expects on API calls.
const UPSTREAM_LOCALE_COOKIE: &str = "lng=InpoIg%3D%3D";

/// Timeout for the /health liveness probe.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Failures from a single upstream call.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream rate limited the request: {0}")]
    RateLimited(String),
    #[error("Prompt rejected by upstream content policy: {0}")]
    ContentPolicy(String),
    #[error("Upstream internal error, likely quota exhaustion or a temporary outage (status {status})")]
    QuotaExhausted { status: u16 },
    #[error("Upstream request failed (status {status}): {body}")]
    Http { status: u16, body: String },
    #[error("Upstream network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected upstream payload: {0}")]
    Payload(String),
}

pub struct UpstreamClient {
    http: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create upstream HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fixed identity headers required by the upstream, with the correlation
    /// id attached for traceability.
    fn identity_headers(&self, correlation_id: &str) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Ok(origin) = header::HeaderValue::from_str(&self.base_url) {
            headers.insert(header::ORIGIN, origin);
        }
        if let Ok(referer) = header::HeaderValue::from_str(&format!("{}/zh/", self.base_url)) {
            headers.insert(header::REFERER, referer);
        }
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(UPSTREAM_USER_AGENT),
        );
        headers.insert(
            header::COOKIE,
            header::HeaderValue::from_static(UPSTREAM_LOCALE_COOKIE),
        );
        if let Ok(id) = header::HeaderValue::from_str(correlation_id) {
            headers.insert("x-request-id", id);
        }
        headers
    }

    fn create_task_url(&self) -> String {
        format!("{}/api/services/create-qwen-image", self.base_url)
    }

    fn task_status_url(&self, task_id: &str) -> String {
        format!(
            "{}/api/services/aigc/task?taskId={}&taskType=qwen_image",
            self.base_url, task_id
        )
    }

    /// Submit a generation task. Returns the upstream task id.
    pub async fn create_task(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        correlation_id: &str,
    ) -> Result<String, UpstreamError> {
        let response = self
            .http
            .post(self.create_task_url())
            .headers(self.identity_headers(correlation_id))
            .json(&json!({
                "prompt": prompt,
                "aspectRatio": aspect_ratio.as_str(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_upstream_failure(status.as_u16(), &body));
        }

        let body: CreateTaskResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Payload(format!("task creation response: {}", e)))?;

        match body {
            CreateTaskResponse {
                success: true,
                task_id: Some(task_id),
            } if !task_id.is_empty() => {
                tracing::info!(
                    "[{}] Upstream task created: task_id={}",
                    correlation_id,
                    task_id
                );
                Ok(task_id)
            }
            other => Err(UpstreamError::Payload(format!(
                "upstream did not create a task (success={}, task_id={:?})",
                other.success, other.task_id
            ))),
        }
    }

    /// Fetch the current status of a task.
    pub async fn get_task_status(
        &self,
        task_id: &str,
        correlation_id: &str,
    ) -> Result<TaskStatus, UpstreamError> {
        let response = self
            .http
            .get(self.task_status_url(task_id))
            .headers(self.identity_headers(correlation_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_upstream_failure(status.as_u16(), &body));
        }

        let body: TaskStatusResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Payload(format!("task status response: {}", e)))?;

        Ok(body.into_status())
    }

    /// Short-timeout liveness probe against the upstream root, for /health.
    pub async fn probe_health(&self) -> String {
        let result = self
            .http
            .head(&self.base_url)
            .timeout(HEALTH_PROBE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => "online".to_string(),
            Ok(response) => format!("offline ({})", response.status().as_u16()),
            Err(_) => "unreachable".to_string(),
        }
    }
}
