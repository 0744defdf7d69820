// Gateway server - route assembly, middleware stack, and lifecycle

use std::sync::{Arc, Mutex};

use axum::{
    http::{StatusCode, Uri},
    routing::{get, post},
    Router,
};
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::config::GatewayConfig;
use crate::proxy::error::ApiError;
use crate::proxy::handlers::{self, AppState};
use crate::proxy::middleware::{auth_middleware, cors_layer};
use crate::proxy::upstream::UpstreamClient;

async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}

async fn method_not_allowed_handler() -> ApiError {
    ApiError::method_not_allowed()
}

/// 204 for browsers probing the API host.
async fn favicon_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Build the full gateway router: generation endpoints (with their alias),
/// health, favicon, envelope-shaped 404/405 fallbacks, auth on API paths,
/// CORS outermost so preflight never hits auth.
pub fn build_router(state: AppState) -> Router {
    let generation = post(handlers::images::handle_images_generations)
        .fallback(method_not_allowed_handler);

    Router::new()
        .route("/health", get(handlers::health::handle_health))
        .route("/v1/images/generations", generation.clone())
        .route("/generate", generation)
        .route("/favicon.ico", get(favicon_handler))
        .fallback(not_found_handler)
        .layer(axum::middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ))
        .layer(cors_layer())
        .with_state(state)
}

/// Running gateway instance.
pub struct GatewayServer {
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    pub local_addr: std::net::SocketAddr,
}

impl GatewayServer {
    /// Bind and start serving. Returns the server handle and the join
    /// handle of the serve task.
    pub async fn start(
        config: Arc<GatewayConfig>,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let upstream = Arc::new(UpstreamClient::new(&config.upstream_url));
        let state = AppState::new(config.clone(), upstream);
        let app = build_router(state);

        let addr = format!("{}:{}", config.host, config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
        let local_addr = listener.local_addr().map_err(|e| e.to_string())?;

        info!("Gateway listening at http://{}", local_addr);
        info!("Proxying upstream {}", config.upstream_url);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Server error: {}", e);
            }
            info!("Gateway shut down");
        });

        Ok((
            Self {
                shutdown_tx: Mutex::new(Some(shutdown_tx)),
                local_addr,
            },
            handle,
        ))
    }

    /// Signal graceful shutdown. Idempotent.
    pub fn stop(&self) {
        if let Ok(mut guard) = self.shutdown_tx.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(());
                info!("Gateway stop signal sent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::handlers::images::TRACE_HEADER;
    use axum::body::Body;
    use axum::extract::State;
    use axum::http::{header, Method, Request};
    use axum::response::IntoResponse;
    use axum::Json;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    // ---- Stub upstream ----

    enum StubMode {
        /// `pending_polls` pending reports, then completed with two images.
        Happy { pending_polls: usize },
        /// Task creation rejected with 403 SENSITIVE_CONTENT.
        Sensitive,
        /// Status never leaves pending.
        AlwaysPending,
    }

    struct StubState {
        mode: StubMode,
        create_calls: AtomicUsize,
        status_calls: AtomicUsize,
    }

    async fn stub_create(State(stub): State<Arc<StubState>>) -> axum::response::Response {
        stub.create_calls.fetch_add(1, Ordering::SeqCst);
        match stub.mode {
            StubMode::Sensitive => (
                StatusCode::FORBIDDEN,
                Json(json!({"code": "SENSITIVE_CONTENT", "error": "prompt blocked"})),
            )
                .into_response(),
            _ => Json(json!({"success": true, "task_id": "T1"})).into_response(),
        }
    }

    async fn stub_status(State(stub): State<Arc<StubState>>) -> Json<Value> {
        let call = stub.status_calls.fetch_add(1, Ordering::SeqCst);
        match stub.mode {
            StubMode::Happy { pending_polls } if call >= pending_polls => Json(json!({
                "status": "completed",
                "data": ["u1", "u2"],
                "params": {"prompt": "p"},
            })),
            _ => Json(json!({"status": "pending"})),
        }
    }

    /// Spawn a fake upstream on an ephemeral port; returns its base URL.
    async fn spawn_stub(mode: StubMode) -> (String, Arc<StubState>) {
        let stub = Arc::new(StubState {
            mode,
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/api/services/create-qwen-image", post(stub_create))
            .route("/api/services/aigc/task", get(stub_status))
            .with_state(stub.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), stub)
    }

    // ---- Gateway under test ----

    fn gateway(upstream_url: &str, poll_interval_ms: u64, poll_timeout_ms: u64) -> Router {
        let config = Arc::new(GatewayConfig {
            upstream_url: upstream_url.to_string(),
            poll_interval: Duration::from_millis(poll_interval_ms),
            poll_timeout: Duration::from_millis(poll_timeout_ms),
            ..GatewayConfig::default()
        });
        let upstream = Arc::new(UpstreamClient::new(upstream_url));
        build_router(AppState::new(config, upstream))
    }

    async fn send(
        router: &Router,
        method: Method,
        path: &str,
        api_key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(key) = api_key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    const KEY: &str = "freeai-to-api-key";

    // ---- Route / auth / validation tests ----

    #[tokio::test]
    async fn test_missing_api_key_is_401_without_upstream_call() {
        let (url, stub) = spawn_stub(StubMode::Happy { pending_polls: 0 }).await;
        let app = gateway(&url, 10, 1_000);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/v1/images/generations",
            None,
            Some(json!({"prompt": "a fox"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["type"], "invalid_api_key");
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_401() {
        let (url, _) = spawn_stub(StubMode::Happy { pending_polls: 0 }).await;
        let app = gateway(&url, 10, 1_000);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/generate",
            Some("nope"),
            Some(json!({"prompt": "a fox"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["type"], "invalid_api_key");
    }

    #[tokio::test]
    async fn test_empty_prompt_is_400_without_upstream_call() {
        let (url, stub) = spawn_stub(StubMode::Happy { pending_polls: 0 }).await;
        let app = gateway(&url, 10, 1_000);

        for prompt in [json!(""), json!("   "), Value::Null] {
            let (status, _, body) = send(
                &app,
                Method::POST,
                "/v1/images/generations",
                Some(KEY),
                Some(json!({"prompt": prompt})),
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["type"], "invalid_request_error");
        }
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unresolvable_size_is_400() {
        let (url, stub) = spawn_stub(StubMode::Happy { pending_polls: 0 }).await;
        let app = gateway(&url, 10, 1_000);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/v1/images/generations",
            Some(KEY),
            Some(json!({"prompt": "a fox", "size": "abc"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert!(body["error"]["message"].as_str().unwrap().contains("size"));
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_envelope() {
        let app = gateway("http://127.0.0.1:1", 10, 1_000);

        let (status, _, body) = send(&app, Method::GET, "/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_envelope() {
        let app = gateway("http://127.0.0.1:1", 10, 1_000);

        let (status, _, body) =
            send(&app, Method::GET, "/generate", Some(KEY), None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("POST"));
    }

    #[tokio::test]
    async fn test_favicon_is_204() {
        let app = gateway("http://127.0.0.1:1", 10, 1_000);
        let (status, _, body) = send(&app, Method::GET, "/favicon.ico", None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = gateway("http://127.0.0.1:1", 10, 1_000);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/v1/images/generations")
            .header(header::ORIGIN, "https://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_health_reports_unreachable_upstream() {
        let app = gateway("http://127.0.0.1:1", 10, 1_000);

        let (status, _, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "freeai-image-gateway");
        assert_eq!(body["upstream_status"], "unreachable");
    }

    // ---- End-to-end generation tests ----

    #[tokio::test]
    async fn test_happy_path_pending_then_completed() {
        let (url, stub) = spawn_stub(StubMode::Happy { pending_polls: 1 }).await;
        let app = gateway(&url, 10, 2_000);

        let (status, headers, body) = send(
            &app,
            Method::POST,
            "/v1/images/generations",
            Some(KEY),
            Some(json!({"prompt": "a fox", "n": 2, "size": "1024x1024"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers.contains_key(TRACE_HEADER));
        assert!(body["created"].as_i64().unwrap() > 0);
        assert_eq!(
            body["data"],
            json!([
                {"url": "u1", "revised_prompt": "p"},
                {"url": "u2", "revised_prompt": "p"},
            ])
        );
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(stub.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generate_alias_behaves_identically() {
        let (url, _) = spawn_stub(StubMode::Happy { pending_polls: 0 }).await;
        let app = gateway(&url, 10, 2_000);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/generate",
            Some(KEY),
            Some(json!({"prompt": "a fox"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["url"], "u1");
    }

    #[tokio::test]
    async fn test_sensitive_content_rejection_is_502_with_policy_message() {
        let (url, stub) = spawn_stub(StubMode::Sensitive).await;
        let app = gateway(&url, 10, 1_000);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/v1/images/generations",
            Some(KEY),
            Some(json!({"prompt": "something blocked"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "upstream_error");
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("content policy"), "got: {}", message);
        assert!(message.contains("prompt blocked"), "got: {}", message);
        // Creation failure is terminal, no polling happens
        assert_eq!(stub.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pending_forever_times_out_at_ceiling() {
        let (url, stub) = spawn_stub(StubMode::AlwaysPending).await;
        let app = gateway(&url, 50, 300);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/v1/images/generations",
            Some(KEY),
            Some(json!({"prompt": "a fox"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "upstream_error");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("timed out"));

        // No polling continues past the ceiling
        let polls_at_ceiling = stub.status_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(stub.status_calls.load(Ordering::SeqCst), polls_at_ceiling);
    }

    // ---- Lifecycle tests ----

    #[tokio::test]
    async fn test_build_router_builds_without_panic() {
        let config = Arc::new(GatewayConfig::default());
        let upstream = Arc::new(UpstreamClient::new(&config.upstream_url));
        let _router = build_router(AppState::new(config, upstream));
    }

    #[tokio::test]
    async fn test_server_start_and_stop() {
        let config = Arc::new(GatewayConfig {
            port: 0, // let the OS pick a free port
            ..GatewayConfig::default()
        });

        let (server, handle) = GatewayServer::start(config).await.unwrap();
        assert_ne!(server.local_addr.port(), 0);

        server.stop();
        // Idempotent
        server.stop();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("server did not shut down")
            .unwrap();
    }
}
