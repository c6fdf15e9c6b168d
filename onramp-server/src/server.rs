//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderName, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
    },
    response::{IntoResponse, Response},
    routing::get,
};
use onramp_core::config::CorsPolicy;
use onramp_sdk::objects::{ErrorResponse, HealthResponse, NotFoundResponse, ServiceInfo};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Endpoints listed in every 404 body.
pub const AVAILABLE_ENDPOINTS: [&str; 3] = ["GET /", "GET /health", "POST /api/create-session"];

/// Build the main application router.
pub fn build_router(state: AppState, cors: CorsPolicy, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .merge(api::router(state.clone()))
        // Registered after every route so known paths with the wrong method
        // also answer 404.
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// `GET /`: identify the service.
async fn service_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(ServiceInfo {
        success: true,
        message: "Bitcoin on-ramp session relay".to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: OffsetDateTime::now_utc(),
        environment: state.environment.to_string(),
    })
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            success: false,
            error: "Endpoint not found".to_string(),
            available_endpoints: AVAILABLE_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
        }),
    )
}

fn cors_layer(policy: CorsPolicy) -> CorsLayer {
    let policy = Arc::new(policy);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin.to_str().is_ok_and(|origin| policy.allows(origin))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

/// Last-resort boundary: the panic detail goes to the log, never to the caller.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error")),
    )
        .into_response()
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, Bytes};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use onramp_core::config::{ApiKey, ProviderConfig, RateLimitConfig};
    use onramp_core::processors::SessionCreator;
    use onramp_core::rate_limit::SlidingWindowLimiter;
    use onramp_core::transport::{
        Transport, TransportError, UpstreamInvoker, UpstreamRequest, UpstreamResponse,
    };
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tower::ServiceExt;
    use url::Url;

    enum Reply {
        Respond(u16, &'static str),
        Hang,
        Panic,
    }

    struct FakeTransport {
        reply: Reply,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn send(
            &self,
            _request: &UpstreamRequest,
        ) -> Result<UpstreamResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Respond(status, body) => Ok(UpstreamResponse {
                    status,
                    body: Bytes::from_static(body.as_bytes()),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(TransportError::Other("unreachable".into()))
                }
                Reply::Panic => panic!("transport exploded"),
            }
        }
    }

    struct Harness {
        router: Router,
        transport: Arc<FakeTransport>,
    }

    fn harness_with(reply: Reply, rate_limit: RateLimitConfig, timeout: Duration) -> Harness {
        let transport = Arc::new(FakeTransport {
            reply,
            calls: AtomicUsize::new(0),
        });
        let config = ProviderConfig::new(
            ApiKey::new("test-key"),
            "partner-1",
            "wallet-1",
            Url::parse("https://provider.test/create").unwrap(),
        );
        let creator = SessionCreator::new(
            Arc::new(config),
            UpstreamInvoker::new(transport.clone(), timeout),
        );
        let state = AppState::new(creator, SlidingWindowLimiter::new(rate_limit), true)
            .with_environment("staging");
        let cors = CorsPolicy {
            allowed_origins: vec!["https://checkout.example.com".to_string()],
            allowed_origin_suffixes: vec![".netlify.app".to_string()],
            allow_localhost: false,
        };
        let router = build_router(state, cors, 16 * 1024)
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 40000))));
        Harness { router, transport }
    }

    fn harness(reply: Reply) -> Harness {
        harness_with(reply, RateLimitConfig::default(), Duration::from_secs(30))
    }

    fn post_session(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/create-session")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_low_or_missing_amount_is_rejected_without_upstream_call() {
        let h = harness(Reply::Respond(200, r#"{"sessionId":"never"}"#));

        for body in [
            json!({ "currency_amount": 24.99 }),
            json!({ "currency_amount": 0 }),
            json!({ "currency_amount": -5 }),
            json!({ "currency_amount": "abc" }),
            json!({ "currency_amount": null }),
            json!({ "phone": "+15555550100" }),
        ] {
            let (status, json) = send(&h.router, post_session(body.to_string())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(json["success"], false);
            assert_eq!(json["error"], "Currency amount is required, minimum is $25");
        }

        let (status, _) = send(&h.router, post_session(Body::empty())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_high_amount_is_rejected_without_upstream_call() {
        let h = harness(Reply::Respond(200, r#"{"sessionId":"never"}"#));

        for amount in [json!(10_000.01), json!(50_000), json!("1e9")] {
            let body = json!({ "currency_amount": amount }).to_string();
            let (status, json) = send(&h.router, post_session(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Currency amount exceeds the maximum of $10,000");
        }

        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let h = harness(Reply::Respond(200, r#"{"sessionId":"never"}"#));

        let (status, json) = send(&h.router, post_session("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_session() {
        let h = harness(Reply::Respond(200, r#"{"sessionId":"abc123"}"#));

        let body = json!({ "currency_amount": 100, "phone": "+15555550100" }).to_string();
        let (status, json) = send(&h.router, post_session(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["sessionId"], "abc123");
        assert_eq!(json["partnerId"], "partner-1");
        assert_eq!(json["walletAddress"], "wallet-1");
        assert_eq!(json["amount"], 100.0);
        assert!(json["timestamp"].as_str().is_some());
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_without_session_id_is_500() {
        let h = harness(Reply::Respond(200, r#"{"status":"ok"}"#));

        let body = json!({ "currency_amount": 50 }).to_string();
        let (status, json) = send(&h.router, post_session(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("invalid response"));
    }

    #[tokio::test]
    async fn test_provider_rejection_is_mirrored() {
        let h = harness(Reply::Respond(401, r#"{"message":"invalid key"}"#));

        let body = json!({ "currency_amount": 50 }).to_string();
        let (status, json) = send(&h.router, post_session(body)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "invalid key");
        assert_eq!(json["providerStatus"], 401);
        assert_eq!(json["details"], json!({ "message": "invalid key" }));
    }

    #[tokio::test]
    async fn test_non_error_provider_status_becomes_bad_gateway() {
        let h = harness(Reply::Respond(302, ""));

        let body = json!({ "currency_amount": 50 }).to_string();
        let (status, json) = send(&h.router, post_session(body)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "upstream error (302)");
    }

    #[tokio::test]
    async fn test_timeout_answers_within_bound() {
        let h = harness_with(
            Reply::Hang,
            RateLimitConfig::default(),
            Duration::from_millis(100),
        );

        let started = Instant::now();
        let body = json!({ "currency_amount": 50 }).to_string();
        let (status, json) = send(&h.router, post_session(body)).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_panicking_provider_call_becomes_internal_fault() {
        let h = harness(Reply::Panic);

        let body = json!({ "currency_amount": 50 }).to_string();
        let (status, json) = send(&h.router, post_session(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Internal server error while creating session");
    }

    async fn exploding_handler() -> &'static str {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_handler_panic_is_caught() {
        let router = Router::new()
            .route("/boom", axum::routing::get(exploding_handler))
            .layer(CatchPanicLayer::custom(handle_panic));

        let (status, json) = send(&router, get("/boom")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "success": false, "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_unknown_routes_and_methods_are_404() {
        let h = harness(Reply::Respond(200, r#"{"sessionId":"x"}"#));

        let requests = [
            get("/nope"),
            get("/api/create-session"),
            Request::builder()
                .method(Method::DELETE)
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        ];

        for request in requests {
            let (status, json) = send(&h.router, request).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json["success"], false);
            assert_eq!(json["error"], "Endpoint not found");
            assert_eq!(
                json["availableEndpoints"],
                json!(["GET /", "GET /health", "POST /api/create-session"])
            );
        }
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let h = harness(Reply::Respond(200, r#"{"sessionId":"x"}"#));

        let (status, json) = send(&h.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert!(json["timestamp"].as_str().is_some());

        let (status, json) = send(&h.router, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "running");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["environment"], "staging");
    }

    #[tokio::test]
    async fn test_rate_limit_per_caller() {
        let h = harness_with(
            Reply::Respond(200, r#"{"sessionId":"abc"}"#),
            RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(60),
            },
            Duration::from_secs(30),
        );

        let from = |ip: &str| {
            let mut request = post_session(json!({ "currency_amount": 30 }).to_string());
            request
                .headers_mut()
                .insert("x-forwarded-for", HeaderValue::from_str(ip).unwrap());
            request
        };

        for _ in 0..2 {
            let (status, _) = send(&h.router, from("203.0.113.7")).await;
            assert_eq!(status, StatusCode::OK);
        }

        let response = h.router.clone().oneshot(from("203.0.113.7, 10.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], api::rate_limit::RATE_LIMITED_MESSAGE);

        let (status, _) = send(&h.router, from("198.51.100.2")).await;
        assert_eq!(status, StatusCode::OK);

        // Health checks are never throttled.
        let (status, _) = send(&h.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let h = harness(Reply::Respond(200, r#"{"sessionId":"x"}"#));

        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/create-session")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap()
        };

        for origin in ["https://checkout.example.com", "https://shop.netlify.app"] {
            let response = h.router.clone().oneshot(preflight(origin)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let headers = response.headers();
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], origin);
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        }

        let response = h
            .router
            .clone()
            .oneshot(preflight("https://evil.example.org"))
            .await
            .unwrap();
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_relay_client_end_to_end() {
        use onramp_sdk::client::{ClientError, RelayClient};
        use onramp_sdk::objects::CreateSessionRequest;
        use rust_decimal::Decimal;

        let Harness { router, transport } =
            harness(Reply::Respond(200, r#"{"sessionId":"e2e-session"}"#));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        let client = RelayClient::new(Url::parse(&format!("http://{addr}")).unwrap());

        let health = client.health().await.unwrap();
        assert_eq!(health.status, "healthy");

        let session = client
            .create_session(&CreateSessionRequest::new(Decimal::from(75)).with_phone("+15555550100"))
            .await
            .unwrap();
        assert_eq!(session.session_id, "e2e-session");
        assert_eq!(session.partner_id, "partner-1");
        assert_eq!(session.amount, Decimal::from(75));

        let err = client
            .create_session(&CreateSessionRequest::new(Decimal::from(5)))
            .await
            .unwrap_err();
        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status.as_u16(), 400);
                assert!(!body.success);
            }
            other => panic!("expected api error, got {other:?}"),
        }

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        server.abort();
    }
}
