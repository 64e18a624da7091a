#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use flowline_api::auth::jwt::{generate_token, JwtConfig};
use flowline_api::config::ServerConfig;
use flowline_api::routes;
use flowline_api::state::AppState;
use flowline_engine::{EngineConfig, ExecutorRegistry, WorkflowRunner};
use flowline_events::EventBus;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            token_expiry_mins: 60,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());
    let registry = ExecutorRegistry::new(
        pool.clone(),
        Arc::clone(&event_bus),
        &EngineConfig::default(),
    )
    .expect("registry should be exhaustive");
    let runner = Arc::new(WorkflowRunner::new(pool.clone(), Arc::new(registry)));

    let state = AppState {
        pool,
        config: Arc::new(config),
        runner,
        event_bus,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        // oneshot requests carry no socket peer; inject one for the
        // webhook caller-IP check.
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 7777))))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

/// Insert an organization and a member user; returns `(org_id, user_id)`.
pub async fn seed_org_user(pool: &PgPool) -> (i64, i64) {
    let org_id: i64 =
        sqlx::query_scalar("INSERT INTO organizations (name) VALUES ('Acme') RETURNING id")
            .fetch_one(pool)
            .await
            .expect("org insert should succeed");

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (org_id, email, display_name, role) \
         VALUES ($1, $2, 'Test User', 'member') RETURNING id",
    )
    .bind(org_id)
    .bind(format!("user{org_id}@example.com"))
    .fetch_one(pool)
    .await
    .expect("user insert should succeed");

    (org_id, user_id)
}

/// Mint a session token for the test JWT secret.
pub fn auth_token(user_id: i64, org_id: i64, role: &str) -> String {
    generate_token(user_id, org_id, role, &test_config().jwt)
        .expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a request with an optional bearer token and JSON body.
pub async fn request(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = match body {
        Some(v) => Body::from(serde_json::to_vec(&v).expect("body serializes")),
        None => Body::empty(),
    };

    let request = builder.body(body).expect("request builds");
    app.oneshot(request).await.expect("request completes")
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    request(app, Method::GET, uri, token, None).await
}

pub async fn post(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    request(app, Method::POST, uri, token, Some(body)).await
}

pub async fn patch(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    request(app, Method::PATCH, uri, token, None).await
}

pub async fn delete(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    request(app, Method::DELETE, uri, token, None).await
}

/// Send a POST with explicit raw bytes and headers (webhook deliveries,
/// where the exact body bytes are signature-relevant).
pub async fn post_raw(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");

    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = builder
        .body(Body::from(body.to_vec()))
        .expect("request builds");
    app.oneshot(request).await.expect("request completes")
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}
