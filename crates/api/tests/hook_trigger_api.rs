//! Integration tests for the webhook trigger endpoints.
//!
//! Signature checks cover the exact raw body bytes, so these tests post
//! raw payloads rather than re-serialized JSON.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_raw};
use serde_json::json;
use sqlx::PgPool;

use flowline_core::signature::compute_signature;
use flowline_db::models::run::RunFilter;
use flowline_db::models::workflow::Workflow;
use flowline_db::repositories::{RunRepo, WorkflowRepo};

const SECRET: &str = "whsec_integration";

async fn seed_org(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO organizations (name) VALUES ('Acme') RETURNING id")
        .fetch_one(pool)
        .await
        .expect("org insert should succeed")
}

async fn seed_webhook_workflow(
    pool: &PgPool,
    org_id: i64,
    trigger_config: serde_json::Value,
    is_active: bool,
) -> Workflow {
    WorkflowRepo::create(
        pool,
        org_id,
        "Inbound hook",
        None,
        "webhook",
        &trigger_config,
        is_active,
        None,
    )
    .await
    .expect("workflow insert should succeed")
}

async fn run_count(pool: &PgPool, org_id: i64, workflow_id: i64) -> i64 {
    let (_, total) =
        RunRepo::list_for_workflow(pool, org_id, workflow_id, &RunFilter::default())
            .await
            .unwrap();
    total
}

// ---------------------------------------------------------------------------
// No secret configured
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn no_secret_accepts_unsigned_post(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_webhook_workflow(&pool, org, json!({}), true).await;

    let response = post_raw(
        build_test_app(pool.clone()),
        &format!("/api/v1/hooks/{}", workflow.id),
        &[],
        br#"{"any": "json"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["workflow_id"], workflow.id);
    assert_eq!(json["workflow_name"], "Inbound hook");
    assert!(json["triggered_at"].is_string());

    // The run record is created before the acknowledgement returns.
    assert_eq!(run_count(&pool, org, workflow.id).await, 1);
}

// ---------------------------------------------------------------------------
// Signature verification
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn correct_signature_over_raw_body_is_accepted(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow =
        seed_webhook_workflow(&pool, org, json!({ "secret": SECRET }), true).await;

    let body = br#"{"lead": "lee", "value": 12}"#;
    let signature = compute_signature(SECRET, body);

    let response = post_raw(
        build_test_app(pool.clone()),
        &format!("/api/v1/hooks/{}", workflow.id),
        &[("x-webhook-signature", signature.as_str())],
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[sqlx::test(migrations = "../../migrations")]
async fn alternate_signature_header_is_accepted(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow =
        seed_webhook_workflow(&pool, org, json!({ "secret": SECRET }), true).await;

    let body = b"payload";
    let signature = compute_signature(SECRET, body);

    let response = post_raw(
        build_test_app(pool.clone()),
        &format!("/api/v1/hooks/{}", workflow.id),
        &[("x-signature", signature.as_str())],
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_or_invalid_signature_is_unauthorized(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow =
        seed_webhook_workflow(&pool, org, json!({ "secret": SECRET }), true).await;
    let uri = format!("/api/v1/hooks/{}", workflow.id);
    let body = br#"{"lead": "lee"}"#;

    // Missing signature.
    let response = post_raw(build_test_app(pool.clone()), &uri, &[], body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage signature.
    let response = post_raw(
        build_test_app(pool.clone()),
        &uri,
        &[("x-webhook-signature", "deadbeef")],
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Signature computed over different bytes.
    let other = compute_signature(SECRET, b"other body");
    let response = post_raw(
        build_test_app(pool.clone()),
        &uri,
        &[("x-webhook-signature", other.as_str())],
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Signature with the wrong secret.
    let wrong = compute_signature("not-the-secret", body);
    let response = post_raw(
        build_test_app(pool.clone()),
        &uri,
        &[("x-webhook-signature", wrong.as_str())],
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // No runs were accepted.
    assert_eq!(run_count(&pool, org, workflow.id).await, 0);
}

// ---------------------------------------------------------------------------
// IP allow-list
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn ip_allow_list_rejects_independently_of_signature(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_webhook_workflow(
        &pool,
        org,
        json!({ "secret": SECRET, "allowed_ips": ["10.1.1.1"] }),
        true,
    )
    .await;
    let uri = format!("/api/v1/hooks/{}", workflow.id);
    let body = b"payload";
    let signature = compute_signature(SECRET, body);

    // Correctly signed request from a disallowed IP is still rejected.
    let response = post_raw(
        build_test_app(pool.clone()),
        &uri,
        &[
            ("x-webhook-signature", signature.as_str()),
            ("x-forwarded-for", "8.8.8.8"),
        ],
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Allow-listed caller with the same signature passes.
    let response = post_raw(
        build_test_app(pool),
        &uri,
        &[
            ("x-webhook-signature", signature.as_str()),
            ("x-forwarded-for", "10.1.1.1, 172.16.0.1"),
        ],
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

// ---------------------------------------------------------------------------
// Addressing errors
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_and_non_webhook_workflows_are_not_found(pool: PgPool) {
    let org = seed_org(&pool).await;

    // Unknown id.
    let response = post_raw(build_test_app(pool.clone()), "/api/v1/hooks/999999", &[], b"{}").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Malformed id.
    let response =
        post_raw(build_test_app(pool.clone()), "/api/v1/hooks/not-an-id", &[], b"{}").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A workflow of a different trigger type is not addressable as a hook.
    let event_workflow = WorkflowRepo::create(
        &pool,
        org,
        "Event workflow",
        None,
        "event",
        &json!({ "event": "task.created" }),
        true,
        None,
    )
    .await
    .unwrap();

    let response = post_raw(
        build_test_app(pool),
        &format!("/api/v1/hooks/{}", event_workflow.id),
        &[],
        b"{}",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn inactive_workflow_is_bad_request(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_webhook_workflow(&pool, org, json!({}), false).await;

    let response = post_raw(
        build_test_app(pool.clone()),
        &format!("/api/v1/hooks/{}", workflow.id),
        &[],
        b"{}",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(run_count(&pool, org, workflow.id).await, 0);
}

// ---------------------------------------------------------------------------
// Metadata endpoint
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn get_returns_metadata_without_side_effects(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow =
        seed_webhook_workflow(&pool, org, json!({ "secret": SECRET }), true).await;

    let response = get(
        build_test_app(pool.clone()),
        &format!("/api/v1/hooks/{}", workflow.id),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["workflow_id"], workflow.id);
    assert_eq!(json["method"], "POST");
    assert_eq!(json["signature_required"], true);

    // Purely descriptive: no run was started.
    assert_eq!(run_count(&pool, org, workflow.id).await, 0);
}
