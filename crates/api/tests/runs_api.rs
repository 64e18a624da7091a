//! Integration tests for run history and run detail endpoints.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{auth_token, body_json, build_test_app, get, seed_org_user};
use serde_json::json;
use sqlx::PgPool;

use flowline_db::models::run::NewStepResult;
use flowline_db::repositories::{RunRepo, WorkflowRepo};

async fn seed_workflow(pool: &PgPool, org: i64) -> i64 {
    WorkflowRepo::create(pool, org, "History", None, "webhook", &json!({}), true, None)
        .await
        .unwrap()
        .id
}

/// Seed `count` finished runs with spread-out start times, alternating
/// succeeded/failed.
async fn seed_runs(pool: &PgPool, org: i64, workflow_id: i64, count: i64) -> Vec<i64> {
    let mut ids = Vec::new();
    for i in 0..count {
        let run = RunRepo::create(pool, workflow_id, org, "webhook", &json!({ "n": i }))
            .await
            .unwrap();
        let status = if i % 2 == 0 { "succeeded" } else { "failed" };
        RunRepo::finalize(pool, run.id, status, None).await.unwrap();

        // Spread start times one minute apart so ordering is deterministic.
        sqlx::query(
            "UPDATE workflow_runs SET started_at = now() - ($1 || ' minutes')::interval \
             WHERE id = $2",
        )
        .bind((count - i).to_string())
        .bind(run.id)
        .execute(pool)
        .await
        .unwrap();

        ids.push(run.id);
    }
    ids
}

#[sqlx::test(migrations = "../../migrations")]
async fn pagination_returns_disjoint_ordered_slices(pool: PgPool) {
    let (org, user) = seed_org_user(&pool).await;
    let token = auth_token(user, org, "member");
    let workflow_id = seed_workflow(&pool, org).await;
    seed_runs(&pool, org, workflow_id, 15).await;

    let first = body_json(
        get(
            build_test_app(pool.clone()),
            &format!("/api/v1/workflows/{workflow_id}/runs?limit=10&offset=0"),
            Some(&token),
        )
        .await,
    )
    .await;
    let second = body_json(
        get(
            build_test_app(pool.clone()),
            &format!("/api/v1/workflows/{workflow_id}/runs?limit=10&offset=10"),
            Some(&token),
        )
        .await,
    )
    .await;

    assert_eq!(first["total"], 15);
    assert_eq!(second["total"], 15);
    assert_eq!(first["limit"], 10);
    assert_eq!(first["offset"], 0);
    assert_eq!(second["offset"], 10);

    let first_ids: Vec<i64> = first["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    let second_ids: Vec<i64> = second["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();

    assert_eq!(first_ids.len(), 10);
    assert_eq!(second_ids.len(), 5);
    assert!(
        first_ids.iter().all(|id| !second_ids.contains(id)),
        "slices must be disjoint"
    );

    // started_at descending across the combined listing.
    let all: Vec<&serde_json::Value> = first["data"]
        .as_array()
        .unwrap()
        .iter()
        .chain(second["data"].as_array().unwrap().iter())
        .collect();
    for pair in all.windows(2) {
        let a = pair[0]["started_at"].as_str().unwrap();
        let b = pair[1]["started_at"].as_str().unwrap();
        assert!(a >= b, "runs must be ordered started_at descending");
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn limit_is_capped_and_defaulted(pool: PgPool) {
    let (org, user) = seed_org_user(&pool).await;
    let token = auth_token(user, org, "member");
    let workflow_id = seed_workflow(&pool, org).await;
    seed_runs(&pool, org, workflow_id, 3).await;

    let capped = body_json(
        get(
            build_test_app(pool.clone()),
            &format!("/api/v1/workflows/{workflow_id}/runs?limit=500"),
            Some(&token),
        )
        .await,
    )
    .await;
    assert_eq!(capped["limit"], 100);

    let defaulted = body_json(
        get(
            build_test_app(pool),
            &format!("/api/v1/workflows/{workflow_id}/runs"),
            Some(&token),
        )
        .await,
    )
    .await;
    assert_eq!(defaulted["limit"], 50);
    assert_eq!(defaulted["offset"], 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn status_filter_restricts_results(pool: PgPool) {
    let (org, user) = seed_org_user(&pool).await;
    let token = auth_token(user, org, "member");
    let workflow_id = seed_workflow(&pool, org).await;
    seed_runs(&pool, org, workflow_id, 6).await;

    let response = get(
        build_test_app(pool.clone()),
        &format!("/api/v1/workflows/{workflow_id}/runs?status=succeeded"),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 3);
    assert!(json["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["status"] == "succeeded"));

    // An unknown status value is a validation error, not an empty page.
    let response = get(
        build_test_app(pool),
        &format!("/api/v1/workflows/{workflow_id}/runs?status=exploded"),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations")]
async fn run_detail_includes_step_results(pool: PgPool) {
    let (org, user) = seed_org_user(&pool).await;
    let token = auth_token(user, org, "member");
    let workflow_id = seed_workflow(&pool, org).await;

    let run = RunRepo::create(&pool, workflow_id, org, "manual", &json!({}))
        .await
        .unwrap();
    let now = Utc::now();
    RunRepo::append_step_result(
        &pool,
        run.id,
        &NewStepResult {
            step_id: None,
            step_order: 1,
            action_type: "create_task".into(),
            status: "succeeded".into(),
            output: json!({ "task_id": 7 }),
            error: None,
            started_at: now,
            ended_at: now,
        },
    )
    .await
    .unwrap();
    RunRepo::finalize(&pool, run.id, "succeeded", None).await.unwrap();

    let response = get(
        build_test_app(pool),
        &format!("/api/v1/runs/{}", run.id),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], run.id);
    assert_eq!(json["data"]["status"], "succeeded");
    let results = json["data"]["step_results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["output"]["task_id"], 7);
}

#[sqlx::test(migrations = "../../migrations")]
async fn runs_are_tenant_scoped(pool: PgPool) {
    let (org_a, _user_a) = seed_org_user(&pool).await;
    let (org_b, user_b) = seed_org_user(&pool).await;
    let token_b = auth_token(user_b, org_b, "member");

    let workflow_id = seed_workflow(&pool, org_a).await;
    let run = RunRepo::create(&pool, workflow_id, org_a, "manual", &json!({}))
        .await
        .unwrap();

    // Another org can see neither the workflow's runs nor the run itself.
    let response = get(
        build_test_app(pool.clone()),
        &format!("/api/v1/workflows/{workflow_id}/runs"),
        Some(&token_b),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(
        build_test_app(pool),
        &format!("/api/v1/runs/{}", run.id),
        Some(&token_b),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
