//! Webhook trigger endpoints.
//!
//! These routes carry no session auth; deliveries are authorized by the
//! workflow's configured HMAC secret and caller-IP allow-list instead.
//! Runs execute detached from the request: the 202 acknowledgement only
//! means the run was accepted, not that it finished.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use flowline_core::error::CoreError;
use flowline_core::types::DbId;
use flowline_core::workflow::{TriggerKind, TriggerType};
use flowline_db::models::workflow::Workflow;
use flowline_db::repositories::WorkflowRepo;
use flowline_engine::trigger::{authorize_webhook, client_ip, webhook_payload};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Headers accepted as the delivery signature, in precedence order.
const SIGNATURE_HEADERS: &[&str] = &["x-webhook-signature", "x-signature"];

/// Fetch a workflow by id and require it to be webhook-triggered.
///
/// Non-webhook workflows are indistinguishable from absent ones (404), so
/// the endpoint does not leak which ids exist.
async fn find_webhook_workflow(
    pool: &sqlx::PgPool,
    workflow_id: DbId,
) -> AppResult<Workflow> {
    let workflow = WorkflowRepo::find_for_trigger(pool, workflow_id)
        .await?
        .filter(|w| w.trigger_type == TriggerType::Webhook.as_str())
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id: workflow_id,
        }))?;
    Ok(workflow)
}

/// The first present signature header value.
fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

/// POST /api/v1/hooks/{workflow_id}
///
/// Receive a webhook delivery and start a run.
///
/// - `401` on a missing/invalid signature (when a secret is configured) or
///   a disallowed caller IP.
/// - `404` on an unknown or non-webhook workflow.
/// - `400` on an inactive workflow.
/// - `202` once the run is accepted; execution continues after the
///   response is sent.
pub async fn trigger_webhook(
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let workflow = find_webhook_workflow(&state.pool, workflow_id).await?;

    let socket_ip = peer.ip().to_string();
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let caller_ip = client_ip(forwarded_for, &socket_ip);

    authorize_webhook(&workflow, &body, signature_header(&headers), &caller_ip)?;

    if !workflow.is_active {
        return Err(AppError::BadRequest(
            "Workflow is inactive and cannot be triggered".into(),
        ));
    }

    let header_pairs: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let payload = webhook_payload(&body, &header_pairs);

    let run = state
        .runner
        .start_run(&workflow, TriggerKind::Webhook, payload)
        .await?;

    tracing::info!(
        workflow_id,
        run_id = run.id,
        caller_ip = %caller_ip,
        "Webhook trigger accepted",
    );

    state.runner.spawn(run);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "message": "Workflow run accepted",
            "workflow_id": workflow.id,
            "workflow_name": workflow.name,
            "triggered_at": Utc::now().to_rfc3339(),
        })),
    ))
}

/// GET /api/v1/hooks/{workflow_id}
///
/// Static descriptive metadata about the webhook endpoint. No side effects.
pub async fn webhook_info(
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let workflow = find_webhook_workflow(&state.pool, workflow_id).await?;

    Ok(Json(json!({
        "workflow_id": workflow.id,
        "workflow_name": workflow.name,
        "is_active": workflow.is_active,
        "method": "POST",
        "content_type": "application/json",
        "signature_headers": SIGNATURE_HEADERS,
        "signature_scheme": "hex-encoded HMAC-SHA256 of the raw request body",
        "signature_required": workflow.webhook_secret().is_some(),
    })))
}
