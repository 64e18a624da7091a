//! Trigger resolvers: normalize external stimuli into canonical trigger
//! payloads and authorize webhook deliveries.
//!
//! The webhook checks run in a fixed order: caller-IP allow-list first,
//! then signature. Both failures are Unauthorized; missing, malformed,
//! wrong-length, and wrong-value signatures are deliberately
//! indistinguishable.

use chrono::Utc;
use serde_json::{json, Map, Value};

use flowline_core::condition::Condition;
use flowline_core::signature::verify_signature;
use flowline_core::types::DbId;
use flowline_db::models::workflow::Workflow;
use flowline_events::DomainEvent;

/// Request headers never copied into trigger payloads.
const EXCLUDED_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Webhook authorization failure.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// Signature or caller-IP rejection; maps to HTTP 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

// ---------------------------------------------------------------------------
// Webhook authorization
// ---------------------------------------------------------------------------

/// Resolve the caller IP: first hop of `x-forwarded-for` when present,
/// otherwise the socket peer address.
pub fn client_ip(forwarded_for: Option<&str>, socket_ip: &str) -> String {
    forwarded_for
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| socket_ip.to_string())
}

/// Authorize an inbound webhook delivery for a workflow.
///
/// 1. When an allow-list is configured, the caller IP must appear in it.
/// 2. When a secret is configured, `signature` must be a valid hex
///    HMAC-SHA256 over the exact raw body. No secret means the webhook is
///    unauthenticated and any (or no) signature is accepted.
pub fn authorize_webhook(
    workflow: &Workflow,
    body: &[u8],
    signature: Option<&str>,
    caller_ip: &str,
) -> Result<(), TriggerError> {
    if let Some(allowed) = workflow.allowed_ips() {
        if !allowed.iter().any(|ip| *ip == caller_ip) {
            return Err(TriggerError::Unauthorized(
                "Caller IP is not allow-listed".into(),
            ));
        }
    }

    if let Some(secret) = workflow.webhook_secret() {
        let valid = signature.is_some_and(|sig| verify_signature(secret, body, sig));
        if !valid {
            return Err(TriggerError::Unauthorized(
                "Missing or invalid webhook signature".into(),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

/// Build the canonical payload for a webhook-triggered run.
///
/// The body is parsed as JSON when possible and carried as raw text
/// otherwise. Authorization and cookie headers are never included.
pub fn webhook_payload(body: &[u8], headers: &[(String, String)]) -> Value {
    let body_text = String::from_utf8_lossy(body);
    let parsed: Value = serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(body_text.into_owned()));

    let mut header_map = Map::new();
    for (name, value) in headers {
        let lowered = name.to_ascii_lowercase();
        if !EXCLUDED_HEADERS.contains(&lowered.as_str()) {
            header_map.insert(lowered, Value::String(value.clone()));
        }
    }

    json!({
        "is_webhook": true,
        "body": parsed,
        "headers": header_map,
        "received_at": Utc::now().to_rfc3339(),
    })
}

/// Build the canonical payload for an event-triggered run.
pub fn event_payload(event: &DomainEvent) -> Value {
    json!({
        "is_event": true,
        "event": event.name,
        "data": event.payload,
        "occurred_at": event.occurred_at.to_rfc3339(),
    })
}

/// Build the canonical payload for a schedule-triggered run.
pub fn schedule_payload(cron: &str) -> Value {
    json!({
        "is_schedule": true,
        "cron": cron,
        "scheduled_for": Utc::now().to_rfc3339(),
    })
}

/// Build the canonical payload for a manual test run.
pub fn manual_payload(data: Value, requested_by: DbId) -> Value {
    json!({
        "is_manual": true,
        "data": data,
        "requested_by": requested_by,
    })
}

// ---------------------------------------------------------------------------
// Event matching
// ---------------------------------------------------------------------------

/// Whether an event workflow should start a run for a domain event.
///
/// The workflow must belong to the event's organization, name the event in
/// its trigger config, and (when a filter is configured) the filter must
/// evaluate true against the event payload. An unparseable filter fails
/// closed.
pub fn event_matches(workflow: &Workflow, event: &DomainEvent) -> bool {
    if workflow.org_id != event.org_id {
        return false;
    }

    let configured = workflow
        .trigger_config
        .get("event")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if configured != event.name {
        return false;
    }

    match workflow.trigger_config.get("filter") {
        None => true,
        Some(filter) => match Condition::from_value(filter) {
            Ok(condition) => {
                let context = event.payload.as_object().cloned().unwrap_or_default();
                condition.evaluate(&context)
            }
            Err(e) => {
                tracing::warn!(
                    workflow_id = workflow.id,
                    error = %e,
                    "Unparseable event filter; treating as non-matching",
                );
                false
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
