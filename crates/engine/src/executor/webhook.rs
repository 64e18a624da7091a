//! Outbound webhook step executor.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use flowline_core::signature::compute_signature;
use flowline_core::workflow::{ActionType, EXTERNAL_CALL_TIMEOUT_SECS};

use super::{StepContext, StepExecutor};
use crate::error::ExecError;

/// Signature header attached to signed outbound payloads.
const SIGNATURE_HEADER: &str = "x-flowline-signature";

/// POSTs a JSON payload to an external URL, optionally signing the body.
pub struct WebhookCallExecutor {
    client: reqwest::Client,
}

impl WebhookCallExecutor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXTERNAL_CALL_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client }
    }
}

impl Default for WebhookCallExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepExecutor for WebhookCallExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::WebhookCall
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let url = ctx.str_field("url")?;
        let payload = ctx.config.get("payload").cloned().unwrap_or(json!({}));

        let body = serde_json::to_vec(&payload)
            .map_err(|e| ExecError::Config(format!("unserializable payload: {e}")))?;

        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.clone());

        // Sign the exact bytes we send so the receiver can verify them.
        if let Some(secret) = ctx.opt_str_field("secret") {
            request = request.header(SIGNATURE_HEADER, compute_signature(secret, &body));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExecError::External(format!("webhook request failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ExecError::External(format!(
                "webhook returned HTTP {status}: {text}"
            )));
        }

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(json!({ "status": status.as_u16(), "body": body }))
    }
}
