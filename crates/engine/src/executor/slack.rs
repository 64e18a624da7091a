//! Slack step executors (`chat.postMessage`, `conversations.create`).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use flowline_core::workflow::{ActionType, EXTERNAL_CALL_TIMEOUT_SECS};

use super::{StepContext, StepExecutor};
use crate::config::SlackConfig;
use crate::error::ExecError;

/// Shared Slack Web API client.
struct SlackClient {
    config: Option<SlackConfig>,
    client: reqwest::Client,
}

impl SlackClient {
    fn new(config: Option<SlackConfig>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXTERNAL_CALL_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { config, client }
    }

    /// Call one Slack Web API method and unwrap the `ok`/`error` envelope.
    async fn call(&self, method: &str, payload: Value) -> Result<Value, ExecError> {
        let config = self.config.as_ref().ok_or_else(|| {
            ExecError::Config("Slack is not configured (SLACK_BOT_TOKEN unset)".into())
        })?;

        let response = self
            .client
            .post(format!("{}/{method}", config.api_base))
            .bearer_auth(&config.bot_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExecError::External(format!("Slack request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecError::External(format!(
                "Slack returned HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExecError::External(format!("Slack response unreadable: {e}")))?;

        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let error = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown_error");
            return Err(ExecError::External(format!("Slack error: {error}")));
        }

        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// send_slack
// ---------------------------------------------------------------------------

/// Posts a message to a Slack channel.
pub struct SendSlackExecutor {
    slack: SlackClient,
}

impl SendSlackExecutor {
    pub fn new(config: Option<SlackConfig>) -> Self {
        Self {
            slack: SlackClient::new(config),
        }
    }
}

#[async_trait]
impl StepExecutor for SendSlackExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::SendSlack
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let channel = ctx.str_field("channel")?;
        let text = ctx.str_field("text")?;

        let body = self
            .slack
            .call(
                "chat.postMessage",
                json!({ "channel": channel, "text": text }),
            )
            .await?;

        Ok(json!({
            "channel": body.get("channel").cloned().unwrap_or(json!(channel)),
            "ts": body.get("ts").cloned().unwrap_or(Value::Null),
        }))
    }
}

// ---------------------------------------------------------------------------
// create_slack_channel
// ---------------------------------------------------------------------------

/// Creates a Slack channel.
pub struct CreateSlackChannelExecutor {
    slack: SlackClient,
}

impl CreateSlackChannelExecutor {
    pub fn new(config: Option<SlackConfig>) -> Self {
        Self {
            slack: SlackClient::new(config),
        }
    }
}

#[async_trait]
impl StepExecutor for CreateSlackChannelExecutor {
    fn action_type(&self) -> ActionType {
        ActionType::CreateSlackChannel
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let name = ctx.str_field("name")?;
        let is_private = ctx
            .config
            .get("is_private")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let body = self
            .slack
            .call(
                "conversations.create",
                json!({ "name": name, "is_private": is_private }),
            )
            .await?;

        Ok(json!({
            "channel_id": body["channel"].get("id").cloned().unwrap_or(Value::Null),
            "channel_name": body["channel"].get("name").cloned().unwrap_or(json!(name)),
        }))
    }
}
