//! AI step executors (generate / categorize / summarize).
//!
//! All three action types share one chat-completions call against the
//! configured provider; they differ only in how the prompt is assembled
//! and how the answer is post-processed.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use flowline_core::workflow::{ActionType, EXTERNAL_CALL_TIMEOUT_SECS};

use super::{StepContext, StepExecutor};
use crate::config::AiConfig;
use crate::error::ExecError;

/// Executes one of the AI action types.
pub struct AiExecutor {
    action: ActionType,
    config: Option<AiConfig>,
    client: reqwest::Client,
}

impl AiExecutor {
    /// Create an executor for one of `ai_generate`, `ai_categorize`,
    /// `ai_summarize`.
    ///
    /// # Panics
    ///
    /// Panics if `action` is not an AI action type; registry construction
    /// only ever passes the three AI variants.
    pub fn new(action: ActionType, config: Option<AiConfig>) -> Self {
        assert!(
            matches!(
                action,
                ActionType::AiGenerate | ActionType::AiCategorize | ActionType::AiSummarize
            ),
            "AiExecutor built for non-AI action {action}"
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXTERNAL_CALL_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            action,
            config,
            client,
        }
    }

    /// Build the user prompt for this action from the step config.
    fn build_prompt(&self, ctx: &StepContext<'_>) -> Result<String, ExecError> {
        match self.action {
            ActionType::AiGenerate => Ok(ctx.str_field("prompt")?.to_string()),
            ActionType::AiCategorize => {
                let input = ctx.str_field("input")?;
                let categories: Vec<&str> = ctx
                    .config
                    .get("categories")
                    .and_then(|v| v.as_array())
                    .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                if categories.is_empty() {
                    return Err(ExecError::Config(
                        "'categories' must be a non-empty array of strings".into(),
                    ));
                }
                Ok(format!(
                    "Classify the following text into exactly one of these categories: {}.\n\
                     Reply with the category name only.\n\nText:\n{input}",
                    categories.join(", ")
                ))
            }
            ActionType::AiSummarize => {
                let input = ctx.str_field("input")?;
                Ok(format!(
                    "Summarize the following text in at most three sentences.\n\nText:\n{input}"
                ))
            }
            _ => unreachable!("constructor rejects non-AI actions"),
        }
    }

    /// Call the provider and return the first message's text content.
    async fn complete(&self, config: &AiConfig, prompt: &str) -> Result<String, ExecError> {
        let request = json!({
            "model": config.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExecError::External(format!("AI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExecError::External(format!(
                "AI provider returned HTTP {status}: {text}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExecError::External(format!("AI response unreadable: {e}")))?;

        body["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| ExecError::External("AI response missing message content".into()))
    }
}

#[async_trait]
impl StepExecutor for AiExecutor {
    fn action_type(&self) -> ActionType {
        self.action
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let config = self.config.as_ref().ok_or_else(|| {
            ExecError::Config("AI provider is not configured (AI_API_URL/AI_API_KEY unset)".into())
        })?;

        let prompt = self.build_prompt(ctx)?;
        let text = self.complete(config, &prompt).await?;

        let output = match self.action {
            ActionType::AiCategorize => json!({ "category": text }),
            ActionType::AiSummarize => json!({ "summary": text }),
            _ => json!({ "text": text }),
        };
        Ok(output)
    }
}
