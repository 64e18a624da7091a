//! Workflow domain enums, constants, and configuration validation.
//!
//! Provides the trigger/action/status vocabulary shared by the repository
//! layer, the execution engine, and the API. Enum wire formats are
//! `snake_case` strings matching the database TEXT columns.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a workflow name.
pub const MAX_WORKFLOW_NAME_LENGTH: usize = 200;

/// Maximum length of a workflow description.
pub const MAX_WORKFLOW_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum number of steps a single workflow may define.
pub const MAX_STEPS_PER_WORKFLOW: usize = 50;

/// Default timeout for a single step execution in seconds.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 30;

/// Timeout for outbound HTTP calls made by external-call executors.
pub const EXTERNAL_CALL_TIMEOUT_SECS: u64 = 10;

/// Maximum stored length of a step error message.
pub const MAX_STEP_ERROR_LENGTH: usize = 4000;

// ---------------------------------------------------------------------------
// TriggerType
// ---------------------------------------------------------------------------

/// How a workflow is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Event,
    Schedule,
    Webhook,
}

impl TriggerType {
    /// Return the wire-format string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Schedule => "schedule",
            Self::Webhook => "webhook",
        }
    }

    /// Parse from a wire-format string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "event" => Ok(Self::Event),
            "schedule" => Ok(Self::Schedule),
            "webhook" => Ok(Self::Webhook),
            _ => Err(CoreError::Validation(format!(
                "Invalid trigger_type: '{s}'. Must be one of: event, schedule, webhook"
            ))),
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TriggerKind
// ---------------------------------------------------------------------------

/// What actually fired a given run. Unlike [`TriggerType`] this includes the
/// manual test-run path, which is permitted regardless of `is_active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Event,
    Schedule,
    Webhook,
    Manual,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Schedule => "schedule",
            Self::Webhook => "webhook",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "event" => Ok(Self::Event),
            "schedule" => Ok(Self::Schedule),
            "webhook" => Ok(Self::Webhook),
            "manual" => Ok(Self::Manual),
            _ => Err(CoreError::Validation(format!(
                "Invalid trigger_kind: '{s}'. Must be one of: event, schedule, webhook, manual"
            ))),
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// The action a workflow step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    SendEmail,
    SendNotification,
    SendPush,
    CreateTask,
    UpdateTask,
    BulkUpdateTasks,
    CreateContact,
    UpdateContact,
    AddTag,
    RemoveTag,
    UpdateOpportunity,
    CreateProjectFromOpportunity,
    CreateProject,
    CreateProjectFromTemplate,
    AiGenerate,
    AiCategorize,
    AiSummarize,
    WebhookCall,
    CreateActivity,
    SendSlack,
    CreateSlackChannel,
}

/// Every action type, in a stable order. Used to validate executor
/// registries exhaustively at startup.
pub const ALL_ACTION_TYPES: &[ActionType] = &[
    ActionType::SendEmail,
    ActionType::SendNotification,
    ActionType::SendPush,
    ActionType::CreateTask,
    ActionType::UpdateTask,
    ActionType::BulkUpdateTasks,
    ActionType::CreateContact,
    ActionType::UpdateContact,
    ActionType::AddTag,
    ActionType::RemoveTag,
    ActionType::UpdateOpportunity,
    ActionType::CreateProjectFromOpportunity,
    ActionType::CreateProject,
    ActionType::CreateProjectFromTemplate,
    ActionType::AiGenerate,
    ActionType::AiCategorize,
    ActionType::AiSummarize,
    ActionType::WebhookCall,
    ActionType::CreateActivity,
    ActionType::SendSlack,
    ActionType::CreateSlackChannel,
];

impl ActionType {
    /// Return the wire-format string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendEmail => "send_email",
            Self::SendNotification => "send_notification",
            Self::SendPush => "send_push",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::BulkUpdateTasks => "bulk_update_tasks",
            Self::CreateContact => "create_contact",
            Self::UpdateContact => "update_contact",
            Self::AddTag => "add_tag",
            Self::RemoveTag => "remove_tag",
            Self::UpdateOpportunity => "update_opportunity",
            Self::CreateProjectFromOpportunity => "create_project_from_opportunity",
            Self::CreateProject => "create_project",
            Self::CreateProjectFromTemplate => "create_project_from_template",
            Self::AiGenerate => "ai_generate",
            Self::AiCategorize => "ai_categorize",
            Self::AiSummarize => "ai_summarize",
            Self::WebhookCall => "webhook_call",
            Self::CreateActivity => "create_activity",
            Self::SendSlack => "send_slack",
            Self::CreateSlackChannel => "create_slack_channel",
        }
    }

    /// Parse from a wire-format string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "send_email" => Ok(Self::SendEmail),
            "send_notification" => Ok(Self::SendNotification),
            "send_push" => Ok(Self::SendPush),
            "create_task" => Ok(Self::CreateTask),
            "update_task" => Ok(Self::UpdateTask),
            "bulk_update_tasks" => Ok(Self::BulkUpdateTasks),
            "create_contact" => Ok(Self::CreateContact),
            "update_contact" => Ok(Self::UpdateContact),
            "add_tag" => Ok(Self::AddTag),
            "remove_tag" => Ok(Self::RemoveTag),
            "update_opportunity" => Ok(Self::UpdateOpportunity),
            "create_project_from_opportunity" => Ok(Self::CreateProjectFromOpportunity),
            "create_project" => Ok(Self::CreateProject),
            "create_project_from_template" => Ok(Self::CreateProjectFromTemplate),
            "ai_generate" => Ok(Self::AiGenerate),
            "ai_categorize" => Ok(Self::AiCategorize),
            "ai_summarize" => Ok(Self::AiSummarize),
            "webhook_call" => Ok(Self::WebhookCall),
            "create_activity" => Ok(Self::CreateActivity),
            "send_slack" => Ok(Self::SendSlack),
            "create_slack_channel" => Ok(Self::CreateSlackChannel),
            _ => Err(CoreError::Validation(format!(
                "Unknown action_type: '{s}'"
            ))),
        }
    }

    /// Whether this action calls out to a third-party service over the
    /// network (email, Slack, AI provider, arbitrary webhooks).
    pub fn is_external_call(&self) -> bool {
        matches!(
            self,
            Self::SendEmail
                | Self::WebhookCall
                | Self::SendSlack
                | Self::CreateSlackChannel
                | Self::AiGenerate
                | Self::AiCategorize
                | Self::AiSummarize
        )
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a workflow run.
///
/// Transitions: `Pending -> Running -> {Succeeded | Failed | PartiallyFailed}`.
/// Terminal states are final; a failed run must be re-triggered externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    PartiallyFailed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::PartiallyFailed => "partially_failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "partially_failed" => Ok(Self::PartiallyFailed),
            _ => Err(CoreError::Validation(format!(
                "Invalid run status: '{s}'. Must be one of: pending, running, succeeded, \
                 failed, partially_failed"
            ))),
        }
    }

    /// Whether this status is terminal (the run record is immutable).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::PartiallyFailed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

/// Outcome of a single step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(CoreError::Validation(format!(
                "Invalid step status: '{s}'. Must be one of: succeeded, failed, skipped"
            ))),
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a workflow name: non-empty and within the length limit.
pub fn validate_workflow_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Workflow name must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_WORKFLOW_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Workflow name exceeds maximum length of {MAX_WORKFLOW_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a workflow description against the length limit.
pub fn validate_workflow_description(description: &str) -> Result<(), CoreError> {
    if description.len() > MAX_WORKFLOW_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "Workflow description exceeds maximum length of \
             {MAX_WORKFLOW_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate that a trigger config contains the keys its trigger type needs.
///
/// - **Webhook**: `secret` (if present) must be a non-empty string;
///   `allowed_ips` (if present) must be an array of strings.
/// - **Schedule**: requires a parseable 5-field `cron` expression.
/// - **Event**: requires a non-empty `event` name; `filter` (if present)
///   must deserialize as a condition tree.
pub fn validate_trigger_config(
    trigger_type: TriggerType,
    config: &serde_json::Value,
) -> Result<(), CoreError> {
    let obj = config
        .as_object()
        .ok_or_else(|| CoreError::Validation("trigger_config must be a JSON object".to_string()))?;

    match trigger_type {
        TriggerType::Webhook => {
            if let Some(secret) = obj.get("secret") {
                match secret.as_str() {
                    Some(s) if !s.is_empty() => {}
                    _ => {
                        return Err(CoreError::Validation(
                            "webhook trigger 'secret' must be a non-empty string".to_string(),
                        ))
                    }
                }
            }
            if let Some(ips) = obj.get("allowed_ips") {
                let all_strings = ips
                    .as_array()
                    .is_some_and(|a| a.iter().all(|v| v.is_string()));
                if !all_strings {
                    return Err(CoreError::Validation(
                        "webhook trigger 'allowed_ips' must be an array of strings".to_string(),
                    ));
                }
            }
        }
        TriggerType::Schedule => {
            let expr = obj.get("cron").and_then(|v| v.as_str()).ok_or_else(|| {
                CoreError::Validation(
                    "schedule trigger config must contain a 'cron' string".to_string(),
                )
            })?;
            crate::cron::CronSchedule::parse(expr)?;
        }
        TriggerType::Event => {
            let event = obj.get("event").and_then(|v| v.as_str()).unwrap_or("");
            if event.is_empty() {
                return Err(CoreError::Validation(
                    "event trigger config must contain a non-empty 'event' name".to_string(),
                ));
            }
            if let Some(filter) = obj.get("filter") {
                crate::condition::Condition::from_value(filter)?;
            }
        }
    }
    Ok(())
}

/// Validate that an action config contains the required keys for its action
/// type. Template references (`{{ ... }}`) are allowed in any string value,
/// so only presence and JSON shape are checked here.
pub fn validate_action_config(
    action_type: ActionType,
    config: &serde_json::Value,
) -> Result<(), CoreError> {
    let obj = config
        .as_object()
        .ok_or_else(|| CoreError::Validation("action_config must be a JSON object".to_string()))?;

    let require = |key: &str| -> Result<(), CoreError> {
        if obj.contains_key(key) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "{action_type} action config must contain '{key}'"
            )))
        }
    };

    match action_type {
        ActionType::SendEmail => {
            require("to")?;
            require("subject")?;
            require("body")?;
        }
        ActionType::SendNotification | ActionType::SendPush => {
            require("user_id")?;
            require("title")?;
        }
        ActionType::CreateTask => require("title")?,
        ActionType::UpdateTask => require("task_id")?,
        ActionType::BulkUpdateTasks => {
            require("filter")?;
            require("set")?;
        }
        ActionType::CreateContact => require("name")?,
        ActionType::UpdateContact => require("contact_id")?,
        ActionType::AddTag | ActionType::RemoveTag => {
            require("contact_id")?;
            require("tag")?;
        }
        ActionType::UpdateOpportunity => require("opportunity_id")?,
        ActionType::CreateProjectFromOpportunity => require("opportunity_id")?,
        ActionType::CreateProject => require("name")?,
        ActionType::CreateProjectFromTemplate => {
            require("template_id")?;
            require("name")?;
        }
        ActionType::AiGenerate => require("prompt")?,
        ActionType::AiCategorize => {
            require("input")?;
            require("categories")?;
        }
        ActionType::AiSummarize => require("input")?,
        ActionType::WebhookCall => require("url")?,
        ActionType::CreateActivity => {
            require("entity_type")?;
            require("entity_id")?;
            require("kind")?;
        }
        ActionType::SendSlack => {
            require("channel")?;
            require("text")?;
        }
        ActionType::CreateSlackChannel => require("name")?,
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
