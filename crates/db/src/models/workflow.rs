//! Workflow and step models and DTOs.
//!
//! Defines the database row structs for `workflows` / `workflow_steps` and
//! the create / update types used by the repository and API layers.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowline_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A workflow row from the `workflows` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Workflow {
    pub id: DbId,
    pub org_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    pub trigger_config: serde_json::Value,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Workflow {
    /// The webhook signing secret from the trigger config, if configured.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.trigger_config
            .get("secret")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// The caller-IP allow-list from the trigger config, if configured.
    pub fn allowed_ips(&self) -> Option<Vec<&str>> {
        let ips = self.trigger_config.get("allowed_ips")?.as_array()?;
        Some(ips.iter().filter_map(|v| v.as_str()).collect())
    }
}

/// A step row from the `workflow_steps` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: DbId,
    pub workflow_id: DbId,
    pub step_order: i32,
    pub action_type: String,
    pub action_config: serde_json::Value,
    pub is_required: bool,
    pub condition: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTOs
// ---------------------------------------------------------------------------

/// Input for creating a new workflow with its steps.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflow {
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    pub trigger_config: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub steps: Vec<CreateWorkflowStep>,
}

/// One step within a create/update workflow request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowStep {
    pub step_order: i32,
    pub action_type: String,
    pub action_config: serde_json::Value,
    pub is_required: Option<bool>,
    pub condition: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Input for updating an existing workflow. All fields are optional; when
/// `steps` is present the step list is replaced wholesale.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWorkflow {
    pub name: Option<String>,
    pub description: Option<String>,
    pub trigger_type: Option<String>,
    pub trigger_config: Option<serde_json::Value>,
    pub steps: Option<Vec<CreateWorkflowStep>>,
}

// ---------------------------------------------------------------------------
// Composite view
// ---------------------------------------------------------------------------

/// A workflow together with its ordered steps.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowWithSteps {
    #[serde(flatten)]
    pub workflow: Workflow,
    pub steps: Vec<WorkflowStep>,
}
