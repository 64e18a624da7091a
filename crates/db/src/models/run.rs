//! Run and step-result models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowline_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A run row from the `workflow_runs` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: DbId,
    pub workflow_id: DbId,
    pub org_id: DbId,
    pub status: String,
    pub trigger_kind: String,
    pub trigger_payload: serde_json::Value,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
}

/// A step-result row from the `workflow_step_results` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StepResult {
    pub id: DbId,
    pub run_id: DbId,
    pub step_id: Option<DbId>,
    pub step_order: i32,
    pub action_type: String,
    pub status: String,
    pub output: serde_json::Value,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for appending one step result to a run.
#[derive(Debug, Clone)]
pub struct NewStepResult {
    pub step_id: Option<DbId>,
    pub step_order: i32,
    pub action_type: String,
    pub status: String,
    pub output: serde_json::Value,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
}

/// Query parameters for filtering a workflow's run history.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A run together with its recorded step results.
#[derive(Debug, Clone, Serialize)]
pub struct RunWithResults {
    #[serde(flatten)]
    pub run: WorkflowRun,
    pub step_results: Vec<StepResult>,
}
