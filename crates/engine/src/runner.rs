//! The run orchestrator.
//!
//! [`WorkflowRunner`] drives one run at a time through the state machine
//! `pending -> running -> {succeeded | failed | partially_failed}`. Runs
//! execute their steps strictly sequentially; multiple runs may execute
//! concurrently with no cross-run coordination. Step failures are recorded
//! data, never panics.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};

use flowline_core::condition::Condition;
use flowline_core::types::DbId;
use flowline_core::workflow::{
    ActionType, RunStatus, StepStatus, TriggerKind, DEFAULT_STEP_TIMEOUT_SECS,
    MAX_STEP_ERROR_LENGTH,
};
use flowline_db::models::run::{NewStepResult, WorkflowRun};
use flowline_db::models::workflow::{Workflow, WorkflowStep};
use flowline_db::repositories::{RunRepo, WorkflowRepo};
use flowline_db::DbPool;

use crate::context::RunContext;
use crate::error::ExecError;
use crate::executor::{ExecutorRegistry, StepContext};
use crate::template::TemplateEngine;

/// Executes workflow runs against the database and the executor registry.
///
/// Constructed once at startup with its dependencies passed in explicitly
/// and shared via `Arc`.
pub struct WorkflowRunner {
    pool: DbPool,
    registry: Arc<ExecutorRegistry>,
    templates: TemplateEngine,
    step_timeout: Duration,
}

impl WorkflowRunner {
    pub fn new(pool: DbPool, registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            pool,
            registry,
            templates: TemplateEngine::new(),
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
        }
    }

    /// Override the per-step timeout (test seam).
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Create the run record for a trigger firing.
    ///
    /// The run starts in `pending`; callers either await
    /// [`execute`](Self::execute) or detach it with
    /// [`spawn`](Self::spawn).
    pub async fn start_run(
        &self,
        workflow: &Workflow,
        kind: TriggerKind,
        payload: Value,
    ) -> Result<WorkflowRun, sqlx::Error> {
        RunRepo::create(
            &self.pool,
            workflow.id,
            workflow.org_id,
            kind.as_str(),
            &payload,
        )
        .await
    }

    /// Execute a run on a detached task (fire-and-forget).
    ///
    /// Used by the webhook trigger path, which must acknowledge the HTTP
    /// request before the run completes. Errors are logged, not surfaced.
    pub fn spawn(self: &Arc<Self>, run: WorkflowRun) {
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let run_id = run.id;
            let status = runner.execute(run).await;
            tracing::debug!(run_id, status = %status, "Detached run finished");
        });
    }

    /// Drive a run to a terminal status, returning it.
    ///
    /// Persistence failures mid-run finalize the run as `failed` on a
    /// best-effort basis; they never propagate as panics.
    pub async fn execute(&self, run: WorkflowRun) -> RunStatus {
        let run_id = run.id;
        match self.run_steps(&run).await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(run_id, error = %e, "Run aborted on engine error");
                let message = truncate_error(&format!("engine error: {e}"));
                if let Err(e) =
                    RunRepo::finalize(&self.pool, run_id, RunStatus::Failed.as_str(), Some(&message))
                        .await
                {
                    tracing::error!(run_id, error = %e, "Failed to finalize aborted run");
                }
                RunStatus::Failed
            }
        }
    }

    /// The run loop proper. Database errors bubble up to [`execute`].
    async fn run_steps(&self, run: &WorkflowRun) -> Result<RunStatus, sqlx::Error> {
        RunRepo::mark_running(&self.pool, run.id).await?;

        let steps = WorkflowRepo::list_steps(&self.pool, run.workflow_id).await?;

        // Duplicate step_order makes execution order undefined; treat it as
        // a configuration error before any step runs.
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.step_order) {
                let message = format!(
                    "configuration error: duplicate step_order {} in workflow {}",
                    step.step_order, run.workflow_id
                );
                tracing::warn!(run_id = run.id, workflow_id = run.workflow_id, %message);
                RunRepo::finalize(
                    &self.pool,
                    run.id,
                    RunStatus::Failed.as_str(),
                    Some(&message),
                )
                .await?;
                return Ok(RunStatus::Failed);
            }
        }

        let mut ctx = RunContext::new(run.trigger_payload.clone());
        let mut optional_failed = false;

        for step in &steps {
            let started_at = Utc::now();

            // Conditional steps: a false (or unparseable) condition skips
            // the step without failing the run.
            if let Some(skip_reason) = self.should_skip(step, &ctx) {
                let ended_at = Utc::now();
                RunRepo::append_step_result(
                    &self.pool,
                    run.id,
                    &NewStepResult {
                        step_id: Some(step.id),
                        step_order: step.step_order,
                        action_type: step.action_type.clone(),
                        status: StepStatus::Skipped.as_str().to_string(),
                        output: json!({}),
                        error: skip_reason,
                        started_at,
                        ended_at,
                    },
                )
                .await?;
                continue;
            }

            let outcome = self.execute_step(run.org_id, step, &ctx).await;
            let ended_at = Utc::now();

            match outcome {
                Ok(output) => {
                    RunRepo::append_step_result(
                        &self.pool,
                        run.id,
                        &NewStepResult {
                            step_id: Some(step.id),
                            step_order: step.step_order,
                            action_type: step.action_type.clone(),
                            status: StepStatus::Succeeded.as_str().to_string(),
                            output: output.clone(),
                            error: None,
                            started_at,
                            ended_at,
                        },
                    )
                    .await?;
                    ctx.insert_step_output(step.id, output);
                }
                Err(e) => {
                    let error = truncate_error(&e.to_string());
                    tracing::warn!(
                        run_id = run.id,
                        step_id = step.id,
                        action_type = %step.action_type,
                        error = %error,
                        required = step.is_required,
                        "Step failed",
                    );
                    RunRepo::append_step_result(
                        &self.pool,
                        run.id,
                        &NewStepResult {
                            step_id: Some(step.id),
                            step_order: step.step_order,
                            action_type: step.action_type.clone(),
                            status: StepStatus::Failed.as_str().to_string(),
                            output: json!({}),
                            error: Some(error.clone()),
                            started_at,
                            ended_at,
                        },
                    )
                    .await?;

                    if step.is_required {
                        let message = format!(
                            "required step {} ({}) failed: {error}",
                            step.step_order, step.action_type
                        );
                        RunRepo::finalize(
                            &self.pool,
                            run.id,
                            RunStatus::Failed.as_str(),
                            Some(&truncate_error(&message)),
                        )
                        .await?;
                        return Ok(RunStatus::Failed);
                    }
                    optional_failed = true;
                }
            }
        }

        let status = if optional_failed {
            RunStatus::PartiallyFailed
        } else {
            RunStatus::Succeeded
        };
        RunRepo::finalize(&self.pool, run.id, status.as_str(), None).await?;

        tracing::info!(
            run_id = run.id,
            workflow_id = run.workflow_id,
            status = %status,
            steps = steps.len(),
            "Run finished",
        );

        Ok(status)
    }

    /// Evaluate a step's optional condition. Returns `Some(reason)` when
    /// the step should be skipped.
    fn should_skip(&self, step: &WorkflowStep, ctx: &RunContext) -> Option<Option<String>> {
        let condition = step.condition.as_ref()?;
        match Condition::from_value(condition) {
            Ok(parsed) => {
                if parsed.evaluate(&ctx.flat_trigger_data()) {
                    None
                } else {
                    Some(None)
                }
            }
            Err(e) => {
                tracing::warn!(
                    step_id = step.id,
                    error = %e,
                    "Unparseable step condition; skipping step",
                );
                Some(Some(format!("condition not evaluated: {e}")))
            }
        }
    }

    /// Render the step's config and run its executor under the timeout.
    async fn execute_step(
        &self,
        org_id: DbId,
        step: &WorkflowStep,
        ctx: &RunContext,
    ) -> Result<Value, ExecError> {
        let action = ActionType::parse(&step.action_type)
            .map_err(|e| ExecError::Config(e.to_string()))?;

        let executor = self
            .registry
            .get(action)
            .ok_or_else(|| ExecError::Config(format!("no executor for action '{action}'")))?;

        let config = self
            .templates
            .render_config(&step.action_config, ctx)
            .map_err(|e| ExecError::Config(e.to_string()))?;

        let step_ctx = StepContext {
            org_id,
            config: &config,
            run: ctx,
        };

        match tokio::time::timeout(self.step_timeout, executor.execute(&step_ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ExecError::Timeout(self.step_timeout.as_secs())),
        }
    }
}

/// Bound stored error messages.
fn truncate_error(message: &str) -> String {
    if message.len() <= MAX_STEP_ERROR_LENGTH {
        message.to_string()
    } else {
        let mut end = MAX_STEP_ERROR_LENGTH;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message[..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_error_bounds_long_messages() {
        let long = "x".repeat(MAX_STEP_ERROR_LENGTH + 100);
        assert_eq!(truncate_error(&long).len(), MAX_STEP_ERROR_LENGTH);
        assert_eq!(truncate_error("short"), "short");
    }

    #[test]
    fn truncate_error_respects_char_boundaries() {
        let mut long = "é".repeat(MAX_STEP_ERROR_LENGTH / 2);
        long.push_str("suffix");
        let truncated = truncate_error(&long);
        assert!(truncated.len() <= MAX_STEP_ERROR_LENGTH);
    }
}
