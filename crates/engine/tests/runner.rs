//! Integration tests for the run orchestrator.
//!
//! Uses mock step executors through the registry's test seam so the state
//! machine, required/optional handling, timeouts, and persistence can be
//! exercised without external services.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;

use flowline_core::workflow::{ActionType, RunStatus, StepStatus, TriggerKind};
use flowline_db::models::workflow::{CreateWorkflowStep, Workflow};
use flowline_db::repositories::{RunRepo, WorkflowRepo};
use flowline_engine::{ExecError, ExecutorRegistry, StepContext, StepExecutor, WorkflowRunner};

// ---------------------------------------------------------------------------
// Mock executors
// ---------------------------------------------------------------------------

/// Returns a fixed output.
struct StaticExecutor {
    action: ActionType,
    output: Value,
}

#[async_trait]
impl StepExecutor for StaticExecutor {
    fn action_type(&self) -> ActionType {
        self.action
    }

    async fn execute(&self, _ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        Ok(self.output.clone())
    }
}

/// Echoes its rendered config as output.
struct EchoExecutor {
    action: ActionType,
}

#[async_trait]
impl StepExecutor for EchoExecutor {
    fn action_type(&self) -> ActionType {
        self.action
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        Ok(ctx.config.clone())
    }
}

/// Always fails with an external error.
struct FailingExecutor {
    action: ActionType,
}

#[async_trait]
impl StepExecutor for FailingExecutor {
    fn action_type(&self) -> ActionType {
        self.action
    }

    async fn execute(&self, _ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        Err(ExecError::External("simulated provider outage".into()))
    }
}

/// Sleeps long enough to trip the step timeout.
struct SleepExecutor {
    action: ActionType,
    delay: Duration,
}

#[async_trait]
impl StepExecutor for SleepExecutor {
    fn action_type(&self) -> ActionType {
        self.action
    }

    async fn execute(&self, _ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({}))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_org(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO organizations (name) VALUES ('Acme') RETURNING id")
        .fetch_one(pool)
        .await
        .expect("org insert should succeed")
}

async fn seed_workflow(pool: &PgPool, org_id: i64, steps: &[CreateWorkflowStep]) -> Workflow {
    let workflow = WorkflowRepo::create(
        pool,
        org_id,
        "Test workflow",
        None,
        "webhook",
        &json!({}),
        true,
        None,
    )
    .await
    .expect("workflow insert should succeed");

    WorkflowRepo::replace_steps(pool, workflow.id, steps)
        .await
        .expect("step insert should succeed");

    workflow
}

fn step(order: i32, action: ActionType, config: Value, required: bool) -> CreateWorkflowStep {
    CreateWorkflowStep {
        step_order: order,
        action_type: action.as_str().to_string(),
        action_config: config,
        is_required: Some(required),
        condition: None,
    }
}

fn runner(pool: &PgPool, executors: Vec<Arc<dyn StepExecutor>>) -> Arc<WorkflowRunner> {
    let registry = Arc::new(ExecutorRegistry::from_executors(executors));
    Arc::new(WorkflowRunner::new(pool.clone(), registry))
}

async fn run_to_completion(
    pool: &PgPool,
    runner: &Arc<WorkflowRunner>,
    workflow: &Workflow,
) -> (RunStatus, i64) {
    let run = runner
        .start_run(
            workflow,
            TriggerKind::Manual,
            json!({ "is_manual": true, "data": { "status": "open" } }),
        )
        .await
        .expect("run creation should succeed");
    let run_id = run.id;
    let status = runner.execute(run).await;

    // The persisted status must agree with the returned one.
    let stored = RunRepo::find_by_id(pool, workflow.org_id, run_id)
        .await
        .unwrap()
        .expect("run should exist");
    assert_eq!(stored.status, status.as_str());

    (status, run_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn successful_run_produces_one_result_per_step(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_workflow(
        &pool,
        org,
        &[
            step(1, ActionType::CreateTask, json!({ "title": "a" }), true),
            step(2, ActionType::SendEmail, json!({}), true),
            step(3, ActionType::SendSlack, json!({}), false),
        ],
    )
    .await;

    let runner = runner(
        &pool,
        vec![
            Arc::new(StaticExecutor {
                action: ActionType::CreateTask,
                output: json!({ "task_id": 1 }),
            }),
            Arc::new(StaticExecutor {
                action: ActionType::SendEmail,
                output: json!({ "to": "a@b.c" }),
            }),
            Arc::new(StaticExecutor {
                action: ActionType::SendSlack,
                output: json!({ "ts": "1" }),
            }),
        ],
    );

    let (status, run_id) = run_to_completion(&pool, &runner, &workflow).await;
    assert_eq!(status, RunStatus::Succeeded);

    let results = RunRepo::list_step_results(&pool, run_id).await.unwrap();
    assert_eq!(results.len(), 3, "one StepResult per step");

    let mut last_order = 0;
    for result in &results {
        assert_eq!(result.status, StepStatus::Succeeded.as_str());
        assert!(result.started_at <= result.ended_at);
        assert!(result.step_order > last_order, "step_order strictly increasing");
        last_order = result.step_order;
    }

    let run = RunRepo::find_by_id(&pool, org, run_id).await.unwrap().unwrap();
    assert!(run.ended_at.is_some());
    assert!(run.error.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn required_failure_aborts_remaining_steps(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_workflow(
        &pool,
        org,
        &[
            step(1, ActionType::WebhookCall, json!({ "url": "x" }), true),
            step(2, ActionType::SendEmail, json!({}), true),
        ],
    )
    .await;

    let runner = runner(
        &pool,
        vec![
            Arc::new(FailingExecutor {
                action: ActionType::WebhookCall,
            }),
            Arc::new(StaticExecutor {
                action: ActionType::SendEmail,
                output: json!({}),
            }),
        ],
    );

    let (status, run_id) = run_to_completion(&pool, &runner, &workflow).await;
    assert_eq!(status, RunStatus::Failed);

    let results = RunRepo::list_step_results(&pool, run_id).await.unwrap();
    assert_eq!(results.len(), 1, "no step after the required failure executes");
    assert_eq!(results[0].status, StepStatus::Failed.as_str());
    assert!(results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("simulated provider outage"));

    let run = RunRepo::find_by_id(&pool, org, run_id).await.unwrap().unwrap();
    assert!(run.error.as_deref().unwrap().contains("required step 1"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn optional_failures_finish_as_partially_failed(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_workflow(
        &pool,
        org,
        &[
            step(1, ActionType::CreateTask, json!({ "title": "a" }), true),
            step(2, ActionType::SendEmail, json!({}), false),
            step(3, ActionType::SendSlack, json!({}), false),
        ],
    )
    .await;

    let runner = runner(
        &pool,
        vec![
            Arc::new(StaticExecutor {
                action: ActionType::CreateTask,
                output: json!({ "task_id": 9 }),
            }),
            Arc::new(FailingExecutor {
                action: ActionType::SendEmail,
            }),
            Arc::new(StaticExecutor {
                action: ActionType::SendSlack,
                output: json!({}),
            }),
        ],
    );

    let (status, run_id) = run_to_completion(&pool, &runner, &workflow).await;
    assert_eq!(status, RunStatus::PartiallyFailed);

    let results = RunRepo::list_step_results(&pool, run_id).await.unwrap();
    assert_eq!(results.len(), 3, "all steps still execute");
    assert_eq!(results[0].status, StepStatus::Succeeded.as_str());
    assert_eq!(results[1].status, StepStatus::Failed.as_str());
    assert_eq!(results[2].status, StepStatus::Succeeded.as_str());
}

#[sqlx::test(migrations = "../../migrations")]
async fn optional_timeout_yields_partially_failed_with_timeout_error(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_workflow(
        &pool,
        org,
        &[
            step(1, ActionType::CreateTask, json!({ "title": "t" }), true),
            step(2, ActionType::SendEmail, json!({}), false),
        ],
    )
    .await;

    let registry = Arc::new(ExecutorRegistry::from_executors(vec![
        Arc::new(StaticExecutor {
            action: ActionType::CreateTask,
            output: json!({ "task_id": 5 }),
        }),
        Arc::new(SleepExecutor {
            action: ActionType::SendEmail,
            delay: Duration::from_secs(5),
        }),
    ]));
    let runner = Arc::new(
        WorkflowRunner::new(pool.clone(), registry).with_step_timeout(Duration::from_millis(100)),
    );

    let (status, run_id) = run_to_completion(&pool, &runner, &workflow).await;
    assert_eq!(status, RunStatus::PartiallyFailed);

    let results = RunRepo::list_step_results(&pool, run_id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, StepStatus::Succeeded.as_str());
    assert_eq!(results[1].status, StepStatus::Failed.as_str());
    assert!(results[1].error.as_deref().unwrap().contains("timed out"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_step_order_is_a_configuration_error(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_workflow(
        &pool,
        org,
        &[
            step(1, ActionType::CreateTask, json!({ "title": "a" }), true),
            step(1, ActionType::SendEmail, json!({}), true),
        ],
    )
    .await;

    let runner = runner(
        &pool,
        vec![
            Arc::new(StaticExecutor {
                action: ActionType::CreateTask,
                output: json!({}),
            }),
            Arc::new(StaticExecutor {
                action: ActionType::SendEmail,
                output: json!({}),
            }),
        ],
    );

    let (status, run_id) = run_to_completion(&pool, &runner, &workflow).await;
    assert_eq!(status, RunStatus::Failed);

    let results = RunRepo::list_step_results(&pool, run_id).await.unwrap();
    assert!(results.is_empty(), "no step executes on a config error");

    let run = RunRepo::find_by_id(&pool, org, run_id).await.unwrap().unwrap();
    assert!(run
        .error
        .as_deref()
        .unwrap()
        .contains("duplicate step_order"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn false_condition_skips_step_without_failing_run(pool: PgPool) {
    let org = seed_org(&pool).await;

    let mut skipped = step(
        2,
        ActionType::SendEmail,
        json!({}),
        true,
    );
    // Manual trigger data in run_to_completion carries status = "open".
    skipped.condition = Some(json!({ "op": "equals", "field": "status", "value": "closed" }));

    let workflow = seed_workflow(
        &pool,
        org,
        &[
            step(1, ActionType::CreateTask, json!({ "title": "a" }), true),
            skipped,
        ],
    )
    .await;

    let runner = runner(
        &pool,
        vec![
            Arc::new(StaticExecutor {
                action: ActionType::CreateTask,
                output: json!({}),
            }),
            Arc::new(StaticExecutor {
                action: ActionType::SendEmail,
                output: json!({}),
            }),
        ],
    );

    let (status, run_id) = run_to_completion(&pool, &runner, &workflow).await;
    assert_eq!(status, RunStatus::Succeeded, "skipped steps are not failures");

    let results = RunRepo::list_step_results(&pool, run_id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].status, StepStatus::Skipped.as_str());
}

#[sqlx::test(migrations = "../../migrations")]
async fn step_output_chains_into_later_step_config(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_workflow(
        &pool,
        org,
        &[
            step(1, ActionType::CreateTask, json!({ "title": "a" }), true),
            step(2, ActionType::UpdateTask, json!({}), true),
        ],
    )
    .await;

    // Point the second step's config at the first step's output. Step ids
    // are only known after insertion.
    let steps = WorkflowRepo::list_steps(&pool, workflow.id).await.unwrap();
    let first_id = steps[0].id;
    let second_id = steps[1].id;
    let reference = format!("{{{{ steps['{first_id}'].output.task_id }}}}");
    sqlx::query("UPDATE workflow_steps SET action_config = $1 WHERE id = $2")
        .bind(json!({ "task_id": reference }))
        .bind(second_id)
        .execute(&pool)
        .await
        .unwrap();

    let runner = runner(
        &pool,
        vec![
            Arc::new(StaticExecutor {
                action: ActionType::CreateTask,
                output: json!({ "task_id": 42 }),
            }),
            Arc::new(EchoExecutor {
                action: ActionType::UpdateTask,
            }),
        ],
    );

    let (status, run_id) = run_to_completion(&pool, &runner, &workflow).await;
    assert_eq!(status, RunStatus::Succeeded);

    let results = RunRepo::list_step_results(&pool, run_id).await.unwrap();
    assert_eq!(
        results[1].output["task_id"], 42,
        "rendered reference resolves to the earlier output"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_action_type_fails_the_step_not_the_process(pool: PgPool) {
    let org = seed_org(&pool).await;
    let workflow = seed_workflow(
        &pool,
        org,
        &[CreateWorkflowStep {
            step_order: 1,
            action_type: "frobnicate_widgets".to_string(),
            action_config: json!({}),
            is_required: Some(true),
            condition: None,
        }],
    )
    .await;

    let runner = runner(&pool, vec![]);

    let (status, run_id) = run_to_completion(&pool, &runner, &workflow).await;
    assert_eq!(status, RunStatus::Failed);

    let results = RunRepo::list_step_results(&pool, run_id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, StepStatus::Failed.as_str());
    assert!(results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Unknown action_type"));
}
