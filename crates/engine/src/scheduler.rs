//! Schedule trigger ticker.
//!
//! [`ScheduleTicker`] runs as a background task, periodically scanning
//! active schedule workflows and starting runs whose cron expression
//! matches the current minute. A per-workflow marker prevents this process
//! from double-firing within one minute; there is deliberately no
//! cross-instance coordination (duplicate triggers yield independent runs).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use flowline_core::cron::CronSchedule;
use flowline_core::types::DbId;
use flowline_core::workflow::{TriggerKind, TriggerType};
use flowline_db::repositories::WorkflowRepo;
use flowline_db::DbPool;

use crate::runner::WorkflowRunner;
use crate::trigger::schedule_payload;

/// How often the ticker checks for due schedules.
const TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Background service that fires schedule-triggered workflows.
pub struct ScheduleTicker {
    pool: DbPool,
    runner: Arc<WorkflowRunner>,
    interval: Duration,
    /// Last minute each workflow fired in, keyed by workflow id.
    fired: HashMap<DbId, String>,
}

impl ScheduleTicker {
    /// Create a new ticker with the default 30-second interval.
    pub fn new(pool: DbPool, runner: Arc<WorkflowRunner>) -> Self {
        Self {
            pool,
            runner,
            interval: TICK_INTERVAL,
            fired: HashMap::new(),
        }
    }

    /// Override the tick interval (test seam).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the ticker loop until the cancellation token is triggered.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Schedule ticker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Schedule ticker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Schedule tick failed");
                    }
                }
            }
        }
    }

    /// One tick: start runs for every schedule due this minute.
    async fn tick(&mut self) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let minute = now.format("%Y-%m-%dT%H:%M").to_string();

        let workflows =
            WorkflowRepo::list_active_by_trigger(&self.pool, TriggerType::Schedule.as_str())
                .await?;

        // Drop markers from earlier minutes so the map stays bounded.
        self.fired.retain(|_, fired_minute| *fired_minute == minute);

        for workflow in &workflows {
            let Some(cron) = workflow.trigger_config.get("cron").and_then(|v| v.as_str())
            else {
                tracing::warn!(workflow_id = workflow.id, "Schedule workflow missing cron");
                continue;
            };

            let schedule = match CronSchedule::parse(cron) {
                Ok(schedule) => schedule,
                Err(e) => {
                    tracing::warn!(
                        workflow_id = workflow.id,
                        cron,
                        error = %e,
                        "Invalid cron expression; skipping workflow",
                    );
                    continue;
                }
            };

            if !schedule.matches(now) {
                continue;
            }
            if self.fired.get(&workflow.id) == Some(&minute) {
                continue;
            }
            self.fired.insert(workflow.id, minute.clone());

            match self
                .runner
                .start_run(workflow, TriggerKind::Schedule, schedule_payload(cron))
                .await
            {
                Ok(run) => {
                    tracing::info!(
                        workflow_id = workflow.id,
                        run_id = run.id,
                        cron,
                        "Schedule fired",
                    );
                    self.runner.spawn(run);
                }
                Err(e) => {
                    tracing::error!(
                        workflow_id = workflow.id,
                        error = %e,
                        "Failed to create scheduled run",
                    );
                }
            }
        }

        Ok(())
    }
}
