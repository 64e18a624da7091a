//! Event trigger listener.
//!
//! Subscribes to the in-process [`EventBus`] and starts runs for active
//! event workflows whose trigger config matches the published event. Runs
//! are detached; a slow run never blocks event delivery.

use std::sync::Arc;

use tokio::sync::broadcast;

use flowline_core::workflow::{TriggerKind, TriggerType};
use flowline_db::repositories::WorkflowRepo;
use flowline_db::DbPool;
use flowline_events::DomainEvent;

use crate::runner::WorkflowRunner;
use crate::trigger::{event_matches, event_payload};

/// Background service that fires event-triggered workflows.
pub struct EventTriggerListener {
    pool: DbPool,
    runner: Arc<WorkflowRunner>,
}

impl EventTriggerListener {
    pub fn new(pool: DbPool, runner: Arc<WorkflowRunner>) -> Self {
        Self { pool, runner }
    }

    /// Consume events until the bus closes.
    ///
    /// The receiver should come from `EventBus::subscribe` before any
    /// events of interest are published.
    pub async fn run(self, mut rx: broadcast::Receiver<DomainEvent>) {
        tracing::info!("Event trigger listener started");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.handle(&event).await {
                        tracing::error!(
                            event = %event.name,
                            error = %e,
                            "Failed to process event trigger",
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event trigger listener lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed; event trigger listener stopping");
                    break;
                }
            }
        }
    }

    /// Start runs for every active event workflow matching this event.
    async fn handle(&self, event: &DomainEvent) -> Result<(), sqlx::Error> {
        let workflows =
            WorkflowRepo::list_active_by_trigger(&self.pool, TriggerType::Event.as_str()).await?;

        for workflow in workflows.iter().filter(|w| event_matches(w, event)) {
            match self
                .runner
                .start_run(workflow, TriggerKind::Event, event_payload(event))
                .await
            {
                Ok(run) => {
                    tracing::info!(
                        workflow_id = workflow.id,
                        run_id = run.id,
                        event = %event.name,
                        "Event trigger fired",
                    );
                    self.runner.spawn(run);
                }
                Err(e) => {
                    tracing::error!(
                        workflow_id = workflow.id,
                        event = %event.name,
                        error = %e,
                        "Failed to create event-triggered run",
                    );
                }
            }
        }

        Ok(())
    }
}
