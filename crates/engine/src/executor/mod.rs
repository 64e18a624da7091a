//! Step executors and the action-type dispatch registry.
//!
//! Each executor implements [`StepExecutor`] for exactly one
//! [`ActionType`]. The [`ExecutorRegistry`] maps every action type to its
//! executor and is validated exhaustively at construction, so a missing
//! mapping is a startup failure instead of a runtime surprise.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use flowline_core::error::CoreError;
use flowline_core::types::DbId;
use flowline_core::workflow::{ActionType, ALL_ACTION_TYPES};
use flowline_db::DbPool;
use flowline_events::EventBus;

use crate::config::EngineConfig;
use crate::context::RunContext;
use crate::error::ExecError;

mod ai;
mod email;
mod notify;
mod records;
mod slack;
mod webhook;

// ---------------------------------------------------------------------------
// StepContext
// ---------------------------------------------------------------------------

/// Everything an executor may see while running one step.
///
/// `config` is the step's `action_config` with all template references
/// already rendered against the run context.
pub struct StepContext<'a> {
    /// The organization the run belongs to. Mutation executors must scope
    /// every write to it.
    pub org_id: DbId,
    /// The rendered action config.
    pub config: &'a Value,
    /// Trigger payload and prior step outputs.
    pub run: &'a RunContext,
}

impl StepContext<'_> {
    /// Fetch a required string field from the config.
    pub fn str_field(&self, key: &str) -> Result<&str, ExecError> {
        self.config
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ExecError::Config(format!("missing or non-string field '{key}'")))
    }

    /// Fetch an optional string field from the config.
    pub fn opt_str_field(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    /// Fetch a required integer id field from the config.
    ///
    /// Accepts both JSON numbers and numeric strings, since rendered
    /// template references may arrive either way.
    pub fn id_field(&self, key: &str) -> Result<DbId, ExecError> {
        let value = self
            .config
            .get(key)
            .ok_or_else(|| ExecError::Config(format!("missing field '{key}'")))?;

        match value {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| ExecError::Config(format!("field '{key}' is not an integer id"))),
            Value::String(s) => s
                .parse()
                .map_err(|_| ExecError::Config(format!("field '{key}' is not an integer id"))),
            _ => Err(ExecError::Config(format!(
                "field '{key}' is not an integer id"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// StepExecutor
// ---------------------------------------------------------------------------

/// The common contract all step executors implement.
///
/// On success the returned value becomes the step's recorded output and is
/// merged into the run context for later steps. Failures are recorded on
/// the step result; they never crash the run loop.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// The action type this executor handles.
    fn action_type(&self) -> ActionType;

    /// Execute one step.
    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError>;
}

// ---------------------------------------------------------------------------
// ExecutorRegistry
// ---------------------------------------------------------------------------

/// Maps every [`ActionType`] to its executor.
pub struct ExecutorRegistry {
    executors: HashMap<ActionType, Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    /// Build the full production registry.
    ///
    /// Fails with a [`CoreError::Internal`] if any action type ends up
    /// without an executor; callers should treat that as a startup error.
    pub fn new(pool: DbPool, bus: Arc<EventBus>, config: &EngineConfig) -> Result<Self, CoreError> {
        let executors: Vec<Arc<dyn StepExecutor>> = vec![
            Arc::new(email::SendEmailExecutor::new(config.email.clone())),
            Arc::new(webhook::WebhookCallExecutor::new()),
            Arc::new(slack::SendSlackExecutor::new(config.slack.clone())),
            Arc::new(slack::CreateSlackChannelExecutor::new(config.slack.clone())),
            Arc::new(ai::AiExecutor::new(ActionType::AiGenerate, config.ai.clone())),
            Arc::new(ai::AiExecutor::new(ActionType::AiCategorize, config.ai.clone())),
            Arc::new(ai::AiExecutor::new(ActionType::AiSummarize, config.ai.clone())),
            Arc::new(notify::NotificationExecutor::inapp(pool.clone(), Arc::clone(&bus))),
            Arc::new(notify::NotificationExecutor::push(pool.clone(), Arc::clone(&bus))),
            Arc::new(records::CreateTaskExecutor { pool: pool.clone() }),
            Arc::new(records::UpdateTaskExecutor { pool: pool.clone() }),
            Arc::new(records::BulkUpdateTasksExecutor { pool: pool.clone() }),
            Arc::new(records::CreateContactExecutor { pool: pool.clone() }),
            Arc::new(records::UpdateContactExecutor { pool: pool.clone() }),
            Arc::new(records::TagExecutor::add(pool.clone())),
            Arc::new(records::TagExecutor::remove(pool.clone())),
            Arc::new(records::UpdateOpportunityExecutor { pool: pool.clone() }),
            Arc::new(records::CreateProjectExecutor { pool: pool.clone() }),
            Arc::new(records::CreateProjectFromOpportunityExecutor { pool: pool.clone() }),
            Arc::new(records::CreateProjectFromTemplateExecutor { pool: pool.clone() }),
            Arc::new(records::CreateActivityExecutor { pool }),
        ];

        let map: HashMap<ActionType, Arc<dyn StepExecutor>> = executors
            .into_iter()
            .map(|e| (e.action_type(), e))
            .collect();

        let registry = Self { executors: map };
        registry.validate()?;
        Ok(registry)
    }

    /// Build a registry from an explicit executor list (test seam).
    pub fn from_executors(executors: Vec<Arc<dyn StepExecutor>>) -> Self {
        Self {
            executors: executors
                .into_iter()
                .map(|e| (e.action_type(), e))
                .collect(),
        }
    }

    /// Check that every action type has an executor.
    pub fn validate(&self) -> Result<(), CoreError> {
        for action in ALL_ACTION_TYPES {
            if !self.executors.contains_key(action) {
                return Err(CoreError::Internal(format!(
                    "No executor registered for action_type '{action}'"
                )));
            }
        }
        Ok(())
    }

    /// Look up the executor for an action type.
    pub fn get(&self, action: ActionType) -> Option<&Arc<dyn StepExecutor>> {
        self.executors.get(&action)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoopExecutor(ActionType);

    #[async_trait]
    impl StepExecutor for NoopExecutor {
        fn action_type(&self) -> ActionType {
            self.0
        }

        async fn execute(&self, _ctx: &StepContext<'_>) -> Result<Value, ExecError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn validate_flags_missing_action_types() {
        let registry =
            ExecutorRegistry::from_executors(vec![Arc::new(NoopExecutor(ActionType::CreateTask))]);
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("No executor registered"));
    }

    #[test]
    fn validate_passes_when_exhaustive() {
        let executors: Vec<Arc<dyn StepExecutor>> = ALL_ACTION_TYPES
            .iter()
            .map(|a| Arc::new(NoopExecutor(*a)) as Arc<dyn StepExecutor>)
            .collect();
        let registry = ExecutorRegistry::from_executors(executors);
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn step_context_id_field_accepts_number_and_string() {
        let config = json!({ "a": 42, "b": "17", "c": "nope", "d": true });
        let run = RunContext::new(json!({}));
        let ctx = StepContext {
            org_id: 1,
            config: &config,
            run: &run,
        };

        assert_eq!(ctx.id_field("a").unwrap(), 42);
        assert_eq!(ctx.id_field("b").unwrap(), 17);
        assert!(ctx.id_field("c").is_err());
        assert!(ctx.id_field("d").is_err());
        assert!(ctx.id_field("missing").is_err());
    }

    #[test]
    fn step_context_str_field() {
        let config = json!({ "title": "Call", "n": 5 });
        let run = RunContext::new(json!({}));
        let ctx = StepContext {
            org_id: 1,
            config: &config,
            run: &run,
        };

        assert_eq!(ctx.str_field("title").unwrap(), "Call");
        assert!(ctx.str_field("n").is_err());
        assert_eq!(ctx.opt_str_field("missing"), None);
    }
}
