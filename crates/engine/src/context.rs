//! Per-run execution context.
//!
//! [`RunContext`] threads the trigger payload and the accumulated outputs
//! of previously executed steps through a run. Later steps address earlier
//! outputs by step id (`{{ steps['<id>'].output.<field> }}`).

use serde_json::{json, Map, Value};

use flowline_core::types::DbId;

/// Accumulated state for one workflow run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The canonical trigger payload that started the run.
    trigger: Value,
    /// Outputs of completed steps, keyed by step id (stringified).
    steps: Map<String, Value>,
}

impl RunContext {
    /// Create a context from a trigger payload.
    pub fn new(trigger: Value) -> Self {
        Self {
            trigger,
            steps: Map::new(),
        }
    }

    /// Record a completed step's output, making it addressable by later
    /// steps as `steps['<id>'].output`.
    pub fn insert_step_output(&mut self, step_id: DbId, output: Value) {
        self.steps
            .insert(step_id.to_string(), json!({ "output": output }));
    }

    /// The full context as a JSON object for template rendering:
    /// `{ "trigger": ..., "steps": { "<id>": { "output": ... } } }`.
    pub fn to_template_context(&self) -> Value {
        json!({
            "trigger": self.trigger,
            "steps": self.steps,
        })
    }

    /// A flat key-value view of the trigger's data for condition
    /// evaluation.
    ///
    /// Webhook payloads contribute the top-level fields of `body`, event
    /// and manual payloads those of `data`. Non-object data yields an
    /// empty context, which fails closed for any field comparison.
    pub fn flat_trigger_data(&self) -> Map<String, Value> {
        let data = self
            .trigger
            .get("body")
            .or_else(|| self.trigger.get("data"))
            .unwrap_or(&Value::Null);

        data.as_object().cloned().unwrap_or_default()
    }

    /// The trigger payload as received.
    pub fn trigger(&self) -> &Value {
        &self.trigger
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
