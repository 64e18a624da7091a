//! Step-config templating.
//!
//! Action configs may reference trigger data and earlier step outputs with
//! `{{ ... }}` expressions (`{{ trigger.body.email }}`,
//! `{{ steps['12'].output.task_id }}`). Rendering walks the config value:
//! strings containing template syntax are rendered through minijinja, and
//! a rendered string that parses as JSON becomes that value, so
//! `"{{ steps['12'].output.task_id }}"` yields a number where one is needed.

use minijinja::Environment;
use serde_json::Value;

use crate::context::RunContext;

/// Error produced when a template fails to parse or render.
#[derive(Debug, thiserror::Error)]
#[error("Template error: {0}")]
pub struct TemplateError(String);

/// Renders `{{ ... }}` references in step configs.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Missing references render as errors, not empty strings; a config
        // pointing at a step output that never materialized is a step
        // failure, not a silently-blank field.
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        Self { env }
    }

    /// Whether a string contains template syntax.
    pub fn is_template(s: &str) -> bool {
        s.contains("{{") || s.contains("{%")
    }

    /// Render a single template string against the run context.
    pub fn render_str(&self, template: &str, ctx: &RunContext) -> Result<String, TemplateError> {
        let tmpl = self
            .env
            .template_from_str(template)
            .map_err(|e| TemplateError(e.to_string()))?;
        tmpl.render(ctx.to_template_context())
            .map_err(|e| TemplateError(e.to_string()))
    }

    /// Render every templated string inside a config value, recursing into
    /// objects and arrays. Non-template values pass through unchanged.
    pub fn render_config(&self, value: &Value, ctx: &RunContext) -> Result<Value, TemplateError> {
        match value {
            Value::String(s) if Self::is_template(s) => {
                let rendered = self.render_str(s, ctx)?;
                // Pure references to numbers/booleans/objects come back as
                // their JSON text; re-parse so ids stay numeric.
                Ok(serde_json::from_str(&rendered).unwrap_or(Value::String(rendered)))
            }
            Value::Object(obj) => {
                let mut out = serde_json::Map::with_capacity(obj.len());
                for (k, v) in obj {
                    out.insert(k.clone(), self.render_config(v, ctx)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|v| self.render_config(v, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Ok(value.clone()),
        }
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with_step_output() -> RunContext {
        let mut ctx = RunContext::new(json!({
            "is_webhook": true,
            "body": { "email": "lee@example.com", "amount": 1200 }
        }));
        ctx.insert_step_output(3, json!({ "task_id": 42, "title": "Call Lee" }));
        ctx
    }

    #[test]
    fn renders_trigger_reference() {
        let engine = TemplateEngine::new();
        let ctx = ctx_with_step_output();
        let out = engine
            .render_str("Invoice for {{ trigger.body.email }}", &ctx)
            .unwrap();
        assert_eq!(out, "Invoice for lee@example.com");
    }

    #[test]
    fn renders_step_output_reference_as_number() {
        let engine = TemplateEngine::new();
        let ctx = ctx_with_step_output();
        let config = json!({ "task_id": "{{ steps['3'].output.task_id }}" });
        let rendered = engine.render_config(&config, &ctx).unwrap();
        assert_eq!(rendered["task_id"], 42);
    }

    #[test]
    fn recurses_into_nested_config() {
        let engine = TemplateEngine::new();
        let ctx = ctx_with_step_output();
        let config = json!({
            "set": { "note": "re: {{ steps['3'].output.title }}" },
            "tags": ["{{ trigger.body.amount }}", "fixed"]
        });
        let rendered = engine.render_config(&config, &ctx).unwrap();
        assert_eq!(rendered["set"]["note"], "re: Call Lee");
        assert_eq!(rendered["tags"][0], 1200);
        assert_eq!(rendered["tags"][1], "fixed");
    }

    #[test]
    fn plain_values_pass_through() {
        let engine = TemplateEngine::new();
        let ctx = ctx_with_step_output();
        let config = json!({ "title": "No templates here", "count": 3, "flag": true });
        let rendered = engine.render_config(&config, &ctx).unwrap();
        assert_eq!(rendered, config);
    }

    #[test]
    fn missing_reference_is_an_error() {
        let engine = TemplateEngine::new();
        let ctx = ctx_with_step_output();
        let config = json!({ "task_id": "{{ steps['99'].output.task_id }}" });
        assert!(engine.render_config(&config, &ctx).is_err());
    }

    #[test]
    fn malformed_template_is_an_error() {
        let engine = TemplateEngine::new();
        let ctx = ctx_with_step_output();
        assert!(engine.render_str("{{ unclosed", &ctx).is_err());
    }
}
