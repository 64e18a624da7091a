//! Conditional-logic evaluation for event filters and step conditions.
//!
//! Conditions are tagged operator nodes combined with `and`/`or`, evaluated
//! against a flat key-value context. Evaluation is a pure function with no
//! side effects.
//!
//! Unknown operator tags fail deserialization, and comparisons over
//! mismatched types evaluate to `false` -- conditions fail closed rather
//! than silently passing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// A condition tree over a flat key-value context.
///
/// Wire format uses an `op` tag, e.g.:
///
/// ```json
/// { "op": "and", "conditions": [
///     { "op": "equals", "field": "status", "value": "open" },
///     { "op": "greaterThan", "field": "value", "value": 1000 }
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Condition {
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    Contains { field: String, value: Value },
    GreaterThan { field: String, value: Value },
    LessThan { field: String, value: Value },
    Has { field: String },
    And { conditions: Vec<Condition> },
    Or { conditions: Vec<Condition> },
}

impl Condition {
    /// Deserialize a condition tree from a JSON value.
    ///
    /// Unknown operator tags are a validation error, not a silently-true
    /// condition.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Validation(format!("Invalid condition: {e}")))
    }

    /// Evaluate this condition against a flat key-value context.
    ///
    /// Fields absent from the context compare as JSON `null`.
    pub fn evaluate(&self, context: &serde_json::Map<String, Value>) -> bool {
        match self {
            Self::Equals { field, value } => json_eq(lookup(context, field), value),
            Self::NotEquals { field, value } => !json_eq(lookup(context, field), value),
            Self::Contains { field, value } => contains(lookup(context, field), value),
            Self::GreaterThan { field, value } => {
                numeric_cmp(lookup(context, field), value).is_some_and(|o| o.is_gt())
            }
            Self::LessThan { field, value } => {
                numeric_cmp(lookup(context, field), value).is_some_and(|o| o.is_lt())
            }
            Self::Has { field } => !lookup(context, field).is_null(),
            Self::And { conditions } => conditions.iter().all(|c| c.evaluate(context)),
            Self::Or { conditions } => conditions.iter().any(|c| c.evaluate(context)),
        }
    }
}

/// Look up a field in the context, treating absence as `null`.
fn lookup<'a>(context: &'a serde_json::Map<String, Value>, field: &str) -> &'a Value {
    context.get(field).unwrap_or(&Value::Null)
}

/// JSON equality with cross-representation numeric comparison
/// (`1` equals `1.0`).
fn json_eq(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l == r;
    }
    left == right
}

/// `contains` semantics: substring match for strings, element equality for
/// arrays. Any other haystack type evaluates false.
fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        Value::Array(items) => items.iter().any(|item| json_eq(item, needle)),
        _ => false,
    }
}

/// Compare two values numerically. Returns `None` when either side is not a
/// number, which callers treat as a failed comparison.
fn numeric_cmp(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    let l = left.as_f64()?;
    let r = right.as_f64()?;
    l.partial_cmp(&r)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
