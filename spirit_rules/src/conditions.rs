//! Condition mini-language used to gate anchors and describe obsessions.
//!
//! Grammar: `<kind>:<rest>`.
//! - `holds:<item>` (or `holds-item:<item>`) - the item is in the inventory
//! - `flag:<key>` - the flag is truthy
//! - `flag:<key>=<value>` - the flag equals the value, parsed as bool, number,
//!   JSON, then raw string
//!
//! A blank condition is vacuously true.

use serde_json::Value;

use crate::error::ConditionError;
use crate::world_state::{is_truthy, values_match, WorldState};

/// A parsed gating predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Item { key: String },
    Flag { key: String, expect: Option<Value> },
}

impl Condition {
    /// The predicate a blank condition string parses to.
    pub fn vacuous() -> Self {
        Condition::Flag {
            key: String::new(),
            expect: Some(Value::Bool(true)),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Condition::Item { key } | Condition::Flag { key, .. } => key,
        }
    }

    /// Evaluate against the world.
    pub fn evaluate(&self, world: &WorldState) -> bool {
        match self {
            Condition::Item { key } => world.has_item(key),
            Condition::Flag { key, .. } if key.is_empty() => true,
            Condition::Flag { key, expect } => {
                let actual = world.flag(key);
                match (actual, expect) {
                    (None, None) => false,
                    (Some(actual), None) => is_truthy(actual),
                    (None, Some(_)) => false,
                    (Some(actual), Some(expected)) => values_match(actual, expected),
                }
            }
        }
    }
}

/// Parse a condition string.
pub fn parse_condition(raw: &str) -> Result<Condition, ConditionError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(Condition::vacuous());
    }

    let (kind, rest) = match text.split_once(':') {
        Some((kind, rest)) => (kind.trim(), rest.trim()),
        None => (text, ""),
    };

    match kind {
        "holds" | "holds-item" => Ok(Condition::Item {
            key: rest.to_string(),
        }),
        "flag" => {
            let condition = match rest.split_once('=') {
                Some((key, expect)) => Condition::Flag {
                    key: key.trim().to_string(),
                    expect: Some(parse_expected_value(expect.trim())),
                },
                None => Condition::Flag {
                    key: rest.to_string(),
                    expect: None,
                },
            };
            Ok(condition)
        }
        _ => Err(ConditionError::UnknownKind {
            kind: kind.to_string(),
            raw: raw.to_string(),
        }),
    }
}

fn parse_expected_value(value: &str) -> Value {
    match value {
        "" | "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = value.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = value.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Evaluate a raw condition string. Parse failures are returned to the caller.
pub fn evaluate_condition(raw: &str, world: &WorldState) -> Result<bool, ConditionError> {
    Ok(parse_condition(raw)?.evaluate(world))
}

/// Evaluate a condition for gating: anything malformed counts as false.
pub fn condition_holds(raw: &str, world: &WorldState) -> bool {
    match evaluate_condition(raw, world) {
        Ok(result) => result,
        Err(err) => {
            log::warn!("gating condition failed closed: {err}");
            false
        }
    }
}

/// All conditions hold. An empty list holds.
pub fn all_conditions_hold<S: AsRef<str>>(conditions: &[S], world: &WorldState) -> bool {
    conditions
        .iter()
        .all(|c| condition_holds(c.as_ref(), world))
}
