//! World state management - the single document every component reads and writes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::RulesError;
use crate::mechanics::{Merit, Miasma};

/// Schema version written into fresh worlds.
pub const WORLD_SCHEMA_VERSION: u32 = 1;

/// Where a new game starts.
pub const DEFAULT_LOCATION: &str = "harbour-clinic-alley";

/// The complete mutable state of the game world.
///
/// Flags are the open extension point: ghost states, obsession progress,
/// story completion markers, conversation counters and settings all live there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    pub location: String,
    pub miasma: Miasma,
    pub merit: Merit,
    #[serde(default)]
    pub companions: Vec<String>,
    /// Held item ids. Kept free of duplicates.
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub wordcards: Vec<String>,
    #[serde(default)]
    pub flags: BTreeMap<String, Value>,
    #[serde(default)]
    pub resolved_spirits: Vec<String>,
    #[serde(default)]
    pub dialogue_summary: Vec<String>,
    pub version: u32,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            miasma: Miasma::Turbid,
            merit: Merit::Low,
            companions: Vec::new(),
            items: Vec::new(),
            wordcards: Vec::new(),
            flags: BTreeMap::new(),
            resolved_spirits: Vec::new(),
            dialogue_summary: Vec::new(),
            version: WORLD_SCHEMA_VERSION,
        }
    }
}

/// Save payload wrapper: `{ "world": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldPayload {
    pub world: WorldState,
}

impl WorldState {
    /// Create a fresh world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a flag.
    pub fn flag(&self, key: &str) -> Option<&Value> {
        self.flags.get(key)
    }

    /// Read a flag as a string.
    pub fn flag_str(&self, key: &str) -> Option<&str> {
        self.flags.get(key).and_then(Value::as_str)
    }

    /// Check whether a flag is set to a truthy value.
    pub fn flag_is_set(&self, key: &str) -> bool {
        self.flags.get(key).is_some_and(is_truthy)
    }

    /// Set a flag, replacing any previous value.
    pub fn set_flag(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.flags.insert(key.into(), value.into());
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.items.iter().any(|i| i == item_id)
    }

    /// Grant an item. Returns false when it was already held.
    pub fn grant_item(&mut self, item_id: impl Into<String>) -> bool {
        push_unique(&mut self.items, item_id.into())
    }

    pub fn grant_wordcard(&mut self, card_id: impl Into<String>) -> bool {
        push_unique(&mut self.wordcards, card_id.into())
    }

    pub fn add_companion(&mut self, npc_id: impl Into<String>) -> bool {
        push_unique(&mut self.companions, npc_id.into())
    }

    pub fn is_spirit_resolved(&self, spirit_id: &str) -> bool {
        self.resolved_spirits.iter().any(|s| s == spirit_id)
    }

    /// Append a line to the dialogue summary log.
    pub fn record_summary(&mut self, line: impl Into<String>) {
        self.dialogue_summary.push(line.into());
    }

    /// Deep copy for persistence.
    pub fn snapshot(&self) -> WorldState {
        self.clone()
    }

    /// Replace the whole document with a deep copy of `snapshot`.
    pub fn restore(&mut self, snapshot: &WorldState) {
        *self = snapshot.clone();
    }

    /// Serialize as a save payload.
    pub fn to_payload_json(&self) -> Result<String, RulesError> {
        let payload = WorldPayload {
            world: self.snapshot(),
        };
        Ok(serde_json::to_string(&payload)?)
    }

    /// Parse a save payload.
    pub fn from_payload_json(raw: &str) -> Result<Self, RulesError> {
        let payload: WorldPayload = serde_json::from_str(raw)?;
        Ok(payload.world)
    }
}

fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}

/// JSON truthiness: null, false, 0, NaN and "" are false; everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strict equality with numbers compared by value (`2` equals `2.0`).
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}
