//! Spirit definitions.

use serde::{Deserialize, Serialize};

use crate::mechanics::{GhostState, Miasma, ObsessionState};

/// A sub-goal ("knot") a spirit needs resolved before it can pass on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obsession {
    pub id: String,
    pub name: String,
    /// Ordered condition strings. The first one drives hint derivation.
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub state: ObsessionState,
}

impl Obsession {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            conditions: Vec::new(),
            state: ObsessionState::Unresolved,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn primary_condition(&self) -> &str {
        self.conditions.first().map(String::as_str).unwrap_or("")
    }
}

/// Spirits that need special handling before they will talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialKind {
    /// Has forgotten itself; only its key item wakes it.
    LostSelf,
    /// Refuses to talk when its trigger is touched.
    Refusing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialCase {
    pub kind: SpecialKind,
    #[serde(default)]
    pub key_item: Option<String>,
    #[serde(default)]
    pub key_person: Option<String>,
    #[serde(default)]
    pub refusal_trigger: Option<String>,
}

/// Fields that must be unique across all spirits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniquenessConstraint {
    pub unique_keys: Vec<String>,
}

/// A spirit bound to a place, with its obsessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spirit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub era: String,
    #[serde(default)]
    pub home_anchor: String,
    #[serde(default = "default_initial_state")]
    pub initial_state: GhostState,
    /// Miasma the spirit carries with it.
    #[serde(default)]
    pub miasma: Miasma,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub obsessions: Vec<Obsession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<SpecialCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<UniquenessConstraint>,
}

fn default_initial_state() -> GhostState {
    GhostState::Manifest
}

impl Spirit {
    /// Create a spirit with no obsessions.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            era: String::new(),
            home_anchor: String::new(),
            initial_state: GhostState::Manifest,
            miasma: Miasma::Turbid,
            background: String::new(),
            obsessions: Vec::new(),
            special: None,
            constraint: None,
        }
    }

    pub fn with_obsession(mut self, obsession: Obsession) -> Self {
        self.obsessions.push(obsession);
        self
    }

    pub fn with_special(mut self, special: SpecialCase) -> Self {
        self.special = Some(special);
        self
    }

    pub fn obsession(&self, id: &str) -> Option<&Obsession> {
        self.obsessions.iter().find(|o| o.id == id)
    }

    pub fn owns_obsession(&self, id: &str) -> bool {
        self.obsession(id).is_some()
    }

    pub fn key_person(&self) -> Option<&str> {
        self.special.as_ref().and_then(|s| s.key_person.as_deref())
    }

    pub fn key_item(&self) -> Option<&str> {
        self.special.as_ref().and_then(|s| s.key_item.as_deref())
    }

    pub fn is_kind(&self, kind: SpecialKind) -> bool {
        self.special.as_ref().is_some_and(|s| s.kind == kind)
    }

    /// Refusal trigger, only meaningful for refusing spirits.
    pub fn refusal_trigger(&self) -> Option<&str> {
        self.special
            .as_ref()
            .filter(|s| s.kind == SpecialKind::Refusing)
            .and_then(|s| s.refusal_trigger.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// Keys that identify this spirit for duplicate detection.
    pub fn unique_keys(&self) -> Vec<String> {
        match &self.constraint {
            Some(c) if !c.unique_keys.is_empty() => c.unique_keys.clone(),
            _ => vec!["id".to_string()],
        }
    }
}
