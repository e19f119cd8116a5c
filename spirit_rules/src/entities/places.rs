//! Places, people and props: anchors, maps, NPCs, sacred items and word cards.

use serde::{Deserialize, Serialize};

use crate::mechanics::{ItemUse, MediationStage, OptionCategory};

/// What an anchor shows once its spirit is at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AfterCompletion {
    #[serde(default)]
    pub decoration: Option<String>,
    /// Story id played as an echo on later visits.
    #[serde(default)]
    pub echo_script: Option<String>,
}

/// A map location gated by conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub id: String,
    pub location: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub map_id: Option<String>,
    /// Spirit whose arc this anchor serves.
    #[serde(default)]
    pub service_spirit: Option<String>,
    #[serde(default)]
    pub after_completion: Option<AfterCompletion>,
}

impl Anchor {
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            conditions: Vec::new(),
            map_id: None,
            service_spirit: None,
            after_completion: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn echo_script(&self) -> Option<&str> {
        self.after_completion
            .as_ref()
            .and_then(|a| a.echo_script.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDef {
    pub id: String,
    pub image: String,
}

/// A living person who can be talked round in mediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub traits: Vec<String>,
    /// Topics that shut the conversation down.
    #[serde(default)]
    pub taboos: Vec<String>,
    /// Declared persuasion stages. Unknown entries are ignored.
    #[serde(default)]
    pub stages: Vec<String>,
    #[serde(default)]
    pub persuasion_points: Vec<String>,
    #[serde(default)]
    pub arrival_conditions: Vec<String>,
}

impl Npc {
    /// The stage ladder this NPC walks, falling back to the full default ladder.
    pub fn stage_flow(&self) -> Vec<MediationStage> {
        let declared: Vec<MediationStage> = self
            .stages
            .iter()
            .filter_map(|s| {
                serde_json::from_value(serde_json::Value::String(s.trim().to_string())).ok()
            })
            .collect();
        if declared.is_empty() {
            MediationStage::LADDER.to_vec()
        } else {
            declared
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SacredItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub uses: Vec<ItemUse>,
    #[serde(default)]
    pub hook: Option<String>,
}

/// A word the player can put in front of a spirit to steer the options offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCard {
    pub id: String,
    pub word: String,
    #[serde(default)]
    pub tags: Vec<OptionCategory>,
    #[serde(default)]
    pub note: Option<String>,
}
