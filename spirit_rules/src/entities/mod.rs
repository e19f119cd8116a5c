//! Entity definitions loaded from game data.

mod places;
mod spirit;
mod story;

pub use places::*;
pub use spirit::*;
pub use story::*;

use serde::{Deserialize, Serialize};

use crate::mechanics::{OptionCategory, OptionEffect};

/// One thing the player can say to a spirit during negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GhostOption {
    pub text: String,
    pub category: OptionCategory,
    /// Obsession ids this option acts on.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Item ids the player must hold for the option to take effect.
    #[serde(default)]
    pub requires: Vec<String>,
    pub effect: OptionEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl GhostOption {
    pub fn new(text: impl Into<String>, category: OptionCategory, effect: OptionEffect) -> Self {
        Self {
            text: text.into(),
            category,
            targets: Vec::new(),
            requires: Vec::new(),
            effect,
            hint: None,
        }
    }

    pub fn targeting(mut self, obsession_id: impl Into<String>) -> Self {
        self.targets.push(obsession_id.into());
        self
    }

    pub fn requiring(mut self, item_id: impl Into<String>) -> Self {
        self.requires.push(item_id.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// A generated round of options plus the spirit's tone.
///
/// Local and remote providers both produce this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GhostOptionSet {
    pub options: Vec<GhostOption>,
    pub tone: String,
}
