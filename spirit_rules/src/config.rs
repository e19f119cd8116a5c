//! Engine configuration and player settings.
//!
//! Everything has a default; a TOML document only needs to name what it overrides:
//!
//! ```toml
//! [settings]
//! text_speed = 30
//! offline_mode = true
//!
//! [negotiation]
//! max_options = 3
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RulesError;
use crate::world_state::WorldState;

pub const DEFAULT_TEXT_SPEED: u32 = 18;
pub const MIN_TEXT_SPEED: u32 = 6;
pub const MAX_TEXT_SPEED: u32 = 80;

/// Flag mirroring the offline setting into the world.
pub const OFFLINE_FLAG: &str = "offline";

/// Player-facing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Characters per second for text reveal.
    #[serde(alias = "textSpeed")]
    pub text_speed: u32,
    #[serde(alias = "softenLanguage")]
    pub soften_language: bool,
    /// Never call the remote option provider.
    #[serde(alias = "offlineMode")]
    pub offline_mode: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            text_speed: DEFAULT_TEXT_SPEED,
            soften_language: false,
            offline_mode: false,
        }
    }
}

impl GameSettings {
    /// Set the text speed, clamped to the supported range. Returns true on change.
    pub fn set_text_speed(&mut self, speed: u32) -> bool {
        let clamped = speed.clamp(MIN_TEXT_SPEED, MAX_TEXT_SPEED);
        let changed = clamped != self.text_speed;
        self.text_speed = clamped;
        changed
    }

    /// Force loaded values back into range.
    pub fn sanitized(mut self) -> Self {
        self.text_speed = self.text_speed.clamp(MIN_TEXT_SPEED, MAX_TEXT_SPEED);
        self
    }

    /// Mirror settings that story logic can read into world flags.
    pub fn apply_world_flags(&self, world: &mut WorldState) {
        world.set_flag(OFFLINE_FLAG, self.offline_mode);
    }
}

/// Tunables for the ghost negotiation mini-game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Upper bound on options offered per round.
    pub max_options: usize,
    /// Consecutive identical accusations that make a spirit fall silent.
    pub refusal_repeats: u32,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_options: 4,
            refusal_repeats: 2,
        }
    }
}

/// Keyword lists that drive mediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediationConfig {
    /// Any of these stalls the conversation.
    pub negative_keywords: Vec<String>,
    /// At least one is needed for progress.
    pub action_keywords: Vec<String>,
    /// Each message containing one of these earns an extra step.
    pub trust_keywords: Vec<String>,
}

impl Default for MediationConfig {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|w| (*w).to_string()).collect()
        }
        Self {
            negative_keywords: words(&["stupid", "stingy", "miser", "hate"]),
            action_keywords: words(&[
                "tonight", "tomorrow", "buy", "together", "prepare", "arrange", "try",
            ]),
            trust_keywords: words(&[
                "between us",
                "save face",
                "keep it quiet",
                "cover for you",
            ]),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub settings: GameSettings,
    pub negotiation: NegotiationConfig,
    pub mediation: MediationConfig,
}

impl EngineConfig {
    /// Load from a TOML document. Missing sections keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, RulesError> {
        let mut config: EngineConfig = toml::from_str(raw)?;
        config.settings = config.settings.sanitized();
        if config.negotiation.max_options == 0 {
            log::warn!("max_options of 0 would offer nothing; using 1");
            config.negotiation.max_options = 1;
        }
        Ok(config)
    }
}
