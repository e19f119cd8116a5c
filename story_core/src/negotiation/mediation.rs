//! Mediation: talking a living person round on a spirit's behalf.

use spirit_rules::{MediationConfig, MediationStage, Npc, Spirit};

use crate::data::GameData;
use crate::error::{CoreError, DataError};
use crate::subflow::MediationOutcome;

/// Shown when the player sends nothing.
pub const EMPTY_MESSAGE_PROMPT: &str = "Say something first.";

/// Result of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediationTurn {
    /// Blank message; nothing changed.
    Rejected { prompt: &'static str },
    /// The message was heard. `delta` is how many rungs it earned.
    Heard { delta: usize, stage: MediationStage },
}

/// How many rungs a message earns.
///
/// Nothing for a message touching a negative keyword or the person's taboos,
/// nothing without an action keyword, otherwise one plus one more for a
/// trust keyword.
pub fn message_delta(config: &MediationConfig, taboos: &[String], message: &str) -> usize {
    let lowered = message.to_lowercase();
    let mentions = |words: &[String]| {
        words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .any(|w| !w.is_empty() && lowered.contains(&w))
    };

    if mentions(&config.negative_keywords) || mentions(taboos) {
        return 0;
    }
    if !mentions(&config.action_keywords) {
        return 0;
    }
    if mentions(&config.trust_keywords) {
        2
    } else {
        1
    }
}

pub struct MediationSession<'a> {
    npc: &'a Npc,
    spirit: Option<&'a Spirit>,
    config: &'a MediationConfig,
    flow: Vec<MediationStage>,
    position: usize,
    transcript: Vec<String>,
}

impl<'a> MediationSession<'a> {
    /// Open a mediation with a person from the loaded data.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingNpc`] or [`DataError::MissingSpirit`] for
    /// unknown ids.
    pub fn start(
        data: &'a GameData,
        npc_id: &str,
        spirit_id: Option<&str>,
        config: &'a MediationConfig,
    ) -> Result<Self, CoreError> {
        let npc = data
            .npc(npc_id)
            .ok_or_else(|| DataError::MissingNpc(npc_id.to_string()))?;
        let spirit = match spirit_id {
            Some(id) => Some(
                data.spirit(id)
                    .ok_or_else(|| DataError::MissingSpirit(id.to_string()))?,
            ),
            None => None,
        };
        Ok(Self::new(npc, spirit, config))
    }

    pub fn new(npc: &'a Npc, spirit: Option<&'a Spirit>, config: &'a MediationConfig) -> Self {
        Self {
            npc,
            spirit,
            config,
            flow: npc.stage_flow(),
            position: 0,
            transcript: Vec::new(),
        }
    }

    pub fn npc(&self) -> &Npc {
        self.npc
    }

    pub fn stage(&self) -> MediationStage {
        self.flow
            .get(self.position)
            .copied()
            .unwrap_or_default()
    }

    pub fn flow(&self) -> &[MediationStage] {
        &self.flow
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Whether the last rung of this person's ladder has been reached.
    pub fn at_last_stage(&self) -> bool {
        self.position + 1 >= self.flow.len()
    }

    pub fn say(&mut self, message: &str) -> MediationTurn {
        let message = message.trim();
        if message.is_empty() {
            return MediationTurn::Rejected {
                prompt: EMPTY_MESSAGE_PROMPT,
            };
        }

        let delta = message_delta(self.config, &self.npc.taboos, message);
        let last = self.flow.len().saturating_sub(1);
        self.position = (self.position + delta).min(last);
        self.transcript.push(message.to_string());
        log::debug!(
            "{} heard a message worth {delta}, now {:?}",
            self.npc.id,
            self.stage()
        );

        MediationTurn::Heard {
            delta,
            stage: self.stage(),
        }
    }

    /// Close the mediation.
    ///
    /// A person who ends committed settles every obsession of the spirit that
    /// names them in its conditions.
    pub fn finish(self) -> MediationOutcome {
        let stage = self.stage();
        let resolved_obsessions = match (stage, self.spirit) {
            (MediationStage::Committed, Some(spirit)) => spirit
                .obsessions
                .iter()
                .filter(|o| o.conditions.iter().any(|c| c.contains(&self.npc.id)))
                .map(|o| o.id.clone())
                .collect(),
            _ => Vec::new(),
        };

        MediationOutcome {
            npc_id: self.npc.id.clone(),
            stage,
            resolved_obsessions,
        }
    }
}
