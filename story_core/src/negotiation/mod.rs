//! Ghost negotiation: the turn-based talk with a single spirit.
//!
//! A session applies one chosen option per turn to the world. Obsession
//! progress only moves forward and is persisted in `obsession:<id>` flags, so a
//! reloaded game resumes where it left off. Miasma only ever calms down here.

pub mod mediation;
pub mod options;

pub use mediation::*;
pub use options::*;

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use spirit_rules::{
    ghost_state_flag, obsession_flag, GhostOption, GhostOptionSet, GhostState, GhostTracker,
    NegotiationConfig, ObsessionState, OptionCategory, OptionEffect, SeededRng, SpecialKind,
    Spirit, WordCard, WorldState, OFFLINE_FLAG,
};

use crate::data::GameData;
use crate::error::{CoreError, DataError};
use crate::subflow::GhostCommOutcome;

/// Where a negotiation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// Every obsession was untied.
    Resolved,
    /// The spirit's refusal trigger was touched.
    Refused,
    /// The same accusation was repeated until the spirit fell silent.
    Silenced,
}

impl SessionStatus {
    pub fn is_open(self) -> bool {
        self == SessionStatus::Active
    }
}

/// Result of one applied option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// The player lacks required items. Nothing changed.
    Blocked { missing: Vec<String> },
    /// The option was spoken. `advanced` lists obsessions that moved forward.
    Applied {
        advanced: Vec<String>,
        status: SessionStatus,
    },
}

/// Seed string for the next round of options.
///
/// Built from the spirit id, its conversation step counter and a sorted
/// snapshot of the spirit's state flag and obsession flags.
pub fn negotiation_seed(world: &WorldState, spirit: &Spirit) -> String {
    let step = GhostTracker::conversation_step(world, &spirit.id);
    let mut keys: Vec<String> = spirit
        .obsessions
        .iter()
        .map(|o| obsession_flag(&o.id))
        .collect();
    keys.push(ghost_state_flag(&spirit.id));
    keys.sort();
    keys.dedup();

    let snapshot: Vec<String> = keys
        .iter()
        .map(|key| {
            let value = world.flag(key).map(Value::to_string).unwrap_or_default();
            format!("{key}={value}")
        })
        .collect();
    format!("{}|{}|{}", spirit.id, step, snapshot.join(","))
}

pub struct NegotiationSession<'a> {
    world: &'a mut WorldState,
    spirit: &'a Spirit,
    config: NegotiationConfig,
    progress: BTreeMap<String, ObsessionState>,
    last_accusation: Option<BTreeSet<String>>,
    accusation_repeats: u32,
    awake: bool,
    status: SessionStatus,
    mediator: Option<String>,
}

impl<'a> NegotiationSession<'a> {
    /// Open a session with a spirit from the loaded data.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingSpirit`] for unknown ids.
    pub fn start(
        world: &'a mut WorldState,
        data: &'a GameData,
        spirit_id: &str,
        config: NegotiationConfig,
    ) -> Result<Self, CoreError> {
        let spirit = data
            .spirit(spirit_id)
            .ok_or_else(|| DataError::MissingSpirit(spirit_id.to_string()))?;
        Ok(Self::new(world, spirit, config))
    }

    pub fn new(world: &'a mut WorldState, spirit: &'a Spirit, config: NegotiationConfig) -> Self {
        let progress = spirit
            .obsessions
            .iter()
            .map(|o| {
                let stored = GhostTracker::obsession_state(&*world, &o.id).unwrap_or_default();
                (o.id.clone(), o.state.advanced_to(stored))
            })
            .collect();

        let current = GhostTracker::state(&*world, &spirit.id);
        let awake = !spirit.is_kind(SpecialKind::LostSelf) || current == GhostState::Communicating;
        if !current.is_settled() {
            let state = if awake {
                GhostState::Communicating
            } else {
                GhostState::LostSelf
            };
            GhostTracker::set_state(world, &spirit.id, state);
        }
        log::debug!("negotiation with {} opened", spirit.id);

        Self {
            world,
            spirit,
            config,
            progress,
            last_accusation: None,
            accusation_repeats: 0,
            awake,
            status: SessionStatus::Active,
            mediator: None,
        }
    }

    pub fn spirit(&self) -> &Spirit {
        self.spirit
    }

    pub fn world(&self) -> &WorldState {
        &*self.world
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn mediator(&self) -> Option<&str> {
        self.mediator.as_deref()
    }

    pub fn obsession_state(&self, obsession_id: &str) -> Option<ObsessionState> {
        self.progress.get(obsession_id).copied()
    }

    pub fn accusation_repeats(&self) -> u32 {
        self.accusation_repeats
    }

    pub fn seed(&self) -> String {
        negotiation_seed(&*self.world, self.spirit)
    }

    pub fn rng(&self) -> SeededRng {
        SeededRng::from_seed_str(&self.seed())
    }

    /// Context handed to option providers for the next round.
    pub fn request<'s>(&'s self, word_card: Option<&'s WordCard>) -> OptionRequest<'s> {
        let obsessions = self
            .spirit
            .obsessions
            .iter()
            .map(|o| ObsessionProgress {
                id: &o.id,
                name: &o.name,
                condition: o.primary_condition(),
                state: self.progress.get(&o.id).copied().unwrap_or_default(),
            })
            .collect();
        OptionRequest {
            spirit: self.spirit,
            obsessions,
            word_card,
            miasma: self.world.miasma,
            items: &self.world.items,
            awake: self.awake,
            seed: self.seed(),
            max_options: self.config.max_options,
            offline: self.world.flag_is_set(OFFLINE_FLAG),
        }
    }

    /// Generate the next round of options.
    pub fn offer(
        &self,
        director: &mut OptionDirector,
        word_card: Option<&WordCard>,
    ) -> GhostOptionSet {
        director.generate(&self.request(word_card))
    }

    /// Apply one chosen option.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionClosed`] once the session has ended.
    pub fn apply(&mut self, option: &GhostOption) -> Result<Turn, CoreError> {
        if !self.status.is_open() {
            return Err(CoreError::SessionClosed(self.spirit.id.clone()));
        }

        let missing: Vec<String> = option
            .requires
            .iter()
            .filter(|item| !self.world.has_item(item))
            .cloned()
            .collect();
        if !missing.is_empty() {
            log::debug!("option blocked, missing {}", missing.join(", "));
            return Ok(Turn::Blocked { missing });
        }

        GhostTracker::bump_conversation_step(self.world, &self.spirit.id);

        if let Some(trigger) = self.spirit.refusal_trigger() {
            if option.text.contains(trigger) {
                self.end_early(GhostState::Refusing, SessionStatus::Refused);
                return Ok(self.applied(Vec::new()));
            }
        }

        if self.track_accusation(option) >= self.config.refusal_repeats {
            self.end_early(GhostState::Silent, SessionStatus::Silenced);
            return Ok(self.applied(Vec::new()));
        }

        if !self.awake {
            if self.holds_key_item(option) {
                log::info!("spirit {} remembers itself", self.spirit.id);
                self.awake = true;
                GhostTracker::set_state(self.world, &self.spirit.id, GhostState::Communicating);
            } else if option.effect != OptionEffect::Calm {
                return Ok(self.applied(Vec::new()));
            }
        }

        let advanced = match option.effect {
            OptionEffect::Calm => {
                self.world.miasma = self.world.miasma.calmed();
                Vec::new()
            }
            OptionEffect::Loosen | OptionEffect::Exchange => {
                self.advance(&option.targets, ObsessionState::Loosened)
            }
            OptionEffect::Untie => self.advance(&option.targets, ObsessionState::Resolved),
            OptionEffect::Provoke => Vec::new(),
        };

        if option.effect == OptionEffect::Untie && self.all_resolved() {
            log::info!("every obsession of {} is untied", self.spirit.id);
            self.status = SessionStatus::Resolved;
        }
        Ok(self.applied(advanced))
    }

    /// Close the session and report what it achieved.
    pub fn finish(self) -> GhostCommOutcome {
        let resolved_obsessions: Vec<String> = self
            .spirit
            .obsessions
            .iter()
            .filter(|o| self.progress.get(&o.id) == Some(&ObsessionState::Resolved))
            .map(|o| o.id.clone())
            .collect();

        self.world.record_summary(format!(
            "{}: {}/{} obsessions resolved, miasma {}",
            self.spirit.name,
            resolved_obsessions.len(),
            self.spirit.obsessions.len(),
            self.world.miasma.as_str()
        ));

        GhostCommOutcome {
            resolved_obsessions,
            miasma: self.world.miasma,
            mediator: self.mediator,
        }
    }

    fn applied(&self, advanced: Vec<String>) -> Turn {
        Turn::Applied {
            advanced,
            status: self.status,
        }
    }

    /// Repeat count of the current accusation, zero for anything else.
    fn track_accusation(&mut self, option: &GhostOption) -> u32 {
        if option.category != OptionCategory::Accusation {
            self.last_accusation = None;
            self.accusation_repeats = 0;
            return 0;
        }
        let targets: BTreeSet<String> = option.targets.iter().cloned().collect();
        if self.last_accusation.as_ref() == Some(&targets) {
            self.accusation_repeats += 1;
        } else {
            self.accusation_repeats = 1;
            self.last_accusation = Some(targets);
        }
        self.accusation_repeats
    }

    fn end_early(&mut self, state: GhostState, status: SessionStatus) {
        log::info!("spirit {} ends the talk: {}", self.spirit.id, state.as_str());
        GhostTracker::set_state(self.world, &self.spirit.id, state);
        self.status = status;
        self.mediator = self.spirit.key_person().map(str::to_string);
    }

    fn holds_key_item(&self, option: &GhostOption) -> bool {
        self.spirit
            .key_item()
            .is_some_and(|key| option.requires.iter().any(|item| item == key))
    }

    fn advance(&mut self, targets: &[String], target: ObsessionState) -> Vec<String> {
        let mut advanced = Vec::new();
        for id in targets {
            let Some(current) = self.progress.get(id).copied() else {
                log::debug!("{} has no obsession {id}", self.spirit.id);
                continue;
            };
            let next = current.advanced_to(target);
            if next != current {
                self.progress.insert(id.clone(), next);
                GhostTracker::advance_obsession(self.world, id, next);
                advanced.push(id.clone());
            }
        }
        advanced
    }

    fn all_resolved(&self) -> bool {
        !self.progress.is_empty()
            && self
                .progress
                .values()
                .all(|state| *state == ObsessionState::Resolved)
    }
}
