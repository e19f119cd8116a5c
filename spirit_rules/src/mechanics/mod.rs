//! Game mechanics: miasma, merit, ghost lifecycle, obsession progress, option kinds.

use serde::{Deserialize, Serialize};

/// Ambient severity gauge. Ordered from calmest to most agitated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Miasma {
    Clear,
    #[default]
    Turbid,
    Boiling,
}

impl Miasma {
    /// One rung calmer. Clear stays clear.
    pub fn calmed(self) -> Self {
        match self {
            Miasma::Boiling => Miasma::Turbid,
            Miasma::Turbid | Miasma::Clear => Miasma::Clear,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Miasma::Clear => "clear",
            Miasma::Turbid => "turbid",
            Miasma::Boiling => "boiling",
        }
    }
}

/// Accumulated merit of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Merit {
    #[default]
    Low,
    Medium,
    High,
}

/// Lifecycle of a single spirit as seen by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GhostState {
    #[default]
    Unseen,
    Manifest,
    LostSelf,
    Communicating,
    Refusing,
    Silent,
    Resolved,
    /// Lingers only as an echo after its arc closed.
    Echo,
}

impl GhostState {
    pub fn as_str(self) -> &'static str {
        match self {
            GhostState::Unseen => "unseen",
            GhostState::Manifest => "manifest",
            GhostState::LostSelf => "lost-self",
            GhostState::Communicating => "communicating",
            GhostState::Refusing => "refusing",
            GhostState::Silent => "silent",
            GhostState::Resolved => "resolved",
            GhostState::Echo => "echo",
        }
    }

    /// Parse the persisted flag form. Unknown strings yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let state = match raw {
            "unseen" => GhostState::Unseen,
            "manifest" => GhostState::Manifest,
            "lost-self" => GhostState::LostSelf,
            "communicating" => GhostState::Communicating,
            "refusing" => GhostState::Refusing,
            "silent" => GhostState::Silent,
            "resolved" => GhostState::Resolved,
            "echo" => GhostState::Echo,
            _ => return None,
        };
        Some(state)
    }

    /// A spirit in this state needs no further communication.
    pub fn is_settled(self) -> bool {
        matches!(self, GhostState::Resolved | GhostState::Echo)
    }
}

/// Progress of one obsession (knot). Only ever moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ObsessionState {
    #[default]
    Unresolved,
    Loosened,
    Resolved,
}

impl ObsessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ObsessionState::Unresolved => "unresolved",
            ObsessionState::Loosened => "loosened",
            ObsessionState::Resolved => "resolved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "unresolved" => Some(ObsessionState::Unresolved),
            "loosened" => Some(ObsessionState::Loosened),
            "resolved" => Some(ObsessionState::Resolved),
            _ => None,
        }
    }

    /// Move toward `target` without ever regressing.
    pub fn advanced_to(self, target: ObsessionState) -> Self {
        self.max(target)
    }
}

/// What kind of thing the player says to a spirit. Also used as word-card tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionCategory {
    Comfort,
    Question,
    Exchange,
    Ritual,
    Accusation,
}

/// What an applied option does to the negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionEffect {
    /// Fully resolve the targeted obsessions.
    Untie,
    /// Advance the targeted obsessions to loosened.
    Loosen,
    /// Step miasma down one rung.
    Calm,
    /// Trade the required items to loosen the targets.
    Exchange,
    /// Anger the spirit. No state change.
    Provoke,
}

/// What a sacred item can be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemUse {
    Soothe,
    Petition,
    Testify,
    Awaken,
    Ritual,
}

/// Persuasion ladder for mediation with living NPCs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum MediationStage {
    #[default]
    Resisting,
    Hesitating,
    Willing,
    Committed,
}

impl MediationStage {
    pub const LADDER: [MediationStage; 4] = [
        MediationStage::Resisting,
        MediationStage::Hesitating,
        MediationStage::Willing,
        MediationStage::Committed,
    ];
}

/// Hint categories, in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HintKind {
    Clue,
    Action,
    Item,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miasma_calm_ladder() {
        assert_eq!(Miasma::Boiling.calmed(), Miasma::Turbid);
        assert_eq!(Miasma::Turbid.calmed(), Miasma::Clear);
        assert_eq!(Miasma::Clear.calmed(), Miasma::Clear);
    }

    #[test]
    fn test_obsession_never_regresses() {
        let resolved = ObsessionState::Resolved;
        assert_eq!(
            resolved.advanced_to(ObsessionState::Loosened),
            ObsessionState::Resolved
        );
        assert_eq!(
            ObsessionState::Unresolved.advanced_to(ObsessionState::Loosened),
            ObsessionState::Loosened
        );
    }

    #[test]
    fn test_ghost_state_round_trips_flag_form() {
        for state in [
            GhostState::Unseen,
            GhostState::LostSelf,
            GhostState::Refusing,
            GhostState::Echo,
        ] {
            assert_eq!(GhostState::parse(state.as_str()), Some(state));
        }
        assert_eq!(GhostState::parse("wandering"), None);
    }

    #[test]
    fn test_ghost_state_serde_matches_flag_form() {
        let value = serde_json::to_value(GhostState::LostSelf).unwrap();
        assert_eq!(value, serde_json::json!("lost-self"));
    }

    #[test]
    fn test_hint_kind_order() {
        assert!(HintKind::Clue < HintKind::Action);
        assert!(HintKind::Action < HintKind::Item);
    }
}
