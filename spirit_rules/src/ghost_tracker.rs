//! Per-spirit lifecycle, persisted in world flags.

use crate::entities::{Obsession, Spirit};
use crate::mechanics::{GhostState, ObsessionState};
use crate::world_state::WorldState;

/// Flag key holding a spirit's lifecycle state.
pub fn ghost_state_flag(spirit_id: &str) -> String {
    format!("spirit.{spirit_id}.state")
}

/// Flag key holding a spirit's conversation step counter.
pub fn conversation_step_flag(spirit_id: &str) -> String {
    format!("spirit.{spirit_id}.step")
}

/// Flag key holding an obsession's progress.
pub fn obsession_flag(obsession_id: &str) -> String {
    format!("obsession:{obsession_id}")
}

/// Reads and writes spirit lifecycle states on a world.
pub struct GhostTracker;

impl GhostTracker {
    /// Current state. Resolved spirits always report resolved; anything
    /// missing or unrecognised reports unseen.
    pub fn state(world: &WorldState, spirit_id: &str) -> GhostState {
        if spirit_id.is_empty() {
            return GhostState::Unseen;
        }
        if world.is_spirit_resolved(spirit_id) {
            return GhostState::Resolved;
        }
        world
            .flag_str(&ghost_state_flag(spirit_id))
            .and_then(GhostState::parse)
            .unwrap_or(GhostState::Unseen)
    }

    pub fn set_state(world: &mut WorldState, spirit_id: &str, state: GhostState) {
        if spirit_id.is_empty() {
            return;
        }
        world.set_flag(ghost_state_flag(spirit_id), state.as_str());
    }

    /// Put a spirit to rest. Safe to call repeatedly.
    pub fn mark_resolved(world: &mut WorldState, spirit_id: &str) {
        if spirit_id.is_empty() {
            return;
        }
        if !world.is_spirit_resolved(spirit_id) {
            log::info!("spirit {spirit_id} is at rest");
            world.resolved_spirits.push(spirit_id.to_string());
        }
        Self::set_state(world, spirit_id, GhostState::Resolved);
    }

    /// Persisted progress of an obsession, if any.
    pub fn obsession_state(world: &WorldState, obsession_id: &str) -> Option<ObsessionState> {
        world
            .flag_str(&obsession_flag(obsession_id))
            .and_then(ObsessionState::parse)
    }

    /// Persist obsession progress. Never moves a stored state backwards.
    pub fn advance_obsession(world: &mut WorldState, obsession_id: &str, target: ObsessionState) {
        let current = Self::obsession_state(world, obsession_id).unwrap_or_default();
        let next = current.advanced_to(target);
        if Some(next) != Self::obsession_state(world, obsession_id) {
            world.set_flag(obsession_flag(obsession_id), next.as_str());
        }
    }

    /// Resolved either in the authored data or in persisted progress.
    pub fn is_obsession_resolved(world: &WorldState, obsession: &Obsession) -> bool {
        obsession.state == ObsessionState::Resolved
            || Self::obsession_state(world, &obsession.id) == Some(ObsessionState::Resolved)
    }

    /// Every obsession of the spirit is resolved. False for spirits with none.
    pub fn obsessions_settled(world: &WorldState, spirit: &Spirit) -> bool {
        !spirit.obsessions.is_empty()
            && spirit
                .obsessions
                .iter()
                .all(|o| Self::is_obsession_resolved(world, o))
    }

    /// Conversation step counter for a spirit.
    pub fn conversation_step(world: &WorldState, spirit_id: &str) -> u64 {
        world
            .flag(&conversation_step_flag(spirit_id))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
    }

    /// Bump the conversation step counter and return the new value.
    pub fn bump_conversation_step(world: &mut WorldState, spirit_id: &str) -> u64 {
        let next = Self::conversation_step(world, spirit_id) + 1;
        world.set_flag(conversation_step_flag(spirit_id), next);
        next
    }
}
