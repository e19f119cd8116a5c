//! Which anchors the player can reach and which stories can start there.

use std::collections::HashMap;

use spirit_rules::{all_conditions_hold, Anchor, StoryNode, WorldState};

use crate::services::{StoryServiceEntry, StoryServiceIndex};

/// An anchor the player can currently reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibleAnchor {
    pub anchor: Anchor,
    /// The spirit served here is already at rest.
    pub resolved: bool,
    pub service: Option<StoryServiceEntry>,
}

impl AccessibleAnchor {
    pub fn id(&self) -> &str {
        &self.anchor.id
    }
}

/// Resolves anchor accessibility and startable stories.
///
/// Remembers the last accessibility pass so story listings agree with the map.
#[derive(Debug, Default)]
pub struct SpawnResolver {
    index: StoryServiceIndex,
    accessible: HashMap<String, AccessibleAnchor>,
}

impl SpawnResolver {
    /// Create a resolver over the stories of one data load.
    pub fn new(stories: &[StoryNode]) -> Self {
        Self {
            index: StoryServiceIndex::build(stories),
            accessible: HashMap::new(),
        }
    }

    pub fn service_index(&self) -> &StoryServiceIndex {
        &self.index
    }

    /// Spirit bound to an anchor: the service index first, then the anchor's own binding.
    fn bound_spirit<'a>(&'a self, anchor: &'a Anchor) -> Option<&'a str> {
        self.index
            .for_anchor(&anchor.id)
            .map(|entry| entry.spirit_id.as_str())
            .or(anchor.service_spirit.as_deref())
    }

    /// Anchors the player can reach, in data order.
    ///
    /// An anchor is reachable when its bound spirit is at rest, or when every
    /// one of its conditions holds.
    pub fn list_accessible_anchors(
        &mut self,
        world: &WorldState,
        anchors: &[Anchor],
    ) -> Vec<AccessibleAnchor> {
        self.accessible.clear();
        let mut result = Vec::new();

        for anchor in anchors {
            let resolved = self
                .bound_spirit(anchor)
                .is_some_and(|spirit_id| world.is_spirit_resolved(spirit_id));
            if !resolved && !all_conditions_hold(&anchor.conditions, world) {
                continue;
            }

            let entry = AccessibleAnchor {
                anchor: anchor.clone(),
                resolved,
                service: self.index.for_anchor(&anchor.id).cloned(),
            };
            self.accessible.insert(anchor.id.clone(), entry.clone());
            result.push(entry);
        }

        log::debug!("{} of {} anchors accessible", result.len(), anchors.len());
        result
    }

    /// Stories that can start at `anchor_id`.
    ///
    /// Empty unless the anchor was accessible in the last pass and its spirit
    /// is not yet at rest. Finished stories are excluded.
    pub fn list_startable_stories<'a>(
        &self,
        world: &WorldState,
        stories: &'a [StoryNode],
        anchor_id: &str,
    ) -> Vec<&'a StoryNode> {
        match self.accessible.get(anchor_id) {
            Some(anchor) if !anchor.resolved => stories
                .iter()
                .filter(|story| story.anchor == anchor_id)
                .filter(|story| !world.flag_is_set(&story.completion_flag()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Echo script of a resolved anchor, if it has one.
    pub fn echo_script(&self, anchor_id: &str) -> Option<&str> {
        self.accessible
            .get(anchor_id)
            .filter(|a| a.resolved)
            .and_then(|a| a.anchor.echo_script())
    }
}
