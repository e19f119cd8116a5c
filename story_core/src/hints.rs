//! Player-facing hints derived from flags and unresolved obsessions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use spirit_rules::{Anchor, GhostTracker, HintKind, ObsessionState, Spirit, WorldState};

/// Substrings that mark an obsession as needing an offering or object.
pub const OFFERING_KEYWORDS: [&str; 8] = [
    "offering", "lamp", "wick", "incense", "rice", "rite", "item", "well",
];

const FALLBACK_LOCATION: &str = "the place it haunts";

static PERSON_CONDITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^person:[^\s:]+:?(.+)?$").expect("valid person pattern"));
static NPC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"npc_[^\s:]+").expect("valid npc token pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub id: String,
    pub text: String,
    pub kind: HintKind,
}

/// Gather hints for the current world, sorted by kind then id.
pub fn gather_hints(world: &WorldState, spirits: &[Spirit], anchors: &[Anchor]) -> Vec<Hint> {
    let mut seen = HashSet::new();
    let mut hints = collect_flag_hints(&world.flags, &mut seen);

    for spirit in spirits {
        let location = spirit_location(spirit, anchors);
        for obsession in &spirit.obsessions {
            if obsession.id.is_empty() {
                continue;
            }
            let key = format!("obsession:{}", obsession.id);
            let stored = GhostTracker::obsession_state(world, &obsession.id);
            if stored == Some(ObsessionState::Resolved)
                || obsession.state == ObsessionState::Resolved
            {
                continue;
            }
            if !seen.insert(key.clone()) {
                continue;
            }
            let (text, kind) = obsession_hint(
                &spirit.name,
                location,
                &obsession.name,
                obsession.primary_condition(),
            );
            hints.push(Hint { id: key, text, kind });
        }
    }

    hints.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.id.cmp(&b.id)));
    hints
}

fn collect_flag_hints(
    flags: &BTreeMap<String, serde_json::Value>,
    seen: &mut HashSet<String>,
) -> Vec<Hint> {
    let mut hints = Vec::new();
    for (key, value) in flags {
        let Some(text) = value.as_str().map(str::trim) else {
            continue;
        };
        if text.is_empty() || !is_hint_key(key) || !seen.insert(key.clone()) {
            continue;
        }
        hints.push(Hint {
            id: key.clone(),
            text: text.to_string(),
            kind: HintKind::Clue,
        });
    }
    hints
}

fn is_hint_key(key: &str) -> bool {
    key.starts_with("hint:")
        || key.starts_with("ghost.hint")
        || key.starts_with("ghostHint:")
        || key.contains(".hint")
}

fn spirit_location<'a>(spirit: &Spirit, anchors: &'a [Anchor]) -> &'a str {
    anchors
        .iter()
        .find(|a| a.service_spirit.as_deref() == Some(spirit.id.as_str()))
        .or_else(|| anchors.iter().find(|a| a.id == spirit.home_anchor))
        .map(|a| a.location.as_str())
        .unwrap_or(FALLBACK_LOCATION)
}

fn obsession_hint(
    spirit_name: &str,
    location: &str,
    obsession_name: &str,
    condition: &str,
) -> (String, HintKind) {
    let condition = condition.trim();

    if let Some(action) = key_person_action(condition) {
        let action = if action.is_empty() {
            format!("talk about \"{obsession_name}\"")
        } else {
            action
        };
        let text = format!("Go to {location} and find this spirit's key person: \"{action}\".");
        return (text, HintKind::Action);
    }

    let target = match target_of(condition) {
        t if t.is_empty() => obsession_name.to_string(),
        t => t,
    };
    let kind = if is_offering(condition, obsession_name) {
        HintKind::Item
    } else {
        HintKind::Action
    };
    let text = format!("Search {location} for \"{target}\"; it may help {spirit_name}.");
    (text, kind)
}

/// Trailing action text when the condition points at a key person.
fn key_person_action(condition: &str) -> Option<String> {
    if condition.is_empty() {
        return None;
    }
    if let Some(caps) = PERSON_CONDITION.captures(condition) {
        let action = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        return Some(action.to_string());
    }
    if NPC_TOKEN.is_match(condition) {
        let tail = NPC_TOKEN.split(condition).last().unwrap_or("");
        return Some(tail.trim().trim_start_matches(':').trim().to_string());
    }
    None
}

/// Text after the last colon, or the whole condition.
fn target_of(condition: &str) -> String {
    match condition.rsplit_once(':') {
        Some((_, tail)) if !tail.trim().is_empty() => tail.trim().to_string(),
        _ => condition.to_string(),
    }
}

fn is_offering(condition: &str, obsession_name: &str) -> bool {
    let condition = condition.to_lowercase();
    let name = obsession_name.to_lowercase();
    OFFERING_KEYWORDS
        .iter()
        .any(|kw| condition.contains(kw) || name.contains(kw))
}
