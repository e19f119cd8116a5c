//! Story-service index: which story serves which spirit at which anchor.

use std::collections::HashMap;

use spirit_rules::{ChoiceAction, Step, StoryNode};

/// A validated service binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryServiceEntry {
    pub story_id: String,
    pub anchor_id: String,
    pub spirit_id: String,
    pub trigger_line: i64,
}

/// Why a declared service binding was not indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingProblem {
    /// The binding names no spirit.
    NoSpirit,
    /// The trigger line is outside the step list.
    LineOutOfRange(i64),
    /// The trigger step does not call the declared spirit.
    NotAGhostCall { step_kind: &'static str },
}

impl std::fmt::Display for BindingProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingProblem::NoSpirit => write!(f, "binding names no spirit"),
            BindingProblem::LineOutOfRange(line) => {
                write!(f, "trigger line {line} is outside the script")
            }
            BindingProblem::NotAGhostCall { step_kind } => {
                write!(f, "trigger step {step_kind} does not call the bound spirit")
            }
        }
    }
}

/// Check a story's declared service binding.
///
/// Returns `Ok(None)` for stories that declare no binding.
pub fn validate_binding(story: &StoryNode) -> Result<Option<StoryServiceEntry>, BindingProblem> {
    let Some(service) = &story.service else {
        return Ok(None);
    };
    if service.spirit_id.is_empty() {
        return Err(BindingProblem::NoSpirit);
    }
    let step = story
        .step_at_line(service.trigger_line)
        .ok_or(BindingProblem::LineOutOfRange(service.trigger_line))?;

    let calls_spirit = match step {
        Step::CallGhostComm { spirit_id, .. } => *spirit_id == service.spirit_id,
        Step::Choice { options, .. } => options.iter().any(|option| {
            matches!(
                &option.action,
                ChoiceAction::CallGhostComm { spirit_id } if *spirit_id == service.spirit_id
            )
        }),
        _ => false,
    };
    if !calls_spirit {
        return Err(BindingProblem::NotAGhostCall {
            step_kind: step.kind(),
        });
    }

    Ok(Some(StoryServiceEntry {
        story_id: story.id.clone(),
        anchor_id: story.anchor.clone(),
        spirit_id: service.spirit_id.clone(),
        trigger_line: service.trigger_line,
    }))
}

/// Lookup of valid service bindings by anchor and by spirit.
///
/// Built once per data load. Invalid bindings are left out rather than
/// failing the load; the first binding per anchor and per spirit wins.
#[derive(Debug, Clone, Default)]
pub struct StoryServiceIndex {
    by_anchor: HashMap<String, StoryServiceEntry>,
    by_spirit: HashMap<String, StoryServiceEntry>,
}

impl StoryServiceIndex {
    pub fn build(stories: &[StoryNode]) -> Self {
        let mut index = Self::default();
        for story in stories {
            let entry = match validate_binding(story) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(problem) => {
                    log::debug!("story {} service binding skipped: {problem}", story.id);
                    continue;
                }
            };
            index
                .by_anchor
                .entry(entry.anchor_id.clone())
                .or_insert_with(|| entry.clone());
            index.by_spirit.entry(entry.spirit_id.clone()).or_insert(entry);
        }
        index
    }

    pub fn for_anchor(&self, anchor_id: &str) -> Option<&StoryServiceEntry> {
        self.by_anchor.get(anchor_id)
    }

    pub fn for_spirit(&self, spirit_id: &str) -> Option<&StoryServiceEntry> {
        self.by_spirit.get(spirit_id)
    }

    pub fn len(&self) -> usize {
        self.by_anchor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_anchor.is_empty()
    }
}
