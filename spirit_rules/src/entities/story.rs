//! Story scripts: nodes, steps and choice options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declares which step of a story hands off to a spirit's communication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryService {
    pub spirit_id: String,
    /// 1-based step position.
    pub trigger_line: i64,
}

/// What picking a choice option does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ChoiceAction {
    GotoLine { target_line_id: String },
    StartStory { story_id: String },
    CallGhostComm { spirit_id: String },
    CallMediation { npc_id: String },
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    #[serde(flatten)]
    pub action: ChoiceAction,
    /// Where to continue once a sub-flow started by this option returns.
    #[serde(default)]
    pub next_line_id: Option<String>,
}

/// One instruction of a story script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "t",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Step {
    Text {
        #[serde(default)]
        speaker: Option<String>,
        text: String,
        #[serde(default)]
        line_id: Option<String>,
        #[serde(default)]
        display_mode: Option<String>,
    },
    Choice {
        #[serde(default)]
        line_id: Option<String>,
        options: Vec<ChoiceOption>,
    },
    GiveItem {
        item_id: String,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        line_id: Option<String>,
    },
    UpdateFlag {
        flag: String,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        line_id: Option<String>,
    },
    CallGhostComm {
        spirit_id: String,
        #[serde(default)]
        line_id: Option<String>,
    },
    CallMediation {
        npc_id: String,
        #[serde(default)]
        line_id: Option<String>,
    },
    ScreenEffect {
        #[serde(default)]
        effect: Option<String>,
        #[serde(default)]
        line_id: Option<String>,
    },
    End {
        #[serde(default)]
        line_id: Option<String>,
    },
}

impl Step {
    pub fn line_id(&self) -> Option<&str> {
        match self {
            Step::Text { line_id, .. }
            | Step::Choice { line_id, .. }
            | Step::GiveItem { line_id, .. }
            | Step::UpdateFlag { line_id, .. }
            | Step::CallGhostComm { line_id, .. }
            | Step::CallMediation { line_id, .. }
            | Step::ScreenEffect { line_id, .. }
            | Step::End { line_id } => line_id.as_deref(),
        }
    }

    /// Wire name of the step kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Text { .. } => "TEXT",
            Step::Choice { .. } => "CHOICE",
            Step::GiveItem { .. } => "GIVE_ITEM",
            Step::UpdateFlag { .. } => "UPDATE_FLAG",
            Step::CallGhostComm { .. } => "CALL_GHOST_COMM",
            Step::CallMediation { .. } => "CALL_MEDIATION",
            Step::ScreenEffect { .. } => "SCREEN_EFFECT",
            Step::End { .. } => "END",
        }
    }

    /// Shorthand for a narrator line.
    pub fn text(text: impl Into<String>) -> Self {
        Step::Text {
            speaker: None,
            text: text.into(),
            line_id: None,
            display_mode: None,
        }
    }

    pub fn end() -> Self {
        Step::End { line_id: None }
    }
}

/// A single story branch bound to an anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryNode {
    pub id: String,
    pub anchor: String,
    #[serde(default)]
    pub service: Option<StoryService>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl StoryNode {
    pub fn new(id: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            anchor: anchor.into(),
            service: None,
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_service(mut self, spirit_id: impl Into<String>, trigger_line: i64) -> Self {
        self.service = Some(StoryService {
            spirit_id: spirit_id.into(),
            trigger_line,
        });
        self
    }

    /// Flag set once this story has been played to the end.
    pub fn completion_flag(&self) -> String {
        completion_flag(&self.id)
    }

    /// Step at a 1-based position.
    pub fn step_at_line(&self, line: i64) -> Option<&Step> {
        if line <= 0 {
            return None;
        }
        usize::try_from(line - 1)
            .ok()
            .and_then(|idx| self.steps.get(idx))
    }
}

pub fn completion_flag(story_id: &str) -> String {
    format!("story:{story_id}")
}
