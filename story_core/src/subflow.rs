//! Suspension points of the interpreter.
//!
//! A story hands control to the presentation layer whenever the player must
//! read, choose or play a mini-game. The layer answers exactly once per request.

use serde::{Deserialize, Serialize};

use spirit_rules::{ChoiceOption, MediationStage, Miasma, WorldState};

use crate::error::SubFlowError;

/// What the interpreter is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub enum SubFlowRequest<'s> {
    /// Show a line and wait for it to be dismissed.
    Text {
        speaker: Option<&'s str>,
        text: &'s str,
        display_mode: Option<&'s str>,
    },
    /// Offer a branch; the answer is the picked index.
    Choice { options: &'s [ChoiceOption] },
    /// Run a negotiation with a spirit.
    GhostComm { spirit_id: &'s str },
    /// Run a mediation with a living person, optionally on a spirit's behalf.
    Mediation {
        npc_id: &'s str,
        spirit_id: Option<&'s str>,
    },
}

impl SubFlowRequest<'_> {
    /// Stable key used in logs and errors.
    pub fn key(&self) -> String {
        match self {
            SubFlowRequest::Text { .. } => "text".to_string(),
            SubFlowRequest::Choice { .. } => "choice".to_string(),
            SubFlowRequest::GhostComm { spirit_id } => format!("ghost-comm:{spirit_id}"),
            SubFlowRequest::Mediation { npc_id, .. } => format!("mediation:{npc_id}"),
        }
    }
}

/// Result of a finished negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostCommOutcome {
    pub resolved_obsessions: Vec<String>,
    pub miasma: Miasma,
    /// Set when the spirit will only move once this person is talked round.
    #[serde(default)]
    pub mediator: Option<String>,
}

/// Result of a finished mediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediationOutcome {
    pub npc_id: String,
    pub stage: MediationStage,
    #[serde(default)]
    pub resolved_obsessions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubFlowResponse {
    Acknowledged,
    Picked(usize),
    GhostComm(GhostCommOutcome),
    Mediation(MediationOutcome),
}

/// Fire-and-forget notices. Nothing waits on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ItemGranted {
        item_id: String,
        message: Option<String>,
    },
    ScreenEffect(String),
}

/// The presentation layer as seen from the interpreter.
pub trait SubFlowInvoker {
    /// Run a sub-flow to completion.
    ///
    /// The world is lent for the duration so mini-games can apply their own
    /// state changes before answering.
    fn push(
        &mut self,
        request: SubFlowRequest<'_>,
        world: &mut WorldState,
    ) -> Result<SubFlowResponse, SubFlowError>;

    fn notify(&mut self, _notice: Notice) {}
}
