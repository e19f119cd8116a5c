//! Story script interpreter.
//!
//! Walks a story's steps against the world, hands suspension points to the
//! [`SubFlowInvoker`], and folds sub-flow results back into world state.
//! Authoring slips (bad jumps, duplicate line ids, unknown nested stories) are
//! reported as [`Diagnostic`]s and never stop a story.

mod line_index;

pub use line_index::LineIndex;

use std::collections::BTreeSet;
use std::fmt;

use spirit_rules::{
    ChoiceAction, ChoiceOption, GhostTracker, ObsessionState, Spirit, Step, StoryNode, WorldState,
};

use crate::data::GameData;
use crate::error::{CoreError, DataError, SubFlowError};
use crate::subflow::{Notice, SubFlowInvoker, SubFlowRequest, SubFlowResponse};

/// How many stories may be nested inside each other, counting the outermost.
pub const MAX_STORY_DEPTH: usize = 8;

/// Everything a running story reads and writes.
pub struct EngineContext<'a> {
    pub world: &'a mut WorldState,
    pub data: &'a GameData,
    pub invoker: &'a mut dyn SubFlowInvoker,
}

impl<'a> EngineContext<'a> {
    pub fn new(
        world: &'a mut WorldState,
        data: &'a GameData,
        invoker: &'a mut dyn SubFlowInvoker,
    ) -> Self {
        Self {
            world,
            data,
            invoker,
        }
    }
}

/// A recoverable problem met while running a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    DuplicateLine {
        story_id: String,
        line_id: String,
        position: usize,
    },
    MissingJumpTarget {
        story_id: String,
        line_id: String,
    },
    InvalidChoice {
        story_id: String,
        picked: Option<usize>,
        available: usize,
    },
    SubFlowFailed {
        story_id: String,
        error: SubFlowError,
    },
    MissingStory {
        story_id: String,
        target: String,
    },
    NestingTooDeep {
        story_id: String,
        target: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateLine {
                story_id,
                line_id,
                position,
            } => write!(
                f,
                "{story_id}: line id `{line_id}` repeated at step {position}; first one wins"
            ),
            Diagnostic::MissingJumpTarget { story_id, line_id } => {
                write!(f, "{story_id}: no line `{line_id}`; continuing in order")
            }
            Diagnostic::InvalidChoice {
                story_id,
                picked: Some(picked),
                available,
            } => write!(
                f,
                "{story_id}: choice {picked} picked out of {available} options"
            ),
            Diagnostic::InvalidChoice { story_id, .. } => {
                write!(f, "{story_id}: choice step without options")
            }
            Diagnostic::SubFlowFailed { story_id, error } => write!(f, "{story_id}: {error}"),
            Diagnostic::MissingStory { story_id, target } => {
                write!(f, "{story_id}: nested story `{target}` not found")
            }
            Diagnostic::NestingTooDeep { story_id, target } => write!(
                f,
                "{story_id}: not starting `{target}`, stories nested {MAX_STORY_DEPTH} deep"
            ),
        }
    }
}

/// How a story stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// An END step.
    EndStep,
    /// A choice option with the END action.
    EndChoice,
    /// Ran off the last step.
    Exhausted,
}

/// What a finished story reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryOutcome {
    pub story_id: String,
    pub ending: Ending,
    /// Flags written by UPDATE_FLAG steps, nested stories included.
    pub flags_touched: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run a story from its first step to its end.
///
/// # Errors
///
/// Returns [`DataError::MissingStory`] when `story_id` is not in the data.
/// Everything else is recovered and reported in the outcome.
pub fn run_story(ctx: &mut EngineContext<'_>, story_id: &str) -> Result<StoryOutcome, CoreError> {
    let data = ctx.data;
    let story = data
        .story(story_id)
        .ok_or_else(|| DataError::MissingStory(story_id.to_string()))?;

    log::info!("starting story {story_id}");
    let mut interpreter = StoryInterpreter::new(ctx);
    let ending = interpreter.run_node(story, 0);

    Ok(StoryOutcome {
        story_id: story_id.to_string(),
        ending,
        flags_touched: interpreter.flags_touched,
        diagnostics: interpreter.diagnostics,
    })
}

struct StoryInterpreter<'c, 'a> {
    ctx: &'c mut EngineContext<'a>,
    flags_touched: BTreeSet<String>,
    diagnostics: Vec<Diagnostic>,
    /// Person already mediated on a spirit's request. Their next literal
    /// mediation call is skipped once, across nested stories too.
    suppressed_mediation: Option<String>,
}

impl<'c, 'a> StoryInterpreter<'c, 'a> {
    fn new(ctx: &'c mut EngineContext<'a>) -> Self {
        Self {
            ctx,
            flags_touched: BTreeSet::new(),
            diagnostics: Vec::new(),
            suppressed_mediation: None,
        }
    }

    fn run_node(&mut self, story: &'a StoryNode, depth: usize) -> Ending {
        let lines = LineIndex::build(&story.steps);
        for (line_id, position) in lines.duplicates() {
            self.diagnose(Diagnostic::DuplicateLine {
                story_id: story.id.clone(),
                line_id: line_id.clone(),
                position: *position,
            });
        }

        let mut cursor = 0;

        while let Some(step) = story.steps.get(cursor) {
            cursor += 1;
            match step {
                Step::Text {
                    speaker,
                    text,
                    display_mode,
                    ..
                } => {
                    self.await_acknowledgement(
                        story,
                        SubFlowRequest::Text {
                            speaker: speaker.as_deref(),
                            text,
                            display_mode: display_mode.as_deref(),
                        },
                    );
                }
                Step::Choice { options, .. } => {
                    let Some(option) = self.pick(story, options) else {
                        continue;
                    };
                    let resume = match &option.action {
                        ChoiceAction::GotoLine { target_line_id } => Some(target_line_id.as_str()),
                        ChoiceAction::StartStory { story_id } => {
                            self.run_nested(story, story_id, depth);
                            option.next_line_id.as_deref()
                        }
                        ChoiceAction::CallGhostComm { spirit_id } => {
                            self.call_ghost_comm(story, spirit_id);
                            option.next_line_id.as_deref()
                        }
                        ChoiceAction::CallMediation { npc_id } => {
                            self.call_mediation(story, npc_id);
                            option.next_line_id.as_deref()
                        }
                        ChoiceAction::End => {
                            self.complete(story);
                            return Ending::EndChoice;
                        }
                    };
                    if let Some(line_id) = resume {
                        cursor = self.jump(story, &lines, line_id).unwrap_or(cursor);
                    }
                }
                Step::GiveItem {
                    item_id, message, ..
                } => {
                    if self.ctx.world.grant_item(item_id.as_str()) {
                        log::debug!("granted {item_id}");
                    }
                    self.ctx.invoker.notify(Notice::ItemGranted {
                        item_id: item_id.clone(),
                        message: message.clone(),
                    });
                }
                Step::UpdateFlag { flag, value, .. } => {
                    if flag.is_empty() {
                        continue;
                    }
                    self.ctx.world.set_flag(flag.as_str(), value.clone());
                    self.flags_touched.insert(flag.clone());
                }
                Step::CallGhostComm { spirit_id, .. } => {
                    self.call_ghost_comm(story, spirit_id);
                }
                Step::CallMediation { npc_id, .. } => {
                    self.call_mediation(story, npc_id);
                }
                Step::ScreenEffect { effect, .. } => {
                    if let Some(effect) = effect {
                        self.ctx.invoker.notify(Notice::ScreenEffect(effect.clone()));
                    }
                }
                Step::End { .. } => {
                    self.complete(story);
                    return Ending::EndStep;
                }
            }
        }

        self.complete(story);
        Ending::Exhausted
    }

    fn push(&mut self, request: SubFlowRequest<'_>) -> Result<SubFlowResponse, SubFlowError> {
        let ctx = &mut *self.ctx;
        ctx.invoker.push(request, &mut *ctx.world)
    }

    fn await_acknowledgement(&mut self, story: &StoryNode, request: SubFlowRequest<'_>) {
        let key = request.key();
        match self.push(request) {
            Ok(SubFlowResponse::Acknowledged) => {}
            Ok(_) => self.sub_flow_failed(story, SubFlowError::UnexpectedResponse { key }),
            Err(err) => self.sub_flow_failed(story, err),
        }
    }

    fn pick(&mut self, story: &StoryNode, options: &'a [ChoiceOption]) -> Option<&'a ChoiceOption> {
        if options.is_empty() {
            self.diagnose(Diagnostic::InvalidChoice {
                story_id: story.id.clone(),
                picked: None,
                available: 0,
            });
            return None;
        }

        let request = SubFlowRequest::Choice { options };
        let key = request.key();
        match self.push(request) {
            Ok(SubFlowResponse::Picked(picked)) => {
                let option = options.get(picked);
                if option.is_none() {
                    self.diagnose(Diagnostic::InvalidChoice {
                        story_id: story.id.clone(),
                        picked: Some(picked),
                        available: options.len(),
                    });
                }
                option
            }
            Ok(_) => {
                self.sub_flow_failed(story, SubFlowError::UnexpectedResponse { key });
                None
            }
            Err(err) => {
                self.sub_flow_failed(story, err);
                None
            }
        }
    }

    fn jump(&mut self, story: &StoryNode, lines: &LineIndex, line_id: &str) -> Option<usize> {
        let position = lines.position(line_id);
        if position.is_none() {
            self.diagnose(Diagnostic::MissingJumpTarget {
                story_id: story.id.clone(),
                line_id: line_id.to_string(),
            });
        }
        position
    }

    fn run_nested(&mut self, parent: &StoryNode, target: &str, depth: usize) {
        if depth + 1 >= MAX_STORY_DEPTH {
            self.diagnose(Diagnostic::NestingTooDeep {
                story_id: parent.id.clone(),
                target: target.to_string(),
            });
            return;
        }
        let data = self.ctx.data;
        match data.story(target) {
            Some(nested) => {
                log::debug!("{} starts nested story {target}", parent.id);
                self.run_node(nested, depth + 1);
            }
            None => self.diagnose(Diagnostic::MissingStory {
                story_id: parent.id.clone(),
                target: target.to_string(),
            }),
        }
    }

    fn call_ghost_comm(&mut self, story: &StoryNode, spirit_id: &str) {
        if GhostTracker::state(&*self.ctx.world, spirit_id).is_settled() {
            log::debug!("spirit {spirit_id} is settled; skipping communication");
            return;
        }

        let request = SubFlowRequest::GhostComm { spirit_id };
        let key = request.key();
        let outcome = match self.push(request) {
            Ok(SubFlowResponse::GhostComm(outcome)) => outcome,
            Ok(_) => {
                return self.sub_flow_failed(story, SubFlowError::UnexpectedResponse { key });
            }
            Err(err) => return self.sub_flow_failed(story, err),
        };

        let world = &mut *self.ctx.world;
        world.miasma = world.miasma.min(outcome.miasma);
        self.settle(Some(spirit_id), &outcome.resolved_obsessions);

        if let Some(mediator) = outcome.mediator.filter(|m| !m.is_empty()) {
            log::info!("spirit {spirit_id} asks for {mediator}");
            self.run_mediation(story, &mediator, Some(spirit_id));
            self.suppressed_mediation = Some(mediator);
        }
    }

    fn call_mediation(&mut self, story: &StoryNode, npc_id: &str) {
        if self.suppressed_mediation.as_deref() == Some(npc_id) {
            log::debug!("mediation with {npc_id} already ran; skipping");
            self.suppressed_mediation = None;
            return;
        }
        let data = self.ctx.data;
        let spirit_id = data
            .spirits
            .iter()
            .find(|s| s.key_person() == Some(npc_id))
            .map(|s| s.id.as_str());
        self.run_mediation(story, npc_id, spirit_id);
    }

    fn run_mediation(&mut self, story: &StoryNode, npc_id: &str, spirit_id: Option<&str>) {
        let request = SubFlowRequest::Mediation { npc_id, spirit_id };
        let key = request.key();
        match self.push(request) {
            Ok(SubFlowResponse::Mediation(outcome)) => {
                log::debug!("mediation with {npc_id} ended at {:?}", outcome.stage);
                self.settle(spirit_id, &outcome.resolved_obsessions);
            }
            Ok(_) => self.sub_flow_failed(story, SubFlowError::UnexpectedResponse { key }),
            Err(err) => self.sub_flow_failed(story, err),
        }
    }

    /// Persist resolved obsessions and put to rest every affected spirit that has none left.
    fn settle(&mut self, spirit_id: Option<&str>, resolved: &[String]) {
        let data = self.ctx.data;
        let world = &mut *self.ctx.world;

        for obsession_id in resolved {
            GhostTracker::advance_obsession(world, obsession_id, ObsessionState::Resolved);
        }

        let mut affected: Vec<&Spirit> = spirit_id
            .and_then(|id| data.spirit(id))
            .into_iter()
            .collect();
        for owner in data.owners_of(resolved) {
            if !affected.iter().any(|s| s.id == owner.id) {
                affected.push(owner);
            }
        }
        for spirit in affected {
            if GhostTracker::obsessions_settled(world, spirit) {
                GhostTracker::mark_resolved(world, &spirit.id);
            }
        }
    }

    fn complete(&mut self, story: &StoryNode) {
        let flag = story.completion_flag();
        if !self.ctx.world.flag_is_set(&flag) {
            log::info!("story {} complete", story.id);
            self.ctx.world.set_flag(flag, true);
        }
    }

    fn sub_flow_failed(&mut self, story: &StoryNode, error: SubFlowError) {
        self.diagnose(Diagnostic::SubFlowFailed {
            story_id: story.id.clone(),
            error,
        });
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}
