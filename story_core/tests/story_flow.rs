use serde_json::Value;
use spirit_rules::{
    EngineConfig, GhostOption, GhostOptionSet, GhostState, GhostTracker, ObsessionState,
    OptionCategory, OptionEffect, WorldState,
};
use story_core::{
    gather_hints, run_story, Ending, EngineContext, GameData, JsonDataSource, MediationSession,
    MemoryStore, NegotiationSession, Notice, OptionDirector, Saver, SpawnResolver, SubFlowError,
    SubFlowInvoker, SubFlowRequest, SubFlowResponse, AUTOSAVE_SLOT, COLLECTIONS,
};

const MAX_ROUNDS: usize = 12;

fn load_data() -> GameData {
    let bundle: Value = serde_json::from_str(include_str!("fixtures/harbour.json")).unwrap();
    let source = COLLECTIONS
        .iter()
        .fold(JsonDataSource::new(), |source, name| {
            source.with_collection(*name, bundle[*name].clone())
        });
    GameData::load(&source).unwrap()
}

fn engine_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.negotiation.max_options = 8;
    config
}

/// Plays every sub-flow the way a patient player would: negotiations run on
/// locally generated options, mediations send a fixed script of messages.
struct Player<'d> {
    data: &'d GameData,
    config: EngineConfig,
    opening_line: Option<String>,
    messages: Vec<&'static str>,
    requests: Vec<String>,
    notices: Vec<Notice>,
}

impl<'d> Player<'d> {
    fn new(data: &'d GameData) -> Self {
        Self {
            data,
            config: engine_config(),
            opening_line: None,
            messages: vec![
                "Let's arrange the offering tonight, between us",
                "We can prepare it together tomorrow, between us",
            ],
            requests: Vec::new(),
            notices: Vec::new(),
        }
    }

    fn negotiate(
        &mut self,
        spirit_id: &str,
        world: &mut WorldState,
    ) -> Result<SubFlowResponse, SubFlowError> {
        let failed = |reason: String| SubFlowError::Failed {
            key: format!("ghost-comm:{spirit_id}"),
            reason,
        };
        let mut session = NegotiationSession::start(
            world,
            self.data,
            spirit_id,
            self.config.negotiation.clone(),
        )
        .map_err(|err| failed(err.to_string()))?;

        if let Some(line) = self.opening_line.take() {
            let opener = GhostOption::new(line, OptionCategory::Question, OptionEffect::Loosen);
            session.apply(&opener).map_err(|err| failed(err.to_string()))?;
        }

        let mut director = OptionDirector::new();
        for _ in 0..MAX_ROUNDS {
            if !session.is_open() {
                break;
            }
            let set = session.offer(&mut director, None);
            let Some(choice) = best_option(&set, session.world()) else {
                break;
            };
            session.apply(&choice).map_err(|err| failed(err.to_string()))?;
        }
        Ok(SubFlowResponse::GhostComm(session.finish()))
    }

    fn mediate(
        &mut self,
        npc_id: &str,
        spirit_id: Option<&str>,
    ) -> Result<SubFlowResponse, SubFlowError> {
        let mut session =
            MediationSession::start(self.data, npc_id, spirit_id, &self.config.mediation)
                .map_err(|err| SubFlowError::Failed {
                    key: format!("mediation:{npc_id}"),
                    reason: err.to_string(),
                })?;
        for message in &self.messages {
            session.say(message);
        }
        Ok(SubFlowResponse::Mediation(session.finish()))
    }
}

/// Untie first, then loosen, then calm. Never accuse, never offer what is not held.
fn best_option(set: &GhostOptionSet, world: &WorldState) -> Option<GhostOption> {
    let usable = |option: &&GhostOption| {
        option.category != OptionCategory::Accusation
            && option.requires.iter().all(|item| world.has_item(item))
    };
    [OptionEffect::Untie, OptionEffect::Loosen, OptionEffect::Exchange, OptionEffect::Calm]
        .iter()
        .find_map(|effect| {
            set.options
                .iter()
                .filter(|option| usable(option))
                .find(|option| option.effect == *effect)
        })
        .cloned()
}

impl SubFlowInvoker for Player<'_> {
    fn push(
        &mut self,
        request: SubFlowRequest<'_>,
        world: &mut WorldState,
    ) -> Result<SubFlowResponse, SubFlowError> {
        self.requests.push(request.key());
        match request {
            SubFlowRequest::Text { .. } => Ok(SubFlowResponse::Acknowledged),
            SubFlowRequest::Choice { .. } => Ok(SubFlowResponse::Picked(0)),
            SubFlowRequest::GhostComm { spirit_id } => self.negotiate(spirit_id, world),
            SubFlowRequest::Mediation { npc_id, spirit_id } => self.mediate(npc_id, spirit_id),
        }
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

#[test]
fn fresh_world_reaches_only_open_anchors() {
    let data = load_data();
    let world = WorldState::new();
    let mut spawn = SpawnResolver::new(&data.stories);

    let accessible = spawn.list_accessible_anchors(&world, &data.anchors);
    let ids: Vec<&str> = accessible.iter().map(|a| a.id()).collect();
    assert_eq!(ids, vec!["a_alley"]);
    assert!(!accessible[0].resolved);

    let startable: Vec<&str> = spawn
        .list_startable_stories(&world, &data.stories, "a_alley")
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(startable, vec!["st_widow", "st_widow_echo"]);
    assert!(spawn
        .list_startable_stories(&world, &data.stories, "a_pier")
        .is_empty());
}

#[test]
fn widow_story_puts_her_to_rest() {
    let data = load_data();
    let mut world = WorldState::new();
    let mut player = Player::new(&data);

    let outcome = {
        let mut ctx = EngineContext::new(&mut world, &data, &mut player);
        run_story(&mut ctx, "st_widow").unwrap()
    };

    assert_eq!(outcome.ending, Ending::EndStep);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert!(world.has_item("it_rice"));
    assert!(world.flag_is_set("met_widow"));
    assert!(world.flag_is_set("story:st_widow"));
    assert_eq!(
        GhostTracker::obsession_state(&world, "o_rice"),
        Some(ObsessionState::Resolved)
    );
    assert_eq!(
        GhostTracker::obsession_state(&world, "o_letter"),
        Some(ObsessionState::Resolved)
    );
    assert_eq!(GhostTracker::state(&world, "sp_widow"), GhostState::Resolved);
    assert_eq!(world.resolved_spirits, vec!["sp_widow".to_string()]);
    assert_eq!(
        world.dialogue_summary.last().map(String::as_str),
        Some("Widow Lin: 2/2 obsessions resolved, miasma turbid")
    );

    assert!(matches!(
        player.notices.as_slice(),
        [Notice::ItemGranted { item_id, .. }] if item_id == "it_rice"
    ));
    assert_eq!(player.requests, vec!["text", "ghost-comm:sp_widow"]);

    let mut spawn = SpawnResolver::new(&data.stories);
    let accessible = spawn.list_accessible_anchors(&world, &data.anchors);
    let alley = accessible.iter().find(|a| a.id() == "a_alley").unwrap();
    assert!(alley.resolved);
    assert!(accessible.iter().any(|a| a.id() == "a_pier"));
    assert_eq!(spawn.echo_script("a_alley"), Some("st_widow_echo"));
    assert!(spawn
        .list_startable_stories(&world, &data.stories, "a_alley")
        .is_empty());
}

#[test]
fn refusing_sailor_is_settled_through_his_son() {
    let data = load_data();
    let mut world = WorldState::new();
    world.set_flag("met_widow", true);
    let mut player = Player::new(&data);
    player.opening_line = Some("Was it the debt that kept you here?".to_string());

    let outcome = {
        let mut ctx = EngineContext::new(&mut world, &data, &mut player);
        run_story(&mut ctx, "st_sailor").unwrap()
    };

    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    // The literal mediation step after the chained one is skipped.
    assert_eq!(
        player.requests,
        vec!["text", "ghost-comm:sp_sailor", "mediation:npc_son", "text"]
    );
    assert_eq!(
        GhostTracker::obsession_state(&world, "o_apology"),
        Some(ObsessionState::Resolved)
    );
    assert!(world.is_spirit_resolved("sp_sailor"));
    assert!(world.flag_is_set("story:st_sailor"));
}

#[test]
fn settled_spirit_is_not_called_again() {
    let data = load_data();
    let mut world = WorldState::new();
    let mut player = Player::new(&data);

    for _ in 0..2 {
        let mut ctx = EngineContext::new(&mut world, &data, &mut player);
        run_story(&mut ctx, "st_widow").unwrap();
    }

    let calls = player
        .requests
        .iter()
        .filter(|key| key.as_str() == "ghost-comm:sp_widow")
        .count();
    assert_eq!(calls, 1);
    assert_eq!(world.resolved_spirits, vec!["sp_widow".to_string()]);
    assert_eq!(world.items, vec!["it_rice".to_string()]);
}

#[test]
fn hints_follow_progress() {
    let data = load_data();
    let mut world = WorldState::new();
    world.set_flag("hint:pier", "Someone at the pier owes the sea a word.");

    let before = gather_hints(&world, &data.spirits, &data.anchors);
    let ids: Vec<&str> = before.iter().map(|h| h.id.as_str()).collect();
    assert!(ids.contains(&"hint:pier"));
    assert!(ids.contains(&"obsession:o_rice"));
    let apology = before
        .iter()
        .find(|h| h.id == "obsession:o_apology")
        .unwrap();
    assert!(apology.text.contains("Old Pier"));
    assert!(apology.text.contains("say sorry"));

    let mut player = Player::new(&data);
    {
        let mut ctx = EngineContext::new(&mut world, &data, &mut player);
        run_story(&mut ctx, "st_widow").unwrap();
    }

    let after = gather_hints(&world, &data.spirits, &data.anchors);
    assert!(after.iter().all(|h| h.id != "obsession:o_rice"));
    assert!(after.iter().all(|h| h.id != "obsession:o_letter"));
    assert!(after.iter().any(|h| h.id == "obsession:o_apology"));
}

#[test]
fn autosave_restores_story_progress() {
    let data = load_data();
    let mut world = WorldState::new();
    let mut player = Player::new(&data);
    {
        let mut ctx = EngineContext::new(&mut world, &data, &mut player);
        run_story(&mut ctx, "st_widow").unwrap();
    }

    let mut saver = Saver::new(MemoryStore::new());
    saver.autosave(&mut world, 1_760_000_000_000).unwrap();

    let mut restored = WorldState::new();
    assert!(saver.load(AUTOSAVE_SLOT, &mut restored).unwrap());
    assert_eq!(restored, world);
    assert!(restored.is_spirit_resolved("sp_widow"));

    let mut spawn = SpawnResolver::new(&data.stories);
    let accessible = spawn.list_accessible_anchors(&restored, &data.anchors);
    assert!(accessible.iter().any(|a| a.id() == "a_alley" && a.resolved));
}
