use serde_json::Value;
use spirit_rules::{
    ChoiceAction, ChoiceOption, EngineConfig, GameSettings, GhostOption, GhostOptionSet,
    GhostState, GhostTracker, Miasma, NegotiationConfig, ObsessionState, OptionCategory,
    OptionEffect, Step, WorldState,
};
use story_core::{
    check_integrity, negotiation_seed, CoreError, GameData, JsonDataSource, NegotiationSession,
    OptionDirector, OptionProvider, OptionRequest, ProviderError, SessionStatus, Turn,
    COLLECTIONS,
};

fn load_data() -> GameData {
    let bundle: Value = serde_json::from_str(include_str!("fixtures/harbour.json")).unwrap();
    let source = COLLECTIONS
        .iter()
        .fold(JsonDataSource::new(), |source, name| {
            source.with_collection(*name, bundle[*name].clone())
        });
    GameData::load(&source).unwrap()
}

fn roomy() -> NegotiationConfig {
    NegotiationConfig {
        max_options: 8,
        ..NegotiationConfig::default()
    }
}

fn calm() -> GhostOption {
    GhostOption::new("Sit with me a while.", OptionCategory::Comfort, OptionEffect::Calm)
}

fn accuse(obsession_id: &str) -> GhostOption {
    GhostOption::new("This is your own doing.", OptionCategory::Accusation, OptionEffect::Loosen)
        .targeting(obsession_id)
}

/// Answers every round with the same options.
struct CannedRemote(GhostOptionSet);

impl OptionProvider for CannedRemote {
    fn generate(&mut self, _request: &OptionRequest<'_>) -> Result<GhostOptionSet, ProviderError> {
        Ok(self.0.clone())
    }
}

fn canned_set(count: usize) -> GhostOptionSet {
    GhostOptionSet {
        options: (0..count)
            .map(|i| {
                GhostOption::new(
                    format!("Remote line {i}"),
                    OptionCategory::Question,
                    OptionEffect::Loosen,
                )
                .targeting("o_rice")
            })
            .collect(),
        tone: "remote".into(),
    }
}

#[test]
fn calming_steps_down_to_clear_and_stays() {
    let data = load_data();
    let mut world = WorldState::new();
    world.miasma = Miasma::Boiling;

    let mut session = NegotiationSession::start(&mut world, &data, "sp_widow", roomy()).unwrap();
    let mut seen = Vec::new();
    for _ in 0..3 {
        session.apply(&calm()).unwrap();
        seen.push(session.world().miasma);
    }
    assert_eq!(seen, vec![Miasma::Turbid, Miasma::Clear, Miasma::Clear]);

    let outcome = session.finish();
    assert_eq!(outcome.miasma, Miasma::Clear);
    assert!(outcome.resolved_obsessions.is_empty());
}

#[test]
fn repeated_accusation_silences_the_spirit() {
    let data = load_data();
    let mut world = WorldState::new();
    let mut session = NegotiationSession::start(&mut world, &data, "sp_sailor", roomy()).unwrap();

    let first = session.apply(&accuse("o_apology")).unwrap();
    assert_eq!(
        first,
        Turn::Applied {
            advanced: vec!["o_apology".to_string()],
            status: SessionStatus::Active,
        }
    );

    let second = session.apply(&accuse("o_apology")).unwrap();
    assert_eq!(
        second,
        Turn::Applied {
            advanced: Vec::new(),
            status: SessionStatus::Silenced,
        }
    );
    assert_eq!(session.mediator(), Some("npc_son"));
    assert!(matches!(
        session.apply(&calm()),
        Err(CoreError::SessionClosed(id)) if id == "sp_sailor"
    ));

    let outcome = session.finish();
    assert_eq!(outcome.mediator.as_deref(), Some("npc_son"));
    assert_eq!(GhostTracker::state(&world, "sp_sailor"), GhostState::Silent);
    assert_eq!(
        GhostTracker::obsession_state(&world, "o_apology"),
        Some(ObsessionState::Loosened)
    );
}

#[test]
fn refusal_threshold_comes_from_config() {
    let data = load_data();
    let config = EngineConfig::from_toml_str(
        r#"
[negotiation]
max_options = 0
refusal_repeats = 3
"#,
    )
    .unwrap();
    assert_eq!(config.negotiation.max_options, 1);

    let mut world = WorldState::new();
    let mut session =
        NegotiationSession::start(&mut world, &data, "sp_widow", config.negotiation).unwrap();
    session.apply(&accuse("o_rice")).unwrap();
    session.apply(&accuse("o_rice")).unwrap();
    assert!(session.is_open());
    assert_eq!(session.accusation_repeats(), 2);

    session.apply(&accuse("o_rice")).unwrap();
    assert_eq!(session.status(), SessionStatus::Silenced);
}

#[test]
fn equal_saved_states_offer_equal_options() {
    let data = load_data();
    let mut first = WorldState::new();
    first.grant_item("it_rice");
    let mut second = WorldState::from_payload_json(&first.to_payload_json().unwrap()).unwrap();

    let mut director = OptionDirector::new();
    let a = NegotiationSession::start(&mut first, &data, "sp_widow", roomy())
        .unwrap()
        .offer(&mut director, None);
    let b = NegotiationSession::start(&mut second, &data, "sp_widow", roomy())
        .unwrap()
        .offer(&mut director, None);
    assert!(!a.options.is_empty());
    assert_eq!(a, b);

    let widow = data.spirit("sp_widow").unwrap();
    let before = negotiation_seed(&first, widow);
    {
        let mut session =
            NegotiationSession::start(&mut first, &data, "sp_widow", roomy()).unwrap();
        let loosen = GhostOption::new("Tell me.", OptionCategory::Question, OptionEffect::Loosen)
            .targeting("o_letter");
        session.apply(&loosen).unwrap();
    }
    let after = negotiation_seed(&first, widow);
    assert_ne!(before, after);
    assert_eq!(GhostTracker::conversation_step(&first, "sp_widow"), 1);
}

#[test]
fn word_card_leads_with_tagged_options() {
    let data = load_data();
    let mut world = WorldState::new();
    let session = NegotiationSession::start(&mut world, &data, "sp_widow", roomy()).unwrap();

    let mut director = OptionDirector::new();
    let set = session.offer(&mut director, data.wordcard("wc_soothe"));
    assert_eq!(set.options[0].category, OptionCategory::Comfort);
    assert_eq!(set.tone, "wary");
}

#[test]
fn lost_self_spirit_wakes_only_to_its_key_item() {
    let data = load_data();
    let mut world = WorldState::new();
    let mut director = OptionDirector::new();

    let awaken = {
        let mut session =
            NegotiationSession::start(&mut world, &data, "sp_clerk", roomy()).unwrap();
        assert!(!session.is_awake());
        let set = session.offer(&mut director, None);
        assert_eq!(set.tone, "vacant");
        let awaken = set
            .options
            .iter()
            .find(|o| o.requires == vec!["it_seal".to_string()])
            .cloned()
            .unwrap();

        assert_eq!(
            session.apply(&awaken).unwrap(),
            Turn::Blocked {
                missing: vec!["it_seal".to_string()]
            }
        );
        let ignored = GhostOption::new(
            "Remember the ledger?",
            OptionCategory::Question,
            OptionEffect::Loosen,
        )
        .targeting("o_register");
        assert_eq!(
            session.apply(&ignored).unwrap(),
            Turn::Applied {
                advanced: Vec::new(),
                status: SessionStatus::Active,
            }
        );
        awaken
    };
    assert_eq!(GhostTracker::state(&world, "sp_clerk"), GhostState::LostSelf);

    world.grant_item("it_seal");
    let mut session = NegotiationSession::start(&mut world, &data, "sp_clerk", roomy()).unwrap();
    session.apply(&awaken).unwrap();
    assert!(session.is_awake());
    let untie = GhostOption::new("The page is mended.", OptionCategory::Ritual, OptionEffect::Untie)
        .targeting("o_register");
    assert_eq!(
        session.apply(&untie).unwrap(),
        Turn::Applied {
            advanced: vec!["o_register".to_string()],
            status: SessionStatus::Resolved,
        }
    );
    assert_eq!(
        GhostTracker::state(&world, "sp_clerk"),
        GhostState::Communicating
    );
}

#[test]
fn remote_options_are_used_only_online_and_well_formed() {
    let data = load_data();
    let mut world = WorldState::new();

    {
        let session = NegotiationSession::start(&mut world, &data, "sp_widow", roomy()).unwrap();
        let mut director = OptionDirector::new().with_remote(Box::new(CannedRemote(canned_set(2))));
        assert_eq!(session.offer(&mut director, None), canned_set(2));

        let mut oversized =
            OptionDirector::new().with_remote(Box::new(CannedRemote(canned_set(9))));
        assert_ne!(session.offer(&mut oversized, None).tone, "remote");
    }

    let settings = GameSettings {
        offline_mode: true,
        ..GameSettings::default()
    };
    settings.apply_world_flags(&mut world);
    let session = NegotiationSession::start(&mut world, &data, "sp_widow", roomy()).unwrap();
    let mut director = OptionDirector::new().with_remote(Box::new(CannedRemote(canned_set(2))));
    let set = session.offer(&mut director, None);
    assert_ne!(set.tone, "remote");
    assert!(!set.options.is_empty());
}

#[test]
fn integrity_flags_authoring_slips() {
    let mut data = load_data();
    assert!(!check_integrity(&data).has_errors());

    let marked = |line_id: &str| Step::Text {
        speaker: None,
        text: "Again.".into(),
        line_id: Some(line_id.into()),
        display_mode: None,
    };
    let story = data
        .stories
        .iter_mut()
        .find(|s| s.id == "st_sailor")
        .unwrap();
    story.steps.insert(0, marked("l_tide"));
    story.steps.insert(
        1,
        Step::Choice {
            line_id: None,
            options: vec![ChoiceOption {
                text: "Look away".into(),
                action: ChoiceAction::GotoLine {
                    target_line_id: "l_nowhere".into(),
                },
                next_line_id: None,
            }],
        },
    );
    let mut twin = data.spirits[0].clone();
    twin.background =
        "Someone else entirely, from a different decade and a different street.".into();
    data.spirits.push(twin);

    let mut wide_copy = data.spirits[0].clone();
    wide_copy.id = "sp_widow_wide".into();
    wide_copy.background = full_width(&data.spirits[0].background);
    data.spirits.push(wide_copy);

    let report = check_integrity(&data);
    let errors: Vec<String> = report.errors().map(|f| f.message.clone()).collect();
    assert!(errors.iter().any(|m| m.contains("l_tide")), "{errors:?}");
    assert!(errors.iter().any(|m| m.contains("l_nowhere")), "{errors:?}");
    assert!(report.errors().any(|f| f.collection == "spirits"));

    let warnings: Vec<String> = report.warnings().map(|f| f.message.clone()).collect();
    assert!(
        warnings
            .iter()
            .any(|m| m.contains("sp_widow_wide") && m.contains("near duplicates")),
        "{warnings:?}"
    );
}

/// The same text typed on a full-width keyboard.
fn full_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' ' => '\u{3000}',
            '!'..='~' => char::from_u32(c as u32 + 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}
