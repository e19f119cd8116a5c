//! Option generation for negotiation rounds.
//!
//! [`LocalOptionProvider`] builds options from the spirit's own data and the
//! seeded generator, so equal saved states always offer equal choices. A
//! remote provider can be plugged into the [`OptionDirector`]; it is only
//! trusted when online and when its answer is well formed.

use rand::seq::SliceRandom;
use serde::Serialize;

use spirit_rules::{
    parse_condition, Condition, GhostOption, GhostOptionSet, Miasma, ObsessionState,
    OptionCategory, OptionEffect, SeededRng, Spirit, WordCard,
};

use crate::error::ProviderError;

const CALM_LINES: [&str; 3] = [
    "Breathe with me, {spirit}. No one here will hurt you.",
    "The tide is slow tonight, {spirit}. Let it carry the anger out.",
    "I came alone, {spirit}. Sit a while.",
];

const QUESTION_LINES: [&str; 3] = [
    "Tell me about {obsession}.",
    "What happened with {obsession}?",
    "Is {obsession} why you linger here?",
];

const RITUAL_LINES: [&str; 3] = [
    "Let us set {obsession} down together.",
    "I will speak the rite for {obsession}.",
    "{obsession} is finished now. You may let go.",
];

const EXCHANGE_LINES: [&str; 2] = [
    "I brought {item}. Take it for {obsession}.",
    "Will {item} settle {obsession}?",
];

const ACCUSATION_LINES: [&str; 3] = [
    "You caused {obsession} yourself.",
    "Admit it. {obsession} was your doing.",
    "Stop hiding behind {obsession}.",
];

const AWAKEN_LINES: [&str; 2] = [
    "Look, {spirit}. Do you remember {item}?",
    "{item} is still here, {spirit}. It is yours.",
];

const FAREWELL_LINE: &str = "Rest now, {spirit}. I will come back.";

/// Progress of one obsession as providers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObsessionProgress<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub condition: &'a str,
    pub state: ObsessionState,
}

/// Everything a provider needs for one round of options.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRequest<'a> {
    pub spirit: &'a Spirit,
    pub obsessions: Vec<ObsessionProgress<'a>>,
    pub word_card: Option<&'a WordCard>,
    pub miasma: Miasma,
    /// Item ids the player holds.
    pub items: &'a [String],
    /// False while a lost-self spirit has not been woken.
    pub awake: bool,
    pub seed: String,
    pub max_options: usize,
    #[serde(skip)]
    pub offline: bool,
}

impl OptionRequest<'_> {
    /// JSON bundle sent to text-generation backends.
    pub fn to_prompt_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn holds(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item == item_id)
    }
}

/// Produces a round of options for a negotiation.
pub trait OptionProvider {
    fn is_ready(&self) -> bool {
        true
    }

    /// # Errors
    ///
    /// Any failure; callers fall back to local generation.
    fn generate(&mut self, request: &OptionRequest<'_>) -> Result<GhostOptionSet, ProviderError>;
}

/// Offline generator driven by the negotiation seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOptionProvider;

impl LocalOptionProvider {
    fn candidates(request: &OptionRequest<'_>, rng: &mut SeededRng) -> Vec<GhostOption> {
        let spirit = request.spirit;
        let mut options = Vec::new();

        if !request.awake {
            if let Some(key_item) = spirit.key_item() {
                let text = phrase(rng, &AWAKEN_LINES, &spirit.name, "", key_item);
                options.push(
                    GhostOption::new(text, OptionCategory::Ritual, OptionEffect::Calm)
                        .requiring(key_item),
                );
            }
        }

        if request.miasma != Miasma::Clear {
            let text = phrase(rng, &CALM_LINES, &spirit.name, "", "");
            options.push(GhostOption::new(text, OptionCategory::Comfort, OptionEffect::Calm));
        }

        for obsession in &request.obsessions {
            if obsession.state == ObsessionState::Resolved {
                continue;
            }
            let (lines, category, effect) = match obsession.state {
                ObsessionState::Unresolved => {
                    (&QUESTION_LINES, OptionCategory::Question, OptionEffect::Loosen)
                }
                _ => (&RITUAL_LINES, OptionCategory::Ritual, OptionEffect::Untie),
            };
            let text = phrase(rng, lines, &spirit.name, obsession.name, "");
            options.push(GhostOption::new(text, category, effect).targeting(obsession.id));

            if let Some(item) = offered_item(obsession.condition).filter(|i| request.holds(i)) {
                let text = phrase(rng, &EXCHANGE_LINES, &spirit.name, obsession.name, &item);
                options.push(
                    GhostOption::new(text, OptionCategory::Exchange, OptionEffect::Untie)
                        .targeting(obsession.id)
                        .requiring(item),
                );
            }

            let text = phrase(rng, &ACCUSATION_LINES, &spirit.name, obsession.name, "");
            options.push(
                GhostOption::new(text, OptionCategory::Accusation, OptionEffect::Loosen)
                    .targeting(obsession.id),
            );
        }

        if options.is_empty() {
            let text = FAREWELL_LINE.replace("{spirit}", &spirit.name);
            options.push(GhostOption::new(text, OptionCategory::Comfort, OptionEffect::Calm));
        }
        options
    }
}

impl OptionProvider for LocalOptionProvider {
    fn generate(&mut self, request: &OptionRequest<'_>) -> Result<GhostOptionSet, ProviderError> {
        let mut rng = SeededRng::from_seed_str(&request.seed);
        let mut options = Self::candidates(request, &mut rng);
        options.shuffle(&mut rng);

        if let Some(card) = request.word_card {
            options.sort_by_key(|option| !card.tags.contains(&option.category));
        }
        options.truncate(request.max_options.max(1));

        Ok(GhostOptionSet {
            options,
            tone: tone_for(request).to_string(),
        })
    }
}

/// Item id a condition asks the player to hold, if any.
fn offered_item(condition: &str) -> Option<String> {
    match parse_condition(condition) {
        Ok(Condition::Item { key }) if !key.is_empty() => Some(key),
        _ => None,
    }
}

fn phrase(
    rng: &mut SeededRng,
    lines: &[&str],
    spirit: &str,
    obsession: &str,
    item: &str,
) -> String {
    let template = rng.pick(lines).copied().unwrap_or("{obsession}");
    template
        .replace("{spirit}", spirit)
        .replace("{obsession}", obsession)
        .replace("{item}", item)
}

fn tone_for(request: &OptionRequest<'_>) -> &'static str {
    if !request.awake {
        return "vacant";
    }
    match request.miasma {
        Miasma::Boiling => "hostile",
        Miasma::Turbid => "wary",
        Miasma::Clear => "hurt but willing",
    }
}

/// Chooses between a remote provider and local generation.
#[derive(Default)]
pub struct OptionDirector {
    local: LocalOptionProvider,
    remote: Option<Box<dyn OptionProvider>>,
}

impl OptionDirector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(mut self, remote: Box<dyn OptionProvider>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Options for one round. Never fails; local generation is the fallback.
    pub fn generate(&mut self, request: &OptionRequest<'_>) -> GhostOptionSet {
        if !request.offline {
            if let Some(remote) = self.remote.as_mut().filter(|r| r.is_ready()) {
                match remote
                    .generate(request)
                    .and_then(|set| validate(set, request.max_options))
                {
                    Ok(set) => return set,
                    Err(err) => log::warn!("remote options unavailable, using local: {err}"),
                }
            }
        }

        match self.local.generate(request) {
            Ok(set) => set,
            Err(err) => {
                log::warn!("local options failed: {err}");
                GhostOptionSet::default()
            }
        }
    }
}

fn validate(set: GhostOptionSet, max_options: usize) -> Result<GhostOptionSet, ProviderError> {
    let count = set.options.len();
    if count == 0 || count > max_options.max(1) {
        return Err(ProviderError::BadOptionCount(count));
    }
    Ok(set)
}
