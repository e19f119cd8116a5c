//! Authoring checks over loaded game data.
//!
//! Nothing here runs during play. The checks catch content mistakes that the
//! runtime would otherwise paper over with diagnostics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

use spirit_rules::{ChoiceAction, Step, StoryNode};

use crate::data::GameData;
use crate::interpreter::LineIndex;
use crate::services::validate_binding;

/// Backgrounds more alike than this are reported.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

const SHINGLE_SIZE: usize = 3;

static PUNCTUATION_SYMBOLS_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{P}\p{S}\s]+").expect("valid strip pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    pub collection: &'static str,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {}: {}", self.collection, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    pub findings: Vec<Finding>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    fn push(&mut self, severity: Severity, collection: &'static str, message: String) {
        self.findings.push(Finding {
            severity,
            collection,
            message,
        });
    }
}

/// Run every check over the data.
pub fn check_integrity(data: &GameData) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    check_uniqueness(
        &mut report,
        "spirits",
        data.spirits.iter().map(|s| (s.id.as_str(), s.unique_keys(), s)),
    );
    check_uniqueness(
        &mut report,
        "anchors",
        data.anchors.iter().map(|a| (a.id.as_str(), vec!["id".to_string()], a)),
    );
    check_uniqueness(
        &mut report,
        "stories",
        data.stories.iter().map(|s| (s.id.as_str(), vec!["id".to_string()], s)),
    );
    check_similarity(
        &mut report,
        "spirits",
        data.spirits.iter().map(|s| (s.id.as_str(), s.background.as_str())),
    );

    for anchor in &data.anchors {
        if let Some(spirit_id) = &anchor.service_spirit {
            if data.spirit(spirit_id).is_none() {
                report.push(
                    Severity::Warning,
                    "anchors",
                    format!("{} serves unknown spirit {spirit_id}", anchor.id),
                );
            }
        }
    }
    for story in &data.stories {
        lint_story(&mut report, data, story);
    }

    for finding in &report.findings {
        log::debug!("{finding}");
    }
    report
}

/// Entries whose unique keys collide are errors.
fn check_uniqueness<'a, T, I>(report: &mut IntegrityReport, collection: &'static str, entries: I)
where
    T: Serialize + 'a,
    I: Iterator<Item = (&'a str, Vec<String>, &'a T)>,
{
    let mut buckets: BTreeMap<String, (String, Vec<&'a str>)> = BTreeMap::new();
    for (id, keys, entry) in entries {
        let fields = serde_json::to_value(entry).unwrap_or(Value::Null);
        let values: Vec<String> = keys
            .iter()
            .map(|key| fields.get(key).cloned().unwrap_or(Value::Null).to_string())
            .collect();
        let descriptor: Vec<String> = keys
            .iter()
            .zip(&values)
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        let bucket = format!("{}::{}", keys.join("|"), values.join("|"));
        buckets
            .entry(bucket)
            .or_insert_with(|| (descriptor.join(", "), Vec::new()))
            .1
            .push(id);
    }

    for (descriptor, ids) in buckets.into_values() {
        if ids.len() > 1 {
            report.push(
                Severity::Error,
                collection,
                format!("duplicate entries ({descriptor}): {}", ids.join(", ")),
            );
        }
    }
}

/// Backgrounds that read almost the same are warnings.
fn check_similarity<'a, I>(report: &mut IntegrityReport, collection: &'static str, entries: I)
where
    I: Iterator<Item = (&'a str, &'a str)>,
{
    let processed: Vec<(&str, HashSet<String>)> = entries
        .map(|(id, text)| (id, shingles(&normalize_text(text), SHINGLE_SIZE)))
        .filter(|(_, set)| !set.is_empty())
        .collect();

    for (i, (left_id, left)) in processed.iter().enumerate() {
        for (right_id, right) in &processed[i + 1..] {
            let score = jaccard(left, right);
            if score > SIMILARITY_THRESHOLD {
                report.push(
                    Severity::Warning,
                    collection,
                    format!(
                        "backgrounds of {left_id} and {right_id} are near duplicates ({score:.2})"
                    ),
                );
            }
        }
    }
}

/// NFKC-fold, then drop punctuation, symbols and whitespace.
///
/// Full-width and half-width spellings of the same text compare equal.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text.nfkc().collect();
    PUNCTUATION_SYMBOLS_SPACE.replace_all(&folded, "").into_owned()
}

/// Character shingles of `size`. Empty when the text is shorter.
pub fn shingles(text: &str, size: usize) -> HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    if size == 0 || chars.len() < size {
        return HashSet::new();
    }
    chars.windows(size).map(|w| w.iter().collect()).collect()
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn lint_story(report: &mut IntegrityReport, data: &GameData, story: &StoryNode) {
    let lines = LineIndex::build(&story.steps);
    for (line_id, position) in lines.duplicates() {
        report.push(
            Severity::Error,
            "stories",
            format!("{}: line id {line_id} repeated at step {position}", story.id),
        );
    }

    if let Err(problem) = validate_binding(story) {
        report.push(
            Severity::Warning,
            "stories",
            format!("{}: service binding ignored: {problem}", story.id),
        );
    }
    if data.anchor(&story.anchor).is_none() {
        report.push(
            Severity::Warning,
            "stories",
            format!("{}: unknown anchor {}", story.id, story.anchor),
        );
    }

    let mut dangling = |target: &str| {
        if lines.position(target).is_none() {
            report.push(
                Severity::Error,
                "stories",
                format!("{}: jump to missing line {target}", story.id),
            );
        }
    };
    for step in &story.steps {
        if let Step::Choice { options, .. } = step {
            for option in options {
                if let ChoiceAction::GotoLine { target_line_id } = &option.action {
                    dangling(target_line_id);
                }
                if let Some(next) = &option.next_line_id {
                    dangling(next);
                }
            }
        }
    }

    for step in &story.steps {
        let missing = match step {
            Step::CallGhostComm { spirit_id, .. } => unknown_spirit(data, spirit_id),
            Step::CallMediation { npc_id, .. } => unknown_npc(data, npc_id),
            Step::GiveItem { item_id, .. } if !data.items.iter().any(|i| i.id == *item_id) => {
                Some(format!("item {item_id}"))
            }
            Step::Choice { options, .. } => options.iter().find_map(|option| match &option.action {
                ChoiceAction::StartStory { story_id } if data.story(story_id).is_none() => {
                    Some(format!("story {story_id}"))
                }
                ChoiceAction::CallGhostComm { spirit_id } => unknown_spirit(data, spirit_id),
                ChoiceAction::CallMediation { npc_id } => unknown_npc(data, npc_id),
                _ => None,
            }),
            _ => None,
        };
        if let Some(what) = missing {
            report.push(
                Severity::Warning,
                "stories",
                format!("{}: refers to unknown {what}", story.id),
            );
        }
    }
}

fn unknown_spirit(data: &GameData, spirit_id: &str) -> Option<String> {
    data.spirit(spirit_id)
        .is_none()
        .then(|| format!("spirit {spirit_id}"))
}

fn unknown_npc(data: &GameData, npc_id: &str) -> Option<String> {
    data.npc(npc_id).is_none().then(|| format!("person {npc_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spirit_rules::{Anchor, ChoiceOption, Spirit, UniquenessConstraint};

    fn spirit(id: &str, name: &str, background: &str) -> Spirit {
        let mut spirit = Spirit::new(id, name);
        spirit.background = background.into();
        spirit
    }

    #[test]
    fn test_shingles_and_jaccard() {
        let a = shingles(&normalize_text("a b, c d!"), 3);
        assert_eq!(a.len(), 2);
        assert!(a.contains("abc"));
        assert!(shingles("ab", 3).is_empty());
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn test_normalize_folds_compatibility_forms() {
        assert_eq!(
            normalize_text("Lantern keeper 2024, drowned"),
            normalize_text("Ｌａｎｔｅｒｎ ｋｅｅｐｅｒ ２０２４，ｄｒｏｗｎｅｄ")
        );
        assert_eq!(normalize_text("Lantern keeper 2024, drowned"), "Lanternkeeper2024drowned");
        assert_eq!(normalize_text("cafe\u{301} a+b=c ¥"), "caféabc");
        assert_eq!(normalize_text("老街　的「燈籠」。"), "老街的燈籠");
    }

    #[test]
    fn test_clean_data() {
        let data = GameData {
            spirits: vec![
                spirit("sp_a", "A", "Drowned at the pier during the typhoon."),
                spirit("sp_b", "B", "Sold rice cakes outside the temple gate."),
            ],
            anchors: vec![Anchor::new("a_pier", "Pier")],
            stories: vec![StoryNode::new("st_a", "a_pier").with_step(Step::end())],
            ..GameData::default()
        };
        let report = check_integrity(&data);
        assert!(report.is_clean(), "{:?}", report.findings);
    }

    #[test]
    fn test_duplicates_by_id_and_by_constraint() {
        let mut twin_a = spirit("sp_1", "Same Name", "one");
        twin_a.constraint = Some(UniquenessConstraint {
            unique_keys: vec!["name".into(), "era".into()],
        });
        let mut twin_b = twin_a.clone();
        twin_b.id = "sp_2".into();

        let data = GameData {
            spirits: vec![twin_a, twin_b],
            anchors: vec![Anchor::new("a_1", "x"), Anchor::new("a_1", "y")],
            ..GameData::default()
        };
        let report = check_integrity(&data);
        let errors: Vec<_> = report.errors().map(|f| f.collection).collect();
        assert_eq!(errors, vec!["spirits", "anchors"]);
        assert!(report.findings[0].message.contains("sp_1, sp_2"));
        assert!(report.findings[0].message.contains("name=\"Same Name\""));
    }

    #[test]
    fn test_near_duplicate_backgrounds() {
        let data = GameData {
            spirits: vec![
                spirit("sp_a", "A", "The ferryman waits at the north pier every night."),
                spirit("sp_b", "B", "The ferryman waits at the north pier every night!"),
            ],
            ..GameData::default()
        };
        let report = check_integrity(&data);
        assert!(!report.has_errors());
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_story_lints() {
        let story: StoryNode = serde_json::from_value(json!({
            "id": "st_bad",
            "anchor": "a_nowhere",
            "service": { "spiritId": "sp_ghost", "triggerLine": 1 },
            "steps": [
                { "t": "TEXT", "text": "one", "lineId": "x" },
                { "t": "TEXT", "text": "two", "lineId": "x" },
                { "t": "CHOICE", "options": [
                    { "text": "go", "action": "GOTO_LINE", "targetLineId": "void" }
                ]},
                { "t": "CALL_MEDIATION", "npcId": "npc_nobody" }
            ]
        }))
        .unwrap();
        let data = GameData {
            stories: vec![story],
            ..GameData::default()
        };

        let report = check_integrity(&data);
        assert_eq!(report.errors().count(), 2);
        assert_eq!(report.warnings().count(), 3);
        assert!(report.has_errors());
    }

    #[test]
    fn test_choice_references() {
        let story = StoryNode::new("st_a", "a_1").with_step(Step::Choice {
            line_id: None,
            options: vec![ChoiceOption {
                text: "follow".into(),
                action: ChoiceAction::StartStory {
                    story_id: "st_missing".into(),
                },
                next_line_id: None,
            }],
        });
        let data = GameData {
            anchors: vec![Anchor::new("a_1", "Pier")],
            stories: vec![story],
            ..GameData::default()
        };
        let report = check_integrity(&data);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].message.contains("story st_missing"));
    }
}
