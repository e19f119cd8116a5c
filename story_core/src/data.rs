//! Loaded game data and the collaborator that fetches it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use spirit_rules::{Anchor, MapDef, Npc, SacredItem, Spirit, StoryNode, WordCard};

use crate::error::DataError;

/// Names of the collections a data source must serve.
pub const COLLECTIONS: [&str; 7] = [
    "spirits", "wordcards", "items", "anchors", "stories", "maps", "npcs",
];

/// Fetches parsed data collections by name.
///
/// Platform layers implement this over files, HTTP or bundled assets.
pub trait DataSource {
    /// Fetch one collection as JSON.
    ///
    /// # Errors
    ///
    /// Returns `DataError::UnknownCollection` for names outside [`COLLECTIONS`].
    fn fetch(&self, name: &str) -> Result<Value, DataError>;
}

/// A data source over in-memory JSON documents.
#[derive(Debug, Clone, Default)]
pub struct JsonDataSource {
    collections: HashMap<String, Value>,
}

impl JsonDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: impl Into<String>, value: Value) -> Self {
        self.collections.insert(name.into(), value);
        self
    }
}

impl DataSource for JsonDataSource {
    fn fetch(&self, name: &str) -> Result<Value, DataError> {
        if !COLLECTIONS.contains(&name) {
            return Err(DataError::UnknownCollection(name.to_string()));
        }
        Ok(self
            .collections
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }
}

/// Every collection the core reads, loaded once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameData {
    pub spirits: Vec<Spirit>,
    pub wordcards: Vec<WordCard>,
    pub items: Vec<SacredItem>,
    pub anchors: Vec<Anchor>,
    pub stories: Vec<StoryNode>,
    pub maps: Vec<MapDef>,
    pub npcs: Vec<Npc>,
}

impl GameData {
    /// Load all collections from a source.
    pub fn load(source: &dyn DataSource) -> Result<Self, DataError> {
        let data = Self {
            spirits: load_collection(source, "spirits")?,
            wordcards: load_collection(source, "wordcards")?,
            items: load_collection(source, "items")?,
            anchors: load_collection(source, "anchors")?,
            stories: load_collection(source, "stories")?,
            maps: load_collection(source, "maps")?,
            npcs: load_collection(source, "npcs")?,
        };
        log::info!(
            "loaded {} spirits, {} anchors, {} stories",
            data.spirits.len(),
            data.anchors.len(),
            data.stories.len()
        );
        Ok(data)
    }

    pub fn spirit(&self, id: &str) -> Option<&Spirit> {
        self.spirits.iter().find(|s| s.id == id)
    }

    pub fn story(&self, id: &str) -> Option<&StoryNode> {
        self.stories.iter().find(|s| s.id == id)
    }

    pub fn anchor(&self, id: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.id == id)
    }

    pub fn npc(&self, id: &str) -> Option<&Npc> {
        self.npcs.iter().find(|n| n.id == id)
    }

    pub fn wordcard(&self, id: &str) -> Option<&WordCard> {
        self.wordcards.iter().find(|w| w.id == id)
    }

    /// Spirits owning any of the given obsession ids.
    pub fn owners_of<'a>(
        &'a self,
        obsession_ids: &'a [String],
    ) -> impl Iterator<Item = &'a Spirit> {
        self.spirits
            .iter()
            .filter(move |s| obsession_ids.iter().any(|id| s.owns_obsession(id)))
    }
}

fn load_collection<T: DeserializeOwned>(
    source: &dyn DataSource,
    name: &str,
) -> Result<Vec<T>, DataError> {
    let raw = source.fetch(name)?;
    serde_json::from_value(raw).map_err(|err| DataError::Malformed {
        name: name.to_string(),
        reason: err.to_string(),
    })
}
