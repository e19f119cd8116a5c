//! Slot-based saving of the world over a pluggable key/value store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use spirit_rules::{GameSettings, WorldState};

use crate::error::SaveError;

pub const DEFAULT_NAMESPACE: &str = "spirit-story";

/// Slot written by autosave.
pub const AUTOSAVE_SLOT: u32 = 0;

/// Flag stamped with the time of the last autosave, in milliseconds.
pub const LAST_SAVED_FLAG: &str = "lastSavedAt";

/// Key/value persistence the saver writes through.
pub trait SaveStore {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError>;
    fn remove(&mut self, key: &str) -> Result<(), SaveError>;
}

/// Store that lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SaveStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// What a load screen shows for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    pub slot: u32,
    pub exists: bool,
    pub name: String,
    pub last_saved_at: Option<i64>,
}

pub struct Saver<S: SaveStore> {
    store: S,
    namespace: String,
}

impl<S: SaveStore> Saver<S> {
    pub fn new(store: S) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn slot_key(&self, slot: u32) -> String {
        format!("{}:slot:{slot}", self.namespace)
    }

    pub fn settings_key(&self) -> String {
        format!("{}:settings", self.namespace)
    }

    pub fn save(&mut self, slot: u32, world: &WorldState) -> Result<(), SaveError> {
        let payload = world.to_payload_json()?;
        let key = self.slot_key(slot);
        self.store.write(&key, &payload)?;
        log::info!("saved slot {slot}");
        Ok(())
    }

    /// Load a slot into `world`.
    ///
    /// Returns `false` and leaves `world` untouched when the slot is empty or
    /// its payload cannot be read.
    pub fn load(&self, slot: u32, world: &mut WorldState) -> Result<bool, SaveError> {
        let Some(raw) = self.store.read(&self.slot_key(slot))? else {
            return Ok(false);
        };
        match WorldState::from_payload_json(&raw) {
            Ok(saved) => {
                world.restore(&saved);
                log::info!("loaded slot {slot}");
                Ok(true)
            }
            Err(err) => {
                log::warn!("slot {slot} is unreadable: {err}");
                Ok(false)
            }
        }
    }

    pub fn slot_info(&self, slot: u32) -> Result<SlotInfo, SaveError> {
        let name = format!("Slot {}", slot + 1);
        let saved = self
            .store
            .read(&self.slot_key(slot))?
            .and_then(|raw| match WorldState::from_payload_json(&raw) {
                Ok(world) => Some(world),
                Err(err) => {
                    log::warn!("slot {slot} info unreadable: {err}");
                    None
                }
            });

        Ok(SlotInfo {
            slot,
            exists: saved.is_some(),
            name,
            last_saved_at: saved
                .as_ref()
                .and_then(|world| world.flag(LAST_SAVED_FLAG))
                .and_then(serde_json::Value::as_i64),
        })
    }

    pub fn delete(&mut self, slot: u32) -> Result<(), SaveError> {
        let key = self.slot_key(slot);
        self.store.remove(&key)
    }

    pub fn save_settings(&mut self, settings: &GameSettings) -> Result<(), SaveError> {
        let payload = serde_json::to_string(settings)?;
        let key = self.settings_key();
        self.store.write(&key, &payload)
    }

    /// Stored settings, brought back into range.
    ///
    /// Missing or unreadable settings fall back to the defaults.
    pub fn load_settings(&self) -> Result<GameSettings, SaveError> {
        let Some(raw) = self.store.read(&self.settings_key())? else {
            return Ok(GameSettings::default());
        };
        match serde_json::from_str::<GameSettings>(&raw) {
            Ok(settings) => Ok(settings.sanitized()),
            Err(err) => {
                log::warn!("stored settings are unreadable: {err}");
                Ok(GameSettings::default())
            }
        }
    }

    /// Stamp the save time into the world and write the autosave slot.
    pub fn autosave(&mut self, world: &mut WorldState, now_ms: i64) -> Result<(), SaveError> {
        world.set_flag(LAST_SAVED_FLAG, now_ms);
        self.save(AUTOSAVE_SLOT, world)
    }
}
