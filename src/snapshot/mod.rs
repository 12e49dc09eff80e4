use crate::config::EngineMode;
use crate::entity::{Entity, EntityId};
use crate::state::EntityRegistry;
use crate::Tick;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

mod store;

pub use store::SnapshotStore;

/// Memento format version (for future schema evolution)
pub const SNAPSHOT_VERSION: &str = "1";

/// Complete state of the simulation after a tick completed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateMemento {
    /// Tick the state belongs to
    pub tick: Tick,

    /// Every live entity, ordered by id
    pub entities: Vec<Entity>,

    /// Id allocator position, so a restore resumes allocation exactly
    pub next_entity_id: u64,

    /// Highest input sequence consumed per client
    #[serde(default)]
    pub input_sequences: BTreeMap<String, u64>,

    /// Extensible metadata (ordered for stable serialization)
    pub metadata: BTreeMap<String, Value>,
}

impl GameStateMemento {
    /// Copy the registry's live state
    ///
    /// Tombstoned entities are excluded.
    pub fn capture(registry: &EntityRegistry, tick: Tick, mode: EngineMode) -> Self {
        let entities = registry.iter_live().cloned().collect();

        let mut metadata = BTreeMap::new();
        metadata.insert("snapshotVersion".to_string(), Value::from(SNAPSHOT_VERSION));
        metadata.insert("mode".to_string(), Value::from(mode.as_str()));

        Self {
            tick,
            entities,
            next_entity_id: registry.next_id(),
            input_sequences: BTreeMap::new(),
            metadata,
        }
    }

    /// Attach the input queue's consumed sequences
    pub fn with_input_sequences(mut self, sequences: BTreeMap<String, u64>) -> Self {
        self.input_sequences = sequences;
        self
    }

    /// Look up an entity copy by id
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|index| &self.entities[index])
    }

    /// Memento as JSON (the `snapshot` event payload)
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
