use crate::entity::{build_entity, Entity, EntityId, EntitySpec, SpecError};
use crate::error::EngineError;
use crate::snapshot::GameStateMemento;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Entity registry owns every entity record of the simulation.
///
/// Records are kept in id order so every iteration is deterministic.
/// Despawned entities are tombstoned immediately but stay in the iteration
/// set until the next tick boundary ([`EntityRegistry::flush_tombstones`]).
#[derive(Clone, Debug)]
pub struct EntityRegistry {
    /// Iteration set, including entities tombstoned this tick
    entities: BTreeMap<EntityId, Entity>,

    /// Despawned ids awaiting removal at the tick boundary
    tombstones: BTreeSet<EntityId>,

    /// Next id to allocate (ids are never reused)
    next_id: u64,

    /// Ids held for journaled host spawns while a rollback replays
    reserved: BTreeSet<EntityId>,
}

impl EntityRegistry {
    /// Create an empty registry; the first allocated id is 1
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            tombstones: BTreeSet::new(),
            next_id: 1,
            reserved: BTreeSet::new(),
        }
    }

    /// Rebuild a registry from a memento's entity copies
    pub fn from_memento(memento: &GameStateMemento) -> Self {
        let entities = memento
            .entities
            .iter()
            .map(|entity| (entity.id, entity.clone()))
            .collect();

        Self {
            entities,
            tombstones: BTreeSet::new(),
            next_id: memento.next_entity_id,
            reserved: BTreeSet::new(),
        }
    }

    /// Validate a spawn request and insert the new entity
    ///
    /// Fails with `InvalidEntitySpec` without consuming an id. Effects must
    /// target a live entity.
    pub fn spawn(&mut self, spec: &EntitySpec) -> Result<EntityId, EngineError> {
        let mut id = EntityId(self.next_id);
        while self.reserved.contains(&id) {
            id = EntityId(id.0 + 1);
        }
        self.insert(id, spec)
    }

    /// Spawn with a caller-chosen id (journal replay).
    ///
    /// Fails with `InvalidEntityId` when the id is already in the iteration
    /// set. Releases a reservation for the id and moves the allocator past it.
    pub fn spawn_with_id(&mut self, id: EntityId, spec: &EntitySpec) -> Result<EntityId, EngineError> {
        if self.entities.contains_key(&id) {
            return Err(EngineError::InvalidEntityId(id));
        }
        self.insert(id, spec)
    }

    /// Keep `ids` out of regular allocation until spawned with
    /// [`EntityRegistry::spawn_with_id`]
    pub fn reserve(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.reserved.extend(ids);
    }

    /// Drop reservations left by spawns that did not replay
    pub fn release_reservations(&mut self) {
        self.reserved.clear();
    }

    fn insert(&mut self, id: EntityId, spec: &EntitySpec) -> Result<EntityId, EngineError> {
        let entity = build_entity(spec, id)?;

        if let Some(effect) = entity.as_effect() {
            if !self.is_live(effect.target_id) {
                return Err(SpecError::InvalidField {
                    field: "targetId",
                    reason: format!("entity {} is not live", effect.target_id),
                }
                .into());
            }
        }

        self.reserved.remove(&id);
        self.next_id = self.next_id.max(id.0 + 1);
        debug!(entity_id = %id, entity_type = %entity.entity_type(), "Entity spawned");
        self.entities.insert(id, entity);

        Ok(id)
    }

    /// Tombstone an entity; it leaves iteration at the next tick boundary
    pub fn despawn(&mut self, id: EntityId) -> Result<(), EngineError> {
        if !self.is_live(id) {
            return Err(EngineError::InvalidEntityId(id));
        }

        self.tombstones.insert(id);
        debug!(entity_id = %id, "Entity tombstoned");

        Ok(())
    }

    /// Get a live (not tombstoned) entity
    pub fn get(&self, id: EntityId) -> Result<&Entity, EngineError> {
        if self.tombstones.contains(&id) {
            return Err(EngineError::InvalidEntityId(id));
        }
        self.entities.get(&id).ok_or(EngineError::InvalidEntityId(id))
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity, EngineError> {
        if self.tombstones.contains(&id) {
            return Err(EngineError::InvalidEntityId(id));
        }
        self.entities
            .get_mut(&id)
            .ok_or(EngineError::InvalidEntityId(id))
    }

    /// Visit every entity in the iteration set whose alive flag is set, in id order
    pub fn for_each_alive<F>(&self, mut visitor: F)
    where
        F: FnMut(&Entity),
    {
        for entity in self.entities.values().filter(|e| e.is_alive) {
            visitor(entity);
        }
    }

    /// Live entities (not tombstoned), in id order
    pub fn iter_live(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities
            .values()
            .filter(move |e| !self.tombstones.contains(&e.id))
    }

    /// Ids of live entities that are alive, in id order
    pub(crate) fn active_ids(&self) -> Vec<EntityId> {
        self.iter_live()
            .filter(|e| e.is_alive)
            .map(|e| e.id)
            .collect()
    }

    /// Ids of alive, input-driven entities owned by `client_id`
    pub(crate) fn controlled_by(&self, client_id: &str) -> Vec<EntityId> {
        self.iter_live()
            .filter(|e| e.is_alive && e.is_input_driven && e.owner_id == client_id)
            .map(|e| e.id)
            .collect()
    }

    /// True when the entity exists and is not tombstoned
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id) && !self.tombstones.contains(&id)
    }

    pub fn is_tombstoned(&self, id: EntityId) -> bool {
        self.tombstones.contains(&id)
    }

    /// Remove tombstoned entities from the iteration set (tick boundary)
    pub fn flush_tombstones(&mut self) -> usize {
        let count = self.tombstones.len();
        for id in std::mem::take(&mut self.tombstones) {
            self.entities.remove(&id);
        }
        count
    }

    /// Number of live entities
    pub fn live_count(&self) -> usize {
        self.entities.len() - self.tombstones.len()
    }

    /// Id the next spawn will receive
    pub fn next_id(&self) -> u64 {
        self.next_id
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
