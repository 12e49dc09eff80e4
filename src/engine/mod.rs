use crate::config::EngineConfig;
use crate::entity::{Entity, EntityId, EntitySpec};
use crate::error::EngineError;
use crate::event::{
    EntitySpawnEvent, EventBus, GameEvent, HandlerOutcome, SubscriptionToken, Topic, TopicPayload,
};
use crate::input::InputMessage;
use crate::math::Vec2;
use crate::rollback::{self, RollbackReport};
use crate::snapshot::{GameStateMemento, SnapshotStore};
use crate::state::EntityRegistry;
use crate::Tick;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub mod journal;
pub mod scheduler;

pub use journal::{CommandJournal, HostCommand};
pub use scheduler::World;

/// Presentation-only smoothing state driven by `step(dt)`
#[derive(Clone, Debug, Default)]
pub(crate) struct Presentation {
    /// Seconds elapsed since the last fixed tick
    accumulator: f32,
    /// Positions before the last fixed tick
    previous: BTreeMap<EntityId, Vec2>,
}

impl Presentation {
    /// Restart interpolation from the registry's current positions
    pub(crate) fn reset(&mut self, registry: &EntityRegistry) {
        self.previous = registry.iter_live().map(|e| (e.id, e.pos)).collect();
        self.accumulator = 0.0;
    }
}

/// Deterministic fixed-tick simulation engine.
///
/// Owns the world (registry, input queue, tick counter), the snapshot
/// history, the event bus and the host command journal. Each engine is an
/// independent value; nothing is global.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) world: World,
    pub(crate) snapshots: SnapshotStore,
    pub(crate) bus: EventBus,
    pub(crate) journal: CommandJournal,
    pub(crate) presentation: Presentation,
    running: bool,
}

impl Engine {
    /// Create a stopped engine at tick 0
    pub fn create(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        info!(
            mode = %config.mode,
            tick_rate = config.tick_rate,
            snapshot_buffer_size = config.snapshot_buffer_size,
            snapshot_emission_interval = config.snapshot_emission_interval,
            ai_update_interval = config.ai_update_interval,
            rng_seed = config.rng_seed,
            "Engine created"
        );

        Ok(Self {
            snapshots: SnapshotStore::new(config.snapshot_buffer_size),
            config,
            world: World::default(),
            bus: EventBus::new(),
            journal: CommandJournal::new(),
            presentation: Presentation::default(),
            running: false,
        })
    }

    /// Start ticking. Captures a baseline memento when no history exists.
    pub fn start(&mut self) {
        if self.running {
            debug!("Engine already running");
            return;
        }

        if self.snapshots.is_empty() {
            let baseline = self.world.capture(self.config.mode);
            self.snapshots.push(baseline);
            self.journal.clear();
        }

        self.running = true;
        info!(
            tick = self.world.tick,
            entities = self.world.registry.live_count(),
            "Engine started"
        );
    }

    pub fn stop(&mut self) {
        if !self.running {
            debug!("Engine already stopped");
            return;
        }
        self.running = false;
        info!(tick = self.world.tick, "Engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Presentation-only advance.
    ///
    /// Accumulates elapsed time since the last fixed tick and returns the
    /// interpolation fraction in `0.0..=1.0`. Never advances the tick.
    pub fn step(&mut self, dt: f32) -> f32 {
        if !self.running {
            return 0.0;
        }
        if dt.is_finite() && dt > 0.0 {
            self.presentation.accumulator += dt;
        }
        self.interpolation_alpha()
    }

    fn interpolation_alpha(&self) -> f32 {
        (self.presentation.accumulator / self.config.fixed_dt()).clamp(0.0, 1.0)
    }

    /// Authoritative fixed-timestep advance. Returns the current tick.
    pub fn step_fixed(&mut self) -> Tick {
        if !self.running {
            debug!(tick = self.world.tick, "step_fixed ignored while stopped");
            return self.world.tick;
        }

        self.presentation.reset(&self.world.registry);

        let outcome = scheduler::advance(&mut self.world, &self.config, &mut self.bus);
        if let Some(memento) = outcome.memento {
            self.snapshots.push(memento);
        }
        if let Some(oldest) = self.snapshots.oldest_tick() {
            self.journal.prune_before(oldest);
        }

        outcome.tick
    }

    /// Queue a client input. Returns the tick it will be applied on, or
    /// `None` for a duplicate.
    pub fn queue_input(&mut self, input: InputMessage) -> Option<Tick> {
        self.world.inputs.queue(input, self.world.tick)
    }

    /// Spawn an entity between ticks and emit `entity:spawn`
    pub fn spawn_entity(&mut self, spec: EntitySpec) -> Result<EntityId, EngineError> {
        let id = self.world.registry.spawn(&spec)?;
        self.journal.record(self.world.tick, HostCommand::Spawn { id, spec });

        let entity = self.world.registry.get(id)?;
        let event = GameEvent::EntitySpawn(EntitySpawnEvent {
            tick: self.world.tick,
            entity_id: id,
            entity_type: entity.entity_type(),
            pos: entity.pos,
            owner_id: entity.owner_id.clone(),
        });
        self.bus.emit(&event);

        Ok(id)
    }

    /// Tombstone an entity; it leaves iteration at the next tick boundary
    pub fn despawn_entity(&mut self, id: EntityId) -> Result<(), EngineError> {
        self.world.registry.despawn(id)?;
        self.journal.record(self.world.tick, HostCommand::Despawn(id));
        Ok(())
    }

    /// Subscribe a typed handler; the topic follows from the payload type
    pub fn subscribe_event<P, F, R>(&mut self, handler: F) -> SubscriptionToken
    where
        P: TopicPayload,
        F: FnMut(&P) -> R + 'static,
        R: HandlerOutcome,
    {
        self.bus.subscribe(handler)
    }

    /// Subscribe an untyped handler receiving the camelCase JSON payload
    pub fn subscribe_event_dynamic<F, R>(&mut self, topic: Topic, handler: F) -> SubscriptionToken
    where
        F: FnMut(&Value) -> R + 'static,
        R: HandlerOutcome,
    {
        self.bus.subscribe_dynamic(topic, handler)
    }

    /// Idempotent; returns whether a subscription was removed
    pub fn unsubscribe_event(&mut self, token: SubscriptionToken) -> bool {
        self.bus.unsubscribe(token)
    }

    pub fn event_bus(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Memento of the current state (not added to the history)
    pub fn get_snapshot(&self) -> GameStateMemento {
        self.world.capture(self.config.mode)
    }

    /// Number of completed ticks
    pub fn current_tick(&self) -> Tick {
        self.world.tick
    }

    /// Restore the memento at `anchor_tick` and replay to the current tick.
    ///
    /// See [`rollback::rollback_and_replay`].
    pub fn rollback_and_replay(
        &mut self,
        anchor_tick: Tick,
        pending_inputs: Vec<InputMessage>,
    ) -> Result<RollbackReport, EngineError> {
        rollback::rollback_and_replay(self, anchor_tick, pending_inputs)
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, EngineError> {
        self.world.registry.get(id)
    }

    pub fn for_each_alive<F>(&self, visitor: F)
    where
        F: FnMut(&Entity),
    {
        self.world.registry.for_each_alive(visitor)
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.world.registry
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn journal(&self) -> &CommandJournal {
        &self.journal
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Inputs waiting for a future tick
    pub fn pending_inputs(&self) -> usize {
        self.world.inputs.len()
    }

    /// Smoothed render position between the last two fixed ticks
    pub fn interpolated_position(&self, id: EntityId) -> Option<Vec2> {
        let current = self.world.registry.get(id).ok()?.pos;
        let Some(&previous) = self.presentation.previous.get(&id) else {
            return Some(current);
        };
        let alpha = self.interpolation_alpha();
        Some(previous + (current - previous) * alpha)
    }
}
