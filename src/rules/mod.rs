use crate::config::EngineConfig;
use crate::entity::{Entity, EntityId};
use crate::event::{EntityMoveEvent, EntitySpawnEvent, EventBus, GameEvent};
use crate::input::{InputAction, InputMessage};
use crate::math::Vec2;
use crate::state::EntityRegistry;
use crate::Tick;
use std::collections::BTreeMap;

pub mod actions;
pub mod ai;
pub mod collision;
pub mod damage;
pub mod effects;
pub mod movement;
pub mod rng;

pub use effects::Statuses;

/// Shared state for one tick's rule phases
pub struct TickContext<'a> {
    /// Tick being processed
    pub tick: Tick,
    /// Fixed timestep in seconds
    pub dt: f32,
    pub config: &'a EngineConfig,
    pub bus: &'a mut EventBus,
}

impl TickContext<'_> {
    pub fn emit(&mut self, event: impl Into<GameEvent>) {
        self.bus.emit(&event.into());
    }

    pub(crate) fn emit_spawn(&mut self, entity: &Entity) {
        self.emit(EntitySpawnEvent {
            tick: self.tick,
            entity_id: entity.id,
            entity_type: entity.entity_type(),
            pos: entity.pos,
            owner_id: entity.owner_id.clone(),
        });
    }

    pub(crate) fn emit_move(&mut self, entity: &Entity) {
        self.emit(EntityMoveEvent {
            tick: self.tick,
            entity_id: entity.id,
            pos: entity.pos,
            vel: entity.vel,
            rotation: entity.rotation,
        });
    }
}

/// Character action waiting for resolution
#[derive(Clone, Debug, PartialEq)]
pub struct Intent {
    pub actor: EntityId,
    pub action: InputAction,
}

/// Per-tick counters, for logging
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub inputs: usize,
    pub moved: usize,
    pub contacts: usize,
    pub actions: usize,
    pub deaths: usize,
}

/// Kinematic state sampled at the start of a tick
#[derive(Clone, Copy, PartialEq)]
struct Kinematics {
    pos: Vec2,
    vel: Vec2,
    rotation: f32,
}

impl Kinematics {
    fn of(entity: &Entity) -> Self {
        Self {
            pos: entity.pos,
            vel: entity.vel,
            rotation: entity.rotation,
        }
    }
}

/// Deterministic per-tick rule pipeline.
///
/// Phase order is fixed: inputs, integration, collision, movement events,
/// AI (on its cadence), actions, effects, deaths.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleResolver;

impl RuleResolver {
    pub fn resolve_tick(
        &self,
        registry: &mut EntityRegistry,
        inputs: &[InputMessage],
        ctx: &mut TickContext<'_>,
    ) -> TickSummary {
        let mut summary = TickSummary {
            inputs: inputs.len(),
            ..Default::default()
        };

        let statuses = Statuses::collect(registry);
        let before: BTreeMap<EntityId, Kinematics> = registry
            .iter_live()
            .map(|e| (e.id, Kinematics::of(e)))
            .collect();

        let mut intents = movement::apply_inputs(registry, inputs, &statuses);
        movement::integrate(registry, &statuses, ctx.dt);
        summary.contacts = collision::resolve(registry, ctx);

        for id in registry.active_ids() {
            let Ok(entity) = registry.get(id) else { continue };
            let changed = before
                .get(&id)
                .map_or(false, |prev| *prev != Kinematics::of(entity));
            if changed {
                ctx.emit_move(entity);
                summary.moved += 1;
            }
        }

        if ctx.tick % ctx.config.ai_update_interval == 0 {
            intents.extend(ai::update(registry, &statuses, ctx));
        }

        summary.actions = intents.len();
        actions::resolve(registry, &intents, &statuses, ctx);
        effects::tick_effects(registry, ctx);
        summary.deaths = damage::resolve_deaths(registry, ctx);

        summary
    }
}
