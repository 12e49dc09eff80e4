use crate::config::{EngineConfig, EngineMode};
use crate::event::{EventBus, GameEvent, SnapshotEvent, TickCompleteEvent};
use crate::input::InputQueue;
use crate::rules::{RuleResolver, TickContext, TickSummary};
use crate::snapshot::GameStateMemento;
use crate::state::EntityRegistry;
use crate::Tick;
use tracing::{debug, warn};

/// Simulation state advanced by the scheduler: the part rollback replaces
#[derive(Clone, Debug, Default)]
pub struct World {
    pub registry: EntityRegistry,
    pub inputs: InputQueue,
    /// Number of completed ticks
    pub tick: Tick,
}

impl World {
    /// Memento of the world at its current tick
    pub fn capture(&self, mode: EngineMode) -> GameStateMemento {
        GameStateMemento::capture(&self.registry, self.tick, mode)
            .with_input_sequences(self.inputs.consumed_sequences().clone())
    }

    /// World restored from a memento, keeping `inputs`' pending messages
    pub fn restore(memento: &GameStateMemento, mut inputs: InputQueue) -> Self {
        inputs.restore_sequences(memento.input_sequences.clone());
        Self {
            registry: EntityRegistry::from_memento(memento),
            inputs,
            tick: memento.tick,
        }
    }
}

/// Result of one fixed tick
#[derive(Debug)]
pub struct TickOutcome {
    pub tick: Tick,
    pub summary: TickSummary,
    /// Captured when the tick lands on the snapshot cadence
    pub memento: Option<GameStateMemento>,
}

/// Process tick `world.tick + 1`.
///
/// Order: flush tombstones, drain due inputs, run the rule pipeline, flush
/// tombstones, advance the counter, capture a memento on cadence (emitting
/// `snapshot`), emit `tick:complete`.
pub fn advance(world: &mut World, config: &EngineConfig, bus: &mut EventBus) -> TickOutcome {
    let tick = world.tick + 1;

    world.registry.flush_tombstones();
    let inputs = world.inputs.drain(tick);

    let summary = {
        let mut ctx = TickContext {
            tick,
            dt: config.fixed_dt(),
            config,
            bus: &mut *bus,
        };
        RuleResolver.resolve_tick(&mut world.registry, &inputs, &mut ctx)
    };

    world.registry.flush_tombstones();
    world.tick = tick;

    let memento = (tick % config.snapshot_emission_interval == 0).then(|| {
        let memento = world.capture(config.mode);
        if !bus.is_suppressed() {
            match memento.to_json() {
                Ok(serialized_state) => {
                    bus.emit(&GameEvent::Snapshot(SnapshotEvent { tick, serialized_state }));
                }
                Err(e) => warn!(tick, error = %e, "Failed to serialize snapshot"),
            }
        }
        memento
    });

    bus.emit(&GameEvent::TickComplete(TickCompleteEvent { tick }));

    debug!(
        tick,
        inputs = summary.inputs,
        moved = summary.moved,
        contacts = summary.contacts,
        actions = summary.actions,
        deaths = summary.deaths,
        entities = world.registry.live_count(),
        "Tick complete"
    );

    TickOutcome {
        tick,
        summary,
        memento,
    }
}
