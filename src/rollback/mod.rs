use crate::engine::{journal, scheduler, Engine, World};
use crate::entity::EntityId;
use crate::error::EngineError;
use crate::event::{EntityCorrectionEvent, GameEvent};
use crate::input::InputMessage;
use crate::math::Vec2;
use crate::Tick;
use std::collections::BTreeMap;
use tracing::{debug, info};


/// Position/velocity difference below which replayed state counts as unchanged
pub const CORRECTION_EPSILON: f32 = 1e-3;

/// Summary of a completed rollback
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollbackReport {
    pub anchor_tick: Tick,
    /// Tick the engine was at before the rollback (and is at again after it)
    pub target_tick: Tick,
    pub replayed_ticks: u64,
    /// Entities that received `entity:correction`, in id order
    pub corrections: Vec<EntityId>,
}

/// Restore the memento at `anchor_tick` and deterministically replay up to
/// the current tick.
///
/// Replay runs on a detached copy of the world with event dispatch
/// suppressed, and is committed in one swap. Pending inputs are re-queued
/// relative to the anchor (due at their intended tick, or the first replayed
/// tick when older); consumed input sequences are restored from the memento.
/// Journaled host commands are re-applied at the boundaries they were issued
/// at, under the ids first handed to the host. After commit,
/// `entity:correction` is emitted for every entity whose position or velocity
/// moved by more than [`CORRECTION_EPSILON`].
///
/// Fails with `RollbackOutOfRange` (leaving the engine untouched) when no
/// memento is stored for `anchor_tick`.
pub fn rollback_and_replay(
    engine: &mut Engine,
    anchor_tick: Tick,
    mut pending_inputs: Vec<InputMessage>,
) -> Result<RollbackReport, EngineError> {
    let target_tick = engine.world.tick;
    let memento = engine.snapshots.restore(anchor_tick)?;

    let mut replay = World::restore(memento, engine.world.inputs.clone());
    replay.registry.reserve(engine.journal.spawned_ids_from(anchor_tick));

    pending_inputs.sort_by(|a, b| {
        a.intended_server_tick
            .cmp(&b.intended_server_tick)
            .then(a.sequence.cmp(&b.sequence))
            .then_with(|| a.client_id.cmp(&b.client_id))
    });
    let requeued = pending_inputs.len();
    for input in pending_inputs {
        replay.inputs.queue(input, anchor_tick);
    }

    info!(
        anchor_tick,
        target_tick,
        inputs = requeued,
        "Rolling back"
    );

    let was_suppressed = engine.bus.set_suppressed(true);
    let mut captures = Vec::new();
    for boundary in anchor_tick..target_tick {
        journal::apply(&mut replay.registry, engine.journal.commands_at(boundary));
        let outcome = scheduler::advance(&mut replay, &engine.config, &mut engine.bus);
        captures.extend(outcome.memento);
    }
    journal::apply(&mut replay.registry, engine.journal.commands_at(target_tick));
    replay.registry.release_reservations();
    engine.bus.set_suppressed(was_suppressed);

    let before: BTreeMap<EntityId, (Vec2, Vec2)> = engine
        .world
        .registry
        .iter_live()
        .map(|e| (e.id, (e.pos, e.vel)))
        .collect();

    // Commit
    engine.world = replay;
    engine.snapshots.truncate_after(anchor_tick);
    for memento in captures {
        engine.snapshots.push(memento);
    }
    engine.presentation.reset(&engine.world.registry);

    let mut corrections = Vec::new();
    let mut events = Vec::new();
    for entity in engine.world.registry.iter_live() {
        let Some(&(pos, vel)) = before.get(&entity.id) else {
            continue;
        };
        if diverged(pos, entity.pos) || diverged(vel, entity.vel) {
            debug!(
                entity_id = %entity.id,
                from_x = pos.x,
                from_y = pos.y,
                to_x = entity.pos.x,
                to_y = entity.pos.y,
                "Correcting entity"
            );
            corrections.push(entity.id);
            events.push(GameEvent::EntityCorrection(EntityCorrectionEvent {
                tick: target_tick,
                entity_id: entity.id,
                corrected_pos: entity.pos,
                corrected_vel: entity.vel,
            }));
        }
    }
    for event in &events {
        engine.bus.emit(event);
    }

    let report = RollbackReport {
        anchor_tick,
        target_tick,
        replayed_ticks: target_tick - anchor_tick,
        corrections,
    };

    info!(
        anchor_tick,
        target_tick,
        replayed_ticks = report.replayed_ticks,
        corrections = report.corrections.len(),
        "Rollback complete"
    );

    Ok(report)
}

fn diverged(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() > CORRECTION_EPSILON || (a.y - b.y).abs() > CORRECTION_EPSILON
}
