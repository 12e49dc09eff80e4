use super::{Intent, Statuses};
use crate::entity::{Entity, EntityId};
use crate::input::InputMessage;
use crate::math::Vec2;
use crate::state::EntityRegistry;

/// Base movement speed in world units per second (scaled by the speed stat)
pub const MOVE_SPEED: f32 = 100.0;

/// Current top speed of an entity after stats and status modifiers
pub fn move_speed(entity: &Entity, statuses: &Statuses) -> f32 {
    if statuses.is_stunned(entity.id) {
        return 0.0;
    }
    let stat = entity.as_character().map_or(1.0, |c| c.stats.speed);
    MOVE_SPEED * stat * statuses.speed_factor(entity.id)
}

/// Apply inputs in queue order to the entities each client drives.
///
/// Velocity is set from the clamped movement vector and persists until the
/// next input. Actions of driven characters become intents.
pub fn apply_inputs(
    registry: &mut EntityRegistry,
    inputs: &[InputMessage],
    statuses: &Statuses,
) -> Vec<Intent> {
    let mut intents = Vec::new();

    for input in inputs {
        let direction = input.movement.clamp_length(1.0);

        for id in registry.controlled_by(&input.client_id) {
            let Ok(entity) = registry.get_mut(id) else { continue };
            if entity.is_static() {
                continue;
            }

            entity.vel = direction * move_speed(entity, statuses);

            if entity.as_character().is_some() {
                intents.extend(input.actions.iter().map(|action| Intent {
                    actor: id,
                    action: action.clone(),
                }));
            }
        }
    }

    intents
}

/// Integrate positions for one fixed step.
///
/// Colliders and stunned entities stay put; effects follow their target.
pub fn integrate(registry: &mut EntityRegistry, statuses: &Statuses, dt: f32) {
    for id in registry.active_ids() {
        let follow = registry
            .get(id)
            .ok()
            .and_then(|e| e.as_effect())
            .map(|effect| effect.target_id);

        if let Some(target) = follow {
            let Ok(target_pos) = registry.get(target).map(|t| t.pos) else { continue };
            if let Ok(effect) = registry.get_mut(id) {
                effect.pos = target_pos;
            }
            continue;
        }

        let Ok(entity) = registry.get_mut(id) else { continue };
        if entity.is_static() || statuses.is_stunned(id) {
            continue;
        }
        step(entity, dt);
    }
}

fn step(entity: &mut Entity, dt: f32) {
    if entity.vel.is_zero() {
        return;
    }
    entity.pos += entity.vel * dt;
    entity.rotation = entity.vel.angle();
}

/// Unit heading from `from` towards `to` (zero when they coincide)
pub fn heading(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalized_or_zero()
}

/// Ids sorted by distance to `origin`, ties broken by id
pub fn nearest(origin: Vec2, candidates: impl Iterator<Item = (EntityId, Vec2)>) -> Option<EntityId> {
    candidates
        .map(|(id, pos)| (origin.distance(pos), id))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, id)| id)
}
