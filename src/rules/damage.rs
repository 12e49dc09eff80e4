use super::TickContext;
use crate::entity::EntityId;
use crate::event::{EntityDamageEvent, EntityDeathEvent};
use crate::math::Vec2;
use crate::state::EntityRegistry;
use tracing::debug;

/// Subtract hit points from a living character and emit `entity:damage`.
///
/// Returns the damage dealt, or `None` when the target is not a living
/// character.
pub fn apply_damage(
    registry: &mut EntityRegistry,
    target: EntityId,
    amount: i32,
    attacker: Option<EntityId>,
    ctx: &mut TickContext<'_>,
) -> Option<i32> {
    let entity = registry.get_mut(target).ok().filter(|e| e.is_alive)?;
    let character = entity.as_character_mut()?;

    let dealt = amount.min(character.hp).max(0);
    character.hp -= dealt;
    if attacker.is_some() {
        character.last_attacker = attacker;
    }
    let new_hp = character.hp;

    ctx.emit(EntityDamageEvent {
        tick: ctx.tick,
        entity_id: target,
        damage: dealt,
        attacker_id: attacker,
        new_hp,
    });

    Some(dealt)
}

/// Restore hit points (capped at max) and emit `entity:damage` with a
/// negative amount. Returns the amount healed.
pub fn apply_heal(
    registry: &mut EntityRegistry,
    target: EntityId,
    amount: i32,
    source: Option<EntityId>,
    ctx: &mut TickContext<'_>,
) -> Option<i32> {
    let entity = registry.get_mut(target).ok().filter(|e| e.is_alive)?;
    let character = entity.as_character_mut()?;

    let healed = amount.min(character.max_hp - character.hp).max(0);
    if healed == 0 {
        return Some(0);
    }
    character.hp += healed;
    let new_hp = character.hp;

    ctx.emit(EntityDamageEvent {
        tick: ctx.tick,
        entity_id: target,
        damage: -healed,
        attacker_id: source,
        new_hp,
    });

    Some(healed)
}

/// Kill characters at zero hit points: emit `entity:death` and despawn.
pub fn resolve_deaths(registry: &mut EntityRegistry, ctx: &mut TickContext<'_>) -> usize {
    let dead: Vec<(EntityId, Option<EntityId>)> = registry
        .iter_live()
        .filter(|e| e.is_alive)
        .filter_map(|e| {
            let character = e.as_character()?;
            (character.hp <= 0).then_some((e.id, character.last_attacker))
        })
        .collect();

    for &(id, killer) in &dead {
        if let Ok(entity) = registry.get_mut(id) {
            entity.is_alive = false;
            entity.vel = Vec2::ZERO;
        }
        debug!(tick = ctx.tick, entity_id = %id, killer_id = ?killer, "Entity died");
        ctx.emit(EntityDeathEvent {
            tick: ctx.tick,
            entity_id: id,
            killer_id: killer,
        });
        let _ = registry.despawn(id);
    }

    dead.len()
}
